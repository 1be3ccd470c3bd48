use crate::container::ContainerID;
use crate::sampler::InvalidInterval;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to inspect container `{container_id}`: {source}")]
    Inspect {
        container_id: ContainerID,
        #[source]
        source: BoxError,
    },
    /// The container carries no application identity. Not a failure.
    #[error("container `{container_id}` is not supposed to be monitored")]
    NoNeedToMonitor { container_id: ContainerID },
    #[error("stats stream of container `{container_id}` failed: {source}")]
    Stream {
        container_id: ContainerID,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    InvalidInterval(#[from] InvalidInterval),
    #[error("sampler of container `{container_id}` panicked")]
    SamplerPanicked { container_id: ContainerID },
}

impl Error {
    /// Whether this is the [`Error::NoNeedToMonitor`] outcome.
    pub fn is_no_need_to_monitor(&self) -> bool {
        matches!(self, Self::NoNeedToMonitor { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
