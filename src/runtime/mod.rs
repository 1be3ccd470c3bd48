//! Container runtime access.
//!
//! [`RuntimeClient`] is everything the monitoring core needs from a container
//! runtime: describing a container and streaming its resource usage. The
//! [`docker`] module implements it for the Docker Engine API.
pub mod docker;

use tokio::sync::mpsc;

use crate::container::{ContainerID, ContainerMetadata};

pub use docker::DockerClient;

pub trait RuntimeClient: Send + Sync + 'static {
    /// One raw resource-usage record, passed through untouched.
    type Snapshot: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns labels and environment of the container.
    fn inspect(
        &self,
        container_id: &ContainerID,
    ) -> impl Future<Output = Result<ContainerMetadata, Self::Error>> + Send;

    /// Pushes snapshots of the container into `snapshots` until the runtime ends the
    /// stream.
    ///
    /// Resolves to `Ok(())` when the stream ends cleanly or `snapshots` has been
    /// closed by the receiving side.
    fn stream(
        &self,
        container_id: &ContainerID,
        snapshots: mpsc::Sender<Self::Snapshot>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
