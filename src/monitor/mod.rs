//! Monitoring of a single container.
//!
//! A [`Monitor`] is created by inspecting the container and resolving its identity.
//! Containers without an application identity are declined with
//! [`Error::NoNeedToMonitor`]. [`Monitor::run`] then streams the container's stats
//! through a [`Sampler`] into the shared output until the runtime ends the stream.
mod error;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use error::{Error, Result};

use crate::container::ContainerID;
use crate::identity::{Identity, IdentityResolver};
use crate::runtime::RuntimeClient;
use crate::sampler::{Interval, Sampler, TaggedSnapshot};
use crate::tags::TagSet;

/// Capacity of the queue between the runtime stream and the sampler.
const INPUT_CAPACITY: usize = 1;

pub struct Monitor<C: RuntimeClient> {
    client: Arc<C>,
    container_id: ContainerID,
    identity: Identity,
    tags: Arc<TagSet>,
    interval: Interval,
}

impl<C: RuntimeClient> Monitor<C> {
    /// Inspects the container and resolves its tags.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInterval`] if `interval` is zero, before contacting the runtime.
    /// - [`Error::Inspect`] if the runtime cannot describe the container.
    /// - [`Error::NoNeedToMonitor`] if the container has no application identity.
    pub async fn new(
        client: Arc<C>,
        container_id: ContainerID,
        interval: usize,
        resolver: &IdentityResolver,
    ) -> Result<Self> {
        let interval = Interval::new(interval)?;
        let container = client
            .inspect(&container_id)
            .await
            .map_err(|source| Error::Inspect {
                container_id: container_id.clone(),
                source: Box::new(source),
            })?;

        let Some(identity) = resolver.resolve(&container) else {
            log::debug!(
                "No need to monitor container `{}` ({})",
                container_id,
                container.name()
            );
            return Err(Error::NoNeedToMonitor { container_id });
        };
        let tags = Arc::new(TagSet::from_identity(&identity));
        log::info!(
            "Monitoring container `{}` as {}({}) every {} snapshot(s)",
            container_id,
            identity.app(),
            identity.task(),
            interval
        );

        Ok(Self {
            client,
            container_id,
            identity,
            tags,
            interval,
        })
    }

    pub fn container_id(&self) -> &ContainerID {
        &self.container_id
    }

    pub fn app(&self) -> &str {
        self.identity.app()
    }

    pub fn task(&self) -> &str {
        self.identity.task()
    }

    pub fn tags(&self) -> &Arc<TagSet> {
        &self.tags
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Streams the container's stats until the runtime ends the stream.
    ///
    /// Returns after the sampler has handed every selected snapshot to `output`.
    ///
    /// # Errors
    ///
    /// - [`Error::Stream`] if the runtime stream fails.
    /// - [`Error::SamplerPanicked`] if the sampler task did not complete.
    pub async fn run(self, output: mpsc::Sender<TaggedSnapshot<C::Snapshot>>) -> Result<()> {
        let (input, raw) = mpsc::channel(INPUT_CAPACITY);
        let sampler = Sampler::new(Arc::clone(&self.tags), self.interval).spawn(raw, output);

        // the stream owns `input`, the sampler drains and stops once it returns
        let streamed = self.client.stream(&self.container_id, input).await;
        let received = sampler.await.map_err(|_| Error::SamplerPanicked {
            container_id: self.container_id.clone(),
        })?;
        log::debug!(
            "Stats stream of container `{}` closed after {} snapshot(s)",
            self.container_id,
            received
        );

        streamed.map_err(|source| Error::Stream {
            container_id: self.container_id,
            source: Box::new(source),
        })
    }
}
