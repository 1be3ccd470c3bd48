use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::tags::TagSet;

/// Error returned when constructing an [`Interval`] from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sampling interval must be greater than zero")]
pub struct InvalidInterval;

/// Forward every n-th snapshot, `n` being at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval(NonZeroUsize);

impl Interval {
    pub const EVERY: Self = Self(NonZeroUsize::MIN);

    /// # Errors
    ///
    /// Returns [`InvalidInterval`] if `n` is zero.
    pub fn new(n: usize) -> Result<Self, InvalidInterval> {
        NonZeroUsize::new(n).map(Self).ok_or(InvalidInterval)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Whether the snapshot at raw-sequence position `position` is forwarded.
    pub fn selects(self, position: u64) -> bool {
        position % self.0.get() as u64 == 0
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::EVERY
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A snapshot paired with the tags of the container it was taken from.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TaggedSnapshot<S> {
    tags: Arc<TagSet>,
    #[serde(rename = "stats")]
    snapshot: S,
}

impl<S> TaggedSnapshot<S> {
    pub fn new(tags: Arc<TagSet>, snapshot: S) -> Self {
        Self { tags, snapshot }
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> S {
        self.snapshot
    }
}

/// Thins the raw snapshot stream of one container and tags what is left.
#[derive(Debug)]
pub struct Sampler {
    tags: Arc<TagSet>,
    interval: Interval,
}

impl Sampler {
    pub fn new(tags: Arc<TagSet>, interval: Interval) -> Self {
        Self { tags, interval }
    }

    /// Consumes `input` until it is closed, sending every selected snapshot to `output`.
    ///
    /// Waits for room in `output` before taking the next snapshot. Returns early,
    /// dropping `input`, if `output` has been closed. Returns the number of snapshots
    /// received.
    pub async fn run<S>(
        self,
        mut input: mpsc::Receiver<S>,
        output: mpsc::Sender<TaggedSnapshot<S>>,
    ) -> u64 {
        let mut position: u64 = 0;
        while let Some(snapshot) = input.recv().await {
            if self.interval.selects(position) {
                let tagged = TaggedSnapshot::new(Arc::clone(&self.tags), snapshot);
                if output.send(tagged).await.is_err() {
                    log::debug!("output closed, stop sampling after {} snapshots", position + 1);
                    return position + 1;
                }
            }
            position += 1;
        }
        position
    }

    /// Spawns [`Sampler::run`] onto the tokio runtime.
    pub fn spawn<S: Send + 'static>(
        self,
        input: mpsc::Receiver<S>,
        output: mpsc::Sender<TaggedSnapshot<S>>,
    ) -> tokio::task::JoinHandle<u64> {
        tokio::spawn(self.run(input, output))
    }
}
