use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::container::ContainerID;
use crate::error::ResultOkLogExt;
use crate::identity::IdentityResolver;
use crate::monitor::Monitor;
use crate::runtime::RuntimeClient;
use crate::sampler::{Interval, TaggedSnapshot};

#[derive(Debug)]
struct Watched {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Runs one [`Monitor`] per container and keeps track of the running ones.
///
/// All monitors share the runtime client, the identity resolver and the output
/// queue. A container is forgotten as soon as its monitor ends, for whatever reason.
pub struct Supervisor<C: RuntimeClient> {
    client: Arc<C>,
    resolver: Arc<IdentityResolver>,
    interval: Interval,
    output: mpsc::Sender<TaggedSnapshot<C::Snapshot>>,
    running: Arc<DashMap<ContainerID, Watched>>,
    generation: AtomicU64,
}

impl<C: RuntimeClient> Supervisor<C> {
    pub fn new(
        client: Arc<C>,
        resolver: IdentityResolver,
        interval: Interval,
        output: mpsc::Sender<TaggedSnapshot<C::Snapshot>>,
    ) -> Self {
        Self {
            client,
            resolver: Arc::new(resolver),
            interval,
            output,
            running: Arc::default(),
            generation: AtomicU64::new(0),
        }
    }

    /// Starts monitoring `container_id` in a new task.
    ///
    /// Returns `false` without doing anything if the container is already monitored.
    pub fn watch(&self, container_id: ContainerID) -> bool {
        match self.running.entry(container_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                let container_id = entry.key().clone();
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let client = Arc::clone(&self.client);
                let resolver = Arc::clone(&self.resolver);
                let interval = self.interval;
                let output = self.output.clone();
                let running = Arc::clone(&self.running);

                let handle = tokio::spawn(async move {
                    supervise(client, &resolver, interval, output, container_id.clone()).await;
                    running.remove_if(&container_id, |_, watched| {
                        watched.generation == generation
                    });
                });
                entry.insert(Watched { generation, handle });
                true
            }
        }
    }

    /// Stops monitoring `container_id`. Returns `false` if it was not monitored.
    pub fn unwatch(&self, container_id: &ContainerID) -> bool {
        match self.running.remove(container_id) {
            Some((_, watched)) => {
                watched.handle.abort();
                log::debug!("Stopped monitoring container `{}`", container_id);
                true
            }
            None => false,
        }
    }

    pub fn is_watching(&self, container_id: &ContainerID) -> bool {
        self.running.contains_key(container_id)
    }

    pub fn size(&self) -> usize {
        self.running.len()
    }
}

async fn supervise<C: RuntimeClient>(
    client: Arc<C>,
    resolver: &IdentityResolver,
    interval: Interval,
    output: mpsc::Sender<TaggedSnapshot<C::Snapshot>>,
    container_id: ContainerID,
) {
    let monitor = Monitor::new(client, container_id.clone(), interval.get(), resolver).await;
    let level = match &monitor {
        Err(err) if err.is_no_need_to_monitor() => log::Level::Debug,
        _ => log::Level::Error,
    };
    let Some(monitor) = monitor.ok_log_at(level) else {
        return;
    };

    if monitor.run(output).await.ok_log().is_some() {
        log::debug!("Stopped monitoring container `{}`", container_id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;
    use crate::config::Config;
    use crate::runtime::testing::FakeRuntime;

    fn id(raw: &str) -> ContainerID {
        ContainerID::new(raw).unwrap()
    }

    fn supervisor(
        client: FakeRuntime,
        interval: usize,
    ) -> (Supervisor<FakeRuntime>, mpsc::Receiver<TaggedSnapshot<u32>>) {
        let (tx, rx) = mpsc::channel(16);
        let supervisor = Supervisor::new(
            Arc::new(client),
            IdentityResolver::from_config(&Config::default()),
            Interval::new(interval).unwrap(),
            tx,
        );
        (supervisor, rx)
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_watch_is_idempotent_while_running() {
        let hold = Arc::new(Notify::new());
        let client = FakeRuntime::default()
            .with_container("api", &[("app_id", "team/api")], &[], vec![1, 2, 3])
            .with_hold("api", Arc::clone(&hold));
        let (supervisor, mut rx) = supervisor(client, 2);

        assert!(supervisor.watch(id("api")));
        assert!(!supervisor.watch(id("api")));
        assert!(supervisor.is_watching(&id("api")));
        assert_eq!(supervisor.size(), 1);

        assert_eq!(rx.recv().await.unwrap().into_snapshot(), 1);
        assert_eq!(rx.recv().await.unwrap().into_snapshot(), 3);

        hold.notify_one();
        wait_until(|| !supervisor.is_watching(&id("api"))).await;
        assert_eq!(supervisor.size(), 0);

        drop(supervisor);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_declined_and_failing_containers_are_forgotten() {
        let client = FakeRuntime::default()
            .with_container("sidecar", &[], &["PATH=/bin"], vec![1, 2])
            .with_container("api", &[("app_id", "api")], &[], vec![5])
            .with_stream_error("api", "daemon went away");
        let (supervisor, mut rx) = supervisor(client, 1);

        assert!(supervisor.watch(id("sidecar")));
        assert!(supervisor.watch(id("api")));
        assert!(supervisor.watch(id("unknown")));

        let tagged = rx.recv().await.unwrap();
        assert_eq!(tagged.tags().get("app"), Some("api"));
        assert_eq!(tagged.into_snapshot(), 5);

        wait_until(|| supervisor.size() == 0).await;
        drop(supervisor);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unwatch_aborts_monitor() {
        let hold = Arc::new(Notify::new());
        let client = FakeRuntime::default()
            .with_container("api", &[("app_id", "api")], &[], vec![])
            .with_hold("api", hold);
        let (supervisor, _rx) = supervisor(client, 1);

        assert!(supervisor.watch(id("api")));
        assert!(supervisor.unwatch(&id("api")));
        assert!(!supervisor.unwatch(&id("api")));
        assert!(!supervisor.is_watching(&id("api")));

        // a fresh monitor can be started right away
        assert!(supervisor.watch(id("api")));
        assert!(supervisor.is_watching(&id("api")));
    }
}
