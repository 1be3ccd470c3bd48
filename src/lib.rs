use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use config::Config;
use container::ContainerID;
use identity::IdentityResolver;
use runtime::DockerClient;
use sampler::TaggedSnapshot;
use supervisor::Supervisor;

/// Creo Tagger: attaches application, group and task tags to the resource usage
/// stats of running containers.
///
/// The identity of a container is resolved from its labels and environment
/// ([`identity`]), expanded into hierarchical tags ([`tags`]) and attached to every
/// sampled stats snapshot the container runtime streams for it ([`monitor`],
/// [`sampler`]).
pub mod config;
pub mod container;
pub mod error;
pub mod identity;
pub mod monitor;
pub mod runtime;
pub mod sampler;
pub mod supervisor;
pub mod tags;

/// Runs the Creo Tagger application.
///
/// Monitors every container id passed on the command line through the Docker
/// Engine API and prints each tagged snapshot as one JSON line to stdout. Returns
/// once all monitors have ended.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration (e.g., a zero `STATS_INTERVAL`).
/// - Missing or invalid container ids.
/// - I/O errors when writing to stdout.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let container_ids = std::env::args()
        .skip(1)
        .map(ContainerID::new)
        .collect::<Result<Vec<_>, _>>()?;
    if container_ids.is_empty() {
        return Err("usage: creo-tagger <container-id>...".into());
    }
    log::debug!("Configuration: {:?}", config);

    let client = Arc::new(DockerClient::new(config.docker_socket()));
    let (tx, rx) = mpsc::channel(config.output_capacity());
    {
        let supervisor = Supervisor::new(
            client,
            IdentityResolver::from_config(&config),
            config.interval(),
            tx,
        );
        for container_id in container_ids {
            if !supervisor.watch(container_id.clone()) {
                log::warn!("Container `{}` given more than once", container_id);
            }
        }
    }

    let written = write_json_lines(rx, tokio::io::stdout()).await?;
    log::debug!("All monitors ended after {} snapshot(s)", written);

    Ok(())
}

/// Writes every tagged snapshot received on `rx` as one JSON document per line.
///
/// Returns the number of written lines once all senders are gone.
///
/// # Errors
///
/// Returns an error if serializing or writing fails.
pub async fn write_json_lines<S: serde::Serialize>(
    mut rx: mpsc::Receiver<TaggedSnapshot<S>>,
    mut out: impl AsyncWrite + Unpin,
) -> std::io::Result<u64> {
    let mut written = 0;
    let mut line = Vec::new();
    while let Some(tagged) = rx.recv().await {
        line.clear();
        serde_json::to_writer(&mut line, &tagged)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
        written += 1;
    }
    Ok(written)
}
