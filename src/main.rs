/// Entry point for the Creo Tagger.
///
/// Reads its configuration from the environment, monitors the given containers
/// through the Docker Engine API and prints tagged stats snapshots as JSON lines.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid configuration or
/// container ids) or stdout cannot be written.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info STATS_INTERVAL=5 cargo run -- web-1 web-2
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    creo_tagger::run().await
}
