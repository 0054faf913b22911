/// Entry point for the file-metrics container monitoring service.
///
/// This binary connects to the local container runtime's control socket,
/// periodically collects per-container file and resource metrics, and serves
/// them over HTTP for scraping.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid configuration,
/// unreachable runtime socket, or port bind failure).
///
/// # Examples
///
/// ```bash
/// RUNTIME_SOCKET_PATH=/var/run/docker.sock LISTEN_PORT=3000 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    file_metrics::run().await
}
