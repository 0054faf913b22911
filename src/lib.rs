use std::sync::Arc;

/// file-metrics: a container file/resource metrics exporter.
///
/// This library discovers running containers through the runtime's control
/// socket, collects their file and resource footprint into immutable
/// snapshots, and serves the current snapshot over HTTP for pull-style
/// scraping.
pub mod api;
pub mod collector;
pub mod config;
pub mod container;
pub mod metrics;
pub mod runtime;
pub mod snapshot;

/// Runs the file-metrics service.
///
/// Loads configuration from the environment, verifies the runtime control
/// socket answers, then runs the collection engine and the HTTP server until
/// a shutdown signal arrives.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration values in the environment.
/// - The runtime control socket not answering at startup.
/// - Failure to bind the listen port.
/// - The collection engine or HTTP server dying unexpectedly.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Loaded configuration: {:?}", config);

    let client = runtime::DockerClient::new(&config.runtime_socket_path, config.fetch_timeout);
    client.ping().await?;
    log::debug!(
        "Runtime control socket `{}` answered ping",
        config.runtime_socket_path.display()
    );

    let store = Arc::new(snapshot::SnapshotStore::new());
    let engine = collector::Engine::new(
        Arc::new(client),
        Arc::clone(&store),
        config.collect_interval,
        config.worker_limit,
    );
    let refresh = engine.refresh_handle();
    let engine_task = tokio::spawn(engine.run());

    let server = api::APIServer::new(
        &config.metrics_path,
        store,
        refresh,
        config.collect_interval,
    );
    let server_task = tokio::spawn(server.listen(("0.0.0.0", config.listen_port)));
    log::info!(
        "Serving metrics on 0.0.0.0:{}{}",
        config.listen_port,
        config.metrics_path
    );

    tokio::select! {
        result = engine_task => match result {
            Ok(()) => Err("collection engine exited unexpectedly".into()),
            Err(err) => Err(format!("collection engine task failed: {err}").into()),
        },
        result = server_task => match result {
            Ok(Ok(())) => Err("HTTP server exited unexpectedly".into()),
            Ok(Err(err)) => Err(format!("HTTP server failed: {err}").into()),
            Err(err) => Err(format!("HTTP server task failed: {err}").into()),
        },
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, exiting");
            Ok(())
        }
    }
}

/// Completes when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
