use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::ToSocketAddrs;
use tokio::sync::Notify;

use crate::snapshot::{self, SnapshotStore};

mod render;

/// State shared by scrape handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<SnapshotStore>,
    refresh: Arc<Notify>,
    interval_secs: u64,
}

/// Serves the current snapshot in Prometheus text format.
///
/// Always answers from the published snapshot; a stale one nudges the
/// collection engine but the response never waits for a live probe.
async fn scrape_metrics(State(state): State<AppState>) -> Response {
    let snapshot = state.store.current();
    if snapshot.is_stale(snapshot::now_epoch_secs(), state.interval_secs) {
        state.refresh.notify_one();
    }

    match render::render_snapshot(&snapshot) {
        Ok(body) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(err) => {
            log::error!("failed to render metrics: {}", err);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "failed to render metrics",
            )
                .into_response()
        }
    }
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(
        metrics_path: &str,
        store: Arc<SnapshotStore>,
        refresh: Arc<Notify>,
        collect_interval: Duration,
    ) -> Self {
        let router = axum::Router::new()
            .route(metrics_path, get(scrape_metrics))
            .with_state(AppState {
                store,
                refresh,
                interval_secs: collect_interval.as_secs(),
            });
        Self { router }
    }

    pub async fn listen(self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service()).await
    }
}
