//! HTTP server for datawebd.

use crate::cache::ReadingCache;
use crate::routes;
use anyhow::Result;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across query handlers. Handlers only ever read
/// the cache; the pollers are the writers.
pub struct AppState {
    pub cache: ReadingCache,
}

/// Build the router serving the JSONP query endpoint.
pub fn app(cache: ReadingCache) -> Router {
    Router::new()
        .merge(routes::query_routes())
        .with_state(Arc::new(AppState { cache }))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until the shutdown future resolves.
pub async fn run(
    addr: &str,
    cache: ReadingCache,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app(cache))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
