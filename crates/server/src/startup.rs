use std::{net::SocketAddr, path::Path};

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;
use service::{runtime, storage::DocumentStore};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Assemble the application for the given config without binding a socket.
pub fn build_app(cfg: &AppConfig) -> Router {
    let store = DocumentStore::open(&cfg.storage.data_file);
    let state = AppState::new(store);
    routes::build_router(state, Some(Path::new(&cfg.storage.static_dir)), build_cors())
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    runtime::ensure_env(&cfg.storage.static_dir, &cfg.storage.data_file).await?;

    let app = build_app(&cfg);

    let addr = bind_addr(&cfg)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");
    info!(api = %format!("http://{addr}/api"), data_file = %cfg.storage.data_file, "shop api ready");
    axum::serve(listener, app).await?;
    Ok(())
}
