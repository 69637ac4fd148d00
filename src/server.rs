use crate::config::Config;
use crate::error::ProxyError;
use crate::proxy::{NowPlaying, NowPlayingService};
use crate::store::KvStore;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Every path and method lands on the now-playing handler.
pub fn router(service: Arc<NowPlayingService>) -> Router {
    Router::new().fallback(now_playing).with_state(service)
}

pub async fn now_playing(State(service): State<Arc<NowPlayingService>>) -> Response {
    respond(service.handle().await)
}

/// Top-level mapping from an orchestrator outcome to status and JSON body.
/// Always produces a body, including on failure.
pub fn respond(result: Result<NowPlaying, ProxyError>) -> Response {
    let mut resp = match result {
        Ok(NowPlaying::Playing(track)) => (StatusCode::OK, Json(track)).into_response(),
        Ok(NowPlaying::NotPlaying) => {
            (StatusCode::OK, Json(json!({ "isPlaying": false }))).into_response()
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                error!("now-playing failed ({}): {:#}", status, e);
            } else {
                warn!("now-playing rejected ({}): {}", status, e);
            }
            (
                status,
                Json(json!({ "isPlaying": false, "error": e.public_message() })),
            )
                .into_response()
        }
    };
    resp.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    resp
}

pub async fn run(cfg: &Config, store: Arc<dyn KvStore>) -> Result<()> {
    let service = Arc::new(NowPlayingService::new(cfg, store));
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    info!("now-playing proxy listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
