//! HTTP and WebSocket routes
//!
//! - `GET /` - liveness message
//! - `GET /streaming/play/{filename}` - media with `Range` support
//! - `GET /streaming/list` - stored media files
//! - `GET /streaming/status` - relay statistics
//! - `GET /ws/stream/{stream_id}` - relay WebSocket

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::media::{MediaFile, MediaResponse, RangeStreamer};
use crate::relay::{RelayHub, StreamId};
use crate::session::RelayConnection;
use crate::stats::HubStats;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Media streamer
    pub streamer: RangeStreamer,
    /// Relay hub
    pub hub: Arc<RelayHub>,
    /// Maximum inbound WebSocket message size
    pub max_frame_size: usize,
    /// Relay connection limit, if any
    pub connection_limit: Option<Arc<Semaphore>>,
}

/// Body of `GET /streaming/list`
#[derive(Debug, Serialize)]
pub struct MediaList {
    /// Stored files, sorted by name
    pub files: Vec<MediaFile>,
}

/// Build the application router
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/streaming/play/{filename}", get(play_media))
        .route("/streaming/list", get(list_media))
        .route("/streaming/status", get(relay_status))
        .route("/ws/stream/{stream_id}", get(stream_socket))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
        ])
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "mediacast media server" }))
}

async fn play_media(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<MediaResponse> {
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    state.streamer.serve(&filename, range).await
}

async fn list_media(State(state): State<AppState>) -> Result<Json<MediaList>> {
    let files = state.streamer.store().list().await?;
    Ok(Json(MediaList { files }))
}

async fn relay_status(State(state): State<AppState>) -> Json<HubStats> {
    Json(state.hub.stats().await)
}

async fn stream_socket(
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let permit = match &state.connection_limit {
        Some(limit) => match Arc::clone(limit).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(stream = %stream_id, "Relay connection rejected: limit reached");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        },
        None => None,
    };

    let hub = Arc::clone(&state.hub);
    let stream_id = StreamId::from(stream_id);

    ws.max_message_size(state.max_frame_size)
        .on_upgrade(move |socket| async move {
            let _permit = permit;
            RelayConnection::new(hub, stream_id).run(socket).await;
        })
        .into_response()
}
