//! Axum handlers for the Docker-compatible image API.
//!
//! Routes:
//! - `GET /images/{name}/get` — export an image as a streamed tar archive
//! - `GET /_ping` — liveness probe

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::api_types::{ErrorEnvelope, ExportImageQuery, Platform};
use crate::error::DaemonError;
use crate::export::ImageExportService;

const TAR_CONTENT_TYPE: &str = "application/x-tar";

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct ApiState {
    pub images: Arc<ImageExportService>,
    /// Capacity of the in-memory pipe between the export engine and the
    /// response body. Bounded so a slow client backpressures the engine
    /// instead of buffering the archive.
    pub export_pipe_bytes: usize,
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorEnvelope>) {
    (status, Json(ErrorEnvelope { message: msg.into() }))
}

fn status_for(err: &DaemonError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// `GET /images/{name}/get`
///
/// Resolution runs to completion before the status line is committed: a
/// missing image must surface as 404, never as a truncated 200 stream.
/// Once archive bytes are flowing the status can no longer change; a
/// mid-stream engine failure is logged and truncates the body.
async fn export_image(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(query): Query<ExportImageQuery>,
) -> Response {
    let platform = match query.platform.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => match serde_json::from_str::<Platform>(raw) {
            Ok(platform) => Some(platform),
            Err(err) => {
                let status = StatusCode::BAD_REQUEST;
                debug!(
                    "image export failed: status {}, message: invalid platform filter: {err}",
                    status.as_u16()
                );
                return api_error(status, format!("invalid platform filter: {err}"))
                    .into_response();
            }
        },
        None => None,
    };

    let image = match state.images.resolve(&name).await {
        Ok(image) => image,
        Err(err) => {
            let status = status_for(&err);
            debug!(
                "image export failed: status {}, message: {err}",
                status.as_u16()
            );
            return api_error(status, err.to_string()).into_response();
        }
    };

    // The archive is streamed, never materialized: the engine writes into
    // one end of a bounded pipe while the response body drains the other.
    let (mut writer, reader) = tokio::io::duplex(state.export_pipe_bytes);
    let service = state.images.clone();
    let export_task =
        tokio::spawn(
            async move { service.write_archive(image, platform.as_ref(), &mut writer).await },
        );

    // Wait for the first archive chunk before committing 200: an engine
    // failure that produced no bytes still maps to an error status.
    let mut archive = ReaderStream::new(reader);
    match archive.next().await {
        Some(Ok(first_chunk)) => {
            tokio::spawn(async move {
                match export_task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => debug!("image export aborted after streaming began: {err}"),
                    Err(err) => debug!("image export task failed: {err}"),
                }
            });
            let body = Body::from_stream(
                tokio_stream::once(Ok::<_, std::io::Error>(first_chunk)).chain(archive),
            );
            ([(header::CONTENT_TYPE, TAR_CONTENT_TYPE)], body).into_response()
        }
        // Writer closed without producing bytes: the export either failed
        // outright or the archive is empty.
        first => {
            let outcome = match export_task.await {
                Ok(Ok(())) => first.and_then(|chunk| chunk.err()).map(|err| {
                    DaemonError::Export(format!("archive stream failed: {err}"))
                }),
                Ok(Err(err)) => Some(err),
                Err(err) => Some(DaemonError::Export(format!("export task failed: {err}"))),
            };
            match outcome {
                None => {
                    ([(header::CONTENT_TYPE, TAR_CONTENT_TYPE)], Body::empty()).into_response()
                }
                Some(err) => {
                    let status = status_for(&err);
                    debug!(
                        "image export failed: status {}, message: {err}",
                        status.as_u16()
                    );
                    api_error(status, err.to_string()).into_response()
                }
            }
        }
    }
}

/// Build the daemon API router with CORS and request tracing.
pub fn api_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_ping", get(ping))
        .route("/images/{name}/get", get(export_image))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
