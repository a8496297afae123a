//! HTTP service: upload an archive, download the signed PDF.
//!
//! Routes:
//!
//! | Method | Path                     | Response                                  |
//! |--------|--------------------------|-------------------------------------------|
//! | GET    | `/health`                | `200 {"status":"ok"}`                     |
//! | POST   | `/api/inject-signatory`  | `200 application/pdf` or JSON `{"error"}` |
//!
//! The upload is a `multipart/form-data` body with a required `file` field
//! and an optional `signatoryName` field. All pipeline errors become
//! `500 {"error": "<message>"}`; the only client errors the service itself
//! distinguishes are a missing file (`400`) and a file above
//! `max_archive_bytes` (`413`). The request body cap leaves room for
//! multipart framing, so the file size is checked again once it is read.

use crate::config::{ServerConfig, SignConfig};
use crate::error::SignError;
use crate::pipeline::input::archive_text;
use crate::sign::{sign_archive, signed_file_name};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Multipart field carrying the archive.
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying the optional signatory name.
pub const SIGNATORY_FIELD: &str = "signatoryName";

/// Headroom above the archive cap for multipart framing and the name field.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared, read-only state of the service.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<SignConfig>,
}

/// Errors surfaced to HTTP clients as JSON.
#[derive(Debug)]
pub enum ApiError {
    /// The request had no `file` field.
    NoFile,
    /// The `file` field is larger than the configured archive cap.
    FileTooLarge { size: usize, limit: usize },
    /// The multipart body could not be read (malformed or too large).
    Upload(MultipartError),
    /// A pipeline stage failed.
    Pipeline(SignError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NoFile => (StatusCode::BAD_REQUEST, "No file uploaded".to_string()),
            ApiError::FileTooLarge { size, limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File is {size} bytes, above the {limit}-byte limit"),
            ),
            ApiError::Upload(e) => (e.status(), e.body_text()),
            ApiError::Pipeline(e) => {
                error!("Processing error: {}", e);
                let message = e.to_string();
                let message = if message.trim().is_empty() {
                    "Processing failed".to_string()
                } else {
                    message
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Upload(e)
    }
}

impl From<SignError> for ApiError {
    fn from(e: SignError) -> Self {
        ApiError::Pipeline(e)
    }
}

/// Build the service router around `config`.
pub fn router(config: Arc<SignConfig>) -> Router {
    let body_limit = config.max_archive_bytes.saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/health", get(health))
        .route("/api/inject-signatory", post(inject_signatory))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { config })
}

/// Bind to `server.socket_addr()` and serve until the process exits.
pub async fn serve(server: &ServerConfig, config: Arc<SignConfig>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(server.socket_addr()).await?;
    info!("Server running on {}", listener.local_addr()?);
    axum::serve(listener, router(config)).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn inject_signatory(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<Upload> = None;
    let mut requested_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field.file_name().unwrap_or("document.mhtml").to_string();
                let bytes = field.bytes().await?;
                let limit = state.config.max_archive_bytes;
                if bytes.len() > limit {
                    return Err(ApiError::FileTooLarge {
                        size: bytes.len(),
                        limit,
                    });
                }
                upload = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            Some(SIGNATORY_FIELD) => requested_name = Some(field.text().await?),
            _ => {}
        }
    }

    let Some(upload) = upload else {
        return Err(ApiError::NoFile);
    };

    let signatory = state.config.signatory_or_default(requested_name.as_deref());
    info!(
        "Received '{}' ({} bytes) for signatory '{}'",
        upload.file_name,
        upload.bytes.len(),
        signatory
    );

    let raw = archive_text(&upload.bytes);
    let signed = sign_archive(&raw, &signatory, &state.config).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        signed_file_name(&upload.file_name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        signed.pdf,
    )
        .into_response())
}
