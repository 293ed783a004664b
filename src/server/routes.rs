use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Query, Request, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use crate::export::EXPORT_FILE_NAME;
use crate::record::ImportResult;
use crate::server::AppState;
use crate::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Multipart field holding the archive; any other file field is a fallback
const UPLOAD_FIELD: &str = "file";

#[derive(Deserialize, Default)]
pub struct ArchiveParams {
    #[serde(rename = "type")]
    pub archive_type: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        } else {
            tracing::warn!("Rejected request: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::warn!("Rejected query string: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn post_prices(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ArchiveParams>, QueryRejection>,
    request: Request,
) -> Result<Json<ImportResult>, ApiError> {
    let Query(params) = params?;
    let deadline = state.service.deadline();
    let archive_type = params.archive_type.unwrap_or_default();

    let raw = with_deadline(deadline, read_upload(request, &state)).await?;
    tracing::debug!("Received {} byte upload (type={:?})", raw.len(), archive_type);

    // Past this point the import task alone decides between commit and Timeout.
    let service = state.service.clone();
    let totals = tokio::task::spawn_blocking(move || service.import_until(&archive_type, &raw, deadline))
        .await
        .map_err(|e| ApiError::internal(format!("import task failed: {}", e)))??;

    tracing::info!(
        "Import complete: {} items, {} categories, total {}",
        totals.total_items,
        totals.total_categories,
        totals.total_price
    );
    Ok(Json(totals))
}

pub async fn get_prices(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ArchiveParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    if let Some(hint) = params.archive_type.as_deref() {
        tracing::debug!("Export requested as {:?}; exports are always zip", hint);
    }

    let deadline = state.service.deadline();
    let service = state.service.clone();
    let work = async move {
        tokio::task::spawn_blocking(move || service.export())
            .await
            .map_err(|e| ApiError::internal(format!("export task failed: {}", e)))?
            .map_err(ApiError::from)
    };
    let archive = with_deadline(deadline, work).await?;

    let disposition = format!("attachment; filename={}", EXPORT_FILE_NAME);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}

/// Give up on `work` once the request deadline passes.
async fn with_deadline<T>(
    deadline: Instant,
    work: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::time::timeout_at(deadline.into(), work)
        .await
        .map_err(|_| ApiError::from(Error::Timeout))?
}

/// Read the archive from a raw body or a multipart form.
async fn read_upload(request: Request, state: &Arc<AppState>) -> Result<Vec<u8>, ApiError> {
    if !is_multipart(request.headers()) {
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        return Ok(body.to_vec());
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

    let mut fallback: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let is_upload_field = field.name() == Some(UPLOAD_FIELD);
        let is_file = field.file_name().is_some();
        if !is_upload_field && (fallback.is_some() || !is_file) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        if is_upload_field {
            return Ok(data.to_vec());
        }
        fallback = Some(data.to_vec());
    }

    fallback.ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "multipart: file field not found"))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONTENT_TYPE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|ct| {
            ct.split(';')
                .next()
                .map(|media| media.trim().eq_ignore_ascii_case("multipart/form-data"))
                .unwrap_or(false)
        })
}
