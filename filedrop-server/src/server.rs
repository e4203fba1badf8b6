use crate::config::Config;
use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use filedrop_core::{
    DEFAULT_CONTENT_TYPE, FileDropError, FileService, MAX_UPLOAD_BYTES, Result,
    UploadFileOperationResult,
};
use serde::Serialize;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub files: FileService,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    id: String,
    filename: String,
    size: u64,
}

impl From<UploadFileOperationResult> for UploadResponse {
    fn from(result: UploadFileOperationResult) -> Self {
        Self {
            id: result.file_id,
            filename: result.filename,
            size: result.size,
        }
    }
}

/// Maps a [`FileDropError`] to a `{"detail": ...}` response without leaking
/// backend error text.
struct ApiError {
    error: FileDropError,
    action: &'static str,
}

impl ApiError {
    fn new(error: FileDropError, action: &'static str) -> Self {
        Self { error, action }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("{} failed: {}", self.action, self.error);
        } else {
            tracing::info!("{} rejected: {}", self.action, self.error);
        }

        let body = serde_json::json!({ "detail": self.error.public_detail(self.action) });
        (status, axum::Json(body)).into_response()
    }
}

pub fn build_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/files", get(list_files).post(upload_file))
        .route("/files/", get(list_files).post(upload_file))
        .route("/files/:file_id", get(download_file))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
}

pub async fn run_server(config: Config) -> Result<()> {
    let builder = config.storage.store_builder();
    let blob_store = builder.build_blob_store()?;
    let metadata_store = builder.build_metadata_store().await?;

    tracing::info!(
        "Storage ready. blob_backend={} metadata_backend={}",
        config.storage.blob_backend,
        config.storage.metadata_backend
    );

    let state = Arc::new(AppState {
        files: FileService::new(blob_store, metadata_store, MAX_UPLOAD_BYTES),
    });

    let app = build_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!("Server listening on {}", config.server.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the metadata table (or SQLite schema) and the local blob root.
pub async fn init_storage(config: &Config) -> Result<()> {
    let builder = config.storage.store_builder();
    builder.build_blob_store()?;
    let metadata_store = builder.build_metadata_store().await?;
    metadata_store.ensure_schema().await?;

    tracing::info!(
        "Storage initialized. metadata_backend={} table={}",
        config.storage.metadata_backend,
        config.storage.table
    );
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({ "status": "ok" })))
}

async fn list_files(State(state): State<Arc<AppState>>) -> Response {
    match state.files.list().await {
        Ok(items) => (StatusCode::OK, axum::Json(items)).into_response(),
        Err(error) => ApiError::new(error, "List files").into_response(),
    }
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let result = match multipart {
        Ok(multipart) => receive_upload(&state, multipart).await,
        Err(rejection) => Err(FileDropError::InvalidRequest(format!(
            "Invalid multipart request: {}",
            rejection.body_text()
        ))),
    };

    match result {
        Ok(result) => {
            (StatusCode::CREATED, axum::Json(UploadResponse::from(result))).into_response()
        }
        Err(error) => ApiError::new(error, "Upload file").into_response(),
    }
}

async fn receive_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<UploadFileOperationResult> {
    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::info!("Failed to read multipart field: {}", error);
        FileDropError::InvalidRequest("Invalid multipart data".to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.trim().is_empty() {
            return Err(FileDropError::InvalidRequest(
                "filename cannot be empty".to_string(),
            ));
        }
        let content_type = field.content_type().map(str::to_string);

        let mut spooled = spool_field(field, state.files.max_upload_bytes()).await?;
        return state
            .files
            .upload(&mut spooled, &filename, content_type.as_deref())
            .await;
    }

    Err(FileDropError::InvalidRequest("No file provided".to_string()))
}

/// Copy a multipart field into an anonymous temp file so it can be hashed
/// and then re-read. Copying stops once more than `limit` bytes have been
/// written; the hasher reports the overflow.
async fn spool_field(
    mut field: axum::extract::multipart::Field<'_>,
    limit: u64,
) -> Result<tokio::fs::File> {
    let mut file = tokio::fs::File::from_std(tempfile::tempfile()?);
    let mut written = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(|error| {
        tracing::info!("Failed to read upload body: {}", error);
        FileDropError::InvalidRequest("Invalid multipart data".to_string())
    })? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if written > limit {
            break;
        }
    }

    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;
    Ok(file)
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Response {
    let file = match state.files.download(&file_id).await {
        Ok(file) => file,
        Err(error) => return ApiError::new(error, "Download file").into_response(),
    };

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let disposition =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.filename))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(file.size)),
        ],
        Body::from_stream(file.body),
    )
        .into_response()
}
