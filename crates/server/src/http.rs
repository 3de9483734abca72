//! HTTP adapter over [`FileManager`].
//!
//! Routes:
//! - `GET /`, `GET /browse/*path`: directory listing as JSON, or the file itself
//! - `POST /api/upload`: multipart `current_path` then `file`
//! - `POST /api/new_folder`: form `current_path`, `folder_name`
//! - `POST /api/delete/*path`
//! - `GET /api/catalog`, `GET /api/catalog/:group/:tool`
//! - `POST /api/catalog/upload`: multipart `group`, `tool`, `version`, `name`, then `file`

use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use protocol::{
    CatalogGroup, CatalogTool, DirEntryView, ErrorMessage, ListingEntry,
    ListingResponse, MutationResponse, SortKey, UploadResponse,
};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::files::{FileError, FileManager, ReleaseTarget, ReservedUpload, UploadProgress};

/// Shared state of every request.
#[derive(Debug)]
pub struct AppState {
    pub files: FileManager,
    pub notice_text: String,
}

impl AppState {
    pub fn new(files: FileManager, notice_text: impl Into<String>) -> Self {
        Self {
            files,
            notice_text: notice_text.into(),
        }
    }
}

/// A [`FileError`] rendered as an [`ErrorMessage`] response.
#[derive(Debug)]
pub struct ApiError(pub FileError);

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        Self(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self(FileError::InvalidInput(err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            debug!(error = %self.0, code = code.as_str(), "Request rejected");
        }

        let body = ErrorMessage {
            code,
            message: self.0.to_string(),
            context: self.0.path().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(browse_root))
        .route("/browse", get(browse_root))
        .route("/browse/*path", get(browse))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/new_folder", post(new_folder))
        .route("/api/delete", post(delete_root))
        .route("/api/delete/*path", post(delete))
        .route("/api/catalog", get(catalog))
        .route("/api/catalog/:group/:tool", get(catalog_tool))
        .route(
            "/api/catalog/upload",
            post(catalog_upload).layer(DefaultBodyLimit::disable()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Percent-encode each segment of a root-relative path.
pub fn encode_path(relative_path: &str) -> String {
    let encoded: Vec<String> = relative_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("/{}", encoded.join("/"))
}

fn listing_entry(entry: DirEntryView) -> ListingEntry {
    let path = encode_path(&entry.relative_path);
    let delete_url = entry.deletable.then(|| format!("/api/delete{}", path));
    let url = if path == "/" {
        "/browse".to_string()
    } else {
        format!("/browse{}", path)
    };
    ListingEntry {
        url,
        delete_url,
        entry,
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, FileError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError(FileError::Internal(e.to_string())))?
        .map_err(ApiError)
}

#[derive(Debug, Default, Deserialize)]
struct BrowseQuery {
    sort_by: Option<String>,
}

async fn browse_root(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BrowseQuery>,
) -> Result<Response, ApiError> {
    browse_path(state, String::new(), query).await
}

async fn browse(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<BrowseQuery>,
) -> Result<Response, ApiError> {
    browse_path(state, path, query).await
}

async fn browse_path(
    state: Arc<AppState>,
    path: String,
    query: BrowseQuery,
) -> Result<Response, ApiError> {
    let sort_by = SortKey::parse(query.sort_by.as_deref().unwrap_or_default());

    let task_state = state.clone();
    let request_path = path.clone();
    let listing = run_blocking(move || {
        let dir = task_state.files.resolve(&request_path)?;
        let entries = task_state.files.list(&request_path, sort_by, true)?;
        Ok(entries.map(|entries| (dir.relative().to_string(), entries)))
    })
    .await?;

    match listing {
        Some((relative, entries)) => {
            let response = ListingResponse {
                path: relative,
                sort_by,
                notice_text: state.notice_text.clone(),
                features: state.files.features(),
                entries: entries.into_iter().map(listing_entry).collect(),
            };
            Ok(Json(response).into_response())
        }
        None => serve_file(state, path).await,
    }
}

async fn serve_file(state: Arc<AppState>, path: String) -> Result<Response, ApiError> {
    let located = run_blocking(move || state.files.locate_file(&path)).await?;

    let file = tokio::fs::File::open(&located.path)
        .await
        .map_err(|e| FileError::from_io(e, &located.relative_path))?;
    let mime = mime_guess::from_path(&located.path).first_or_octet_stream();

    debug!(path = %located.relative_path, size = located.size, "Serving file");

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_LENGTH, located.size.to_string()),
        ],
        body,
    )
        .into_response())
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut current_path = String::from("/");

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "current_path" => current_path = field.text().await?,
            "file" => {
                let file_name = selected_file_name(&field)?;
                let task_state = state.clone();
                let destination = current_path.clone();
                let reserved = run_blocking(move || {
                    task_state.files.reserve_upload(&destination, &file_name)
                })
                .await?;

                let response = write_field(reserved, field, state.files.max_upload_size()).await?;
                return Ok(Json(response));
            }
            _ => {}
        }
    }

    Err(ApiError(FileError::InvalidInput("no file part".to_string())))
}

#[derive(Debug, Deserialize)]
struct NewFolderForm {
    current_path: Option<String>,
    folder_name: Option<String>,
}

async fn new_folder(
    State(state): State<Arc<AppState>>,
    Form(form): Form<NewFolderForm>,
) -> Result<Json<MutationResponse>, ApiError> {
    let parent = form.current_path.unwrap_or_else(|| "/".to_string());
    let name = form.folder_name.unwrap_or_default();

    let created = run_blocking(move || state.files.create_folder(&parent, &name)).await?;
    Ok(Json(MutationResponse {
        relative_path: created.relative().to_string(),
    }))
}

async fn delete_root(State(state): State<Arc<AppState>>) -> Result<Json<MutationResponse>, ApiError> {
    delete_path(state, String::new()).await
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<MutationResponse>, ApiError> {
    delete_path(state, path).await
}

async fn delete_path(state: Arc<AppState>, path: String) -> Result<Json<MutationResponse>, ApiError> {
    let deleted = run_blocking(move || state.files.delete(&path)).await?;
    Ok(Json(MutationResponse {
        relative_path: deleted.relative().to_string(),
    }))
}

async fn catalog(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CatalogGroup>>, ApiError> {
    let groups = run_blocking(move || state.files.catalog()).await?;
    Ok(Json(groups))
}

async fn catalog_tool(
    State(state): State<Arc<AppState>>,
    Path((group, tool)): Path<(String, String)>,
) -> Result<Json<CatalogTool>, ApiError> {
    let tool = run_blocking(move || state.files.catalog_tool(&group, &tool)).await?;
    Ok(Json(tool))
}

async fn catalog_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut target = ReleaseTarget::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "group" => target.group = field.text().await?,
            "tool" => target.tool = field.text().await?,
            "version" => target.version = field.text().await?,
            "name" => target.name = Some(field.text().await?),
            "file" => {
                let file_name = selected_file_name(&field)?;
                let task_state = state.clone();
                let release = target.clone();
                let reserved = run_blocking(move || {
                    task_state.files.reserve_release(&release, &file_name)
                })
                .await?;

                let response = write_field(reserved, field, state.files.max_upload_size()).await?;
                return Ok(Json(response));
            }
            _ => {}
        }
    }

    Err(ApiError(FileError::InvalidInput("no file part".to_string())))
}

fn selected_file_name(field: &Field<'_>) -> Result<String, ApiError> {
    match field.file_name() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(ApiError(FileError::InvalidInput(
            "no selected file".to_string(),
        ))),
    }
}

/// Stream a multipart field into a reserved file.
///
/// The file is removed if the request fails or is dropped before the body ends.
async fn write_field(
    reserved: ReservedUpload,
    mut field: Field<'_>,
    limit: u64,
) -> Result<UploadResponse, ApiError> {
    let ReservedUpload {
        file,
        guard,
        stored_name,
        relative_path,
    } = reserved;

    let mut file = tokio::fs::File::from_std(file);
    let mut progress = UploadProgress::new(limit);

    let result: Result<(), FileError> = async {
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| FileError::InvalidInput(e.body_text()))?
        {
            progress.record(&chunk)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FileError::from_io(e, &relative_path))?;
        }
        file.flush()
            .await
            .map_err(|e| FileError::from_io(e, &relative_path))
    }
    .await;
    drop(file);

    if let Err(e) = result {
        warn!(path = %relative_path, error = %e, "Upload aborted");
        return Err(ApiError(e));
    }
    guard.keep();

    let (size, sha256) = progress.finish();
    info!(path = %relative_path, size, "Stored upload");

    Ok(UploadResponse {
        stored_name,
        relative_path,
        size,
        sha256,
    })
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("/"), "/");
        assert_eq!(encode_path("/docs/a.txt"), "/docs/a.txt");
        assert_eq!(encode_path("/my docs/r&d #1.txt"), "/my%20docs/r%26d%20%231.txt");
        assert_eq!(encode_path("//a//b"), "/a/b");
    }

    #[test]
    fn test_listing_entry_urls() {
        let entry = DirEntryView {
            name: "a b.txt".to_string(),
            is_directory: false,
            relative_path: "/docs/a b.txt".to_string(),
            size: Some(1),
            size_human: Some("1 Byte".to_string()),
            modified: None,
            modified_human: None,
            category: "text".to_string(),
            icon: "ti ti-file-text".to_string(),
            color: "#000000".to_string(),
            deletable: true,
        };

        let listed = listing_entry(entry.clone());
        assert_eq!(listed.url, "/browse/docs/a%20b.txt");
        assert_eq!(listed.delete_url.as_deref(), Some("/api/delete/docs/a%20b.txt"));

        let parent = listing_entry(DirEntryView {
            deletable: false,
            relative_path: "/".to_string(),
            ..entry
        });
        assert_eq!(parent.url, "/browse");
        assert!(parent.delete_url.is_none());
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError(FileError::PathEscapesRoot("../".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError(FileError::NotFound("/x".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            ApiError(FileError::FeatureDisabled(crate::files::Feature::Upload)).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
