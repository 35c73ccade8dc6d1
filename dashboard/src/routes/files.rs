use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use csv_preview::CsvPreview;
use tokio_util::io::ReaderStream;

use crate::db::{StoredFile, files};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::model::FileOut;
use crate::state::AppState;

pub(crate) async fn all_files(state: &AppState) -> Result<Vec<FileOut>, ApiError> {
    let stored = state.with_conn(|conn| Ok(files::list(conn)?)).await?;
    Ok(stored.into_iter().map(FileOut::from).collect())
}

pub(crate) async fn find_file(state: &AppState, file_id: i32) -> Result<StoredFile, ApiError> {
    state
        .with_conn(move |conn| Ok(files::find(conn, file_id)?))
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))
}

pub async fn list_files(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<FileOut>>, ApiError> {
    Ok(Json(all_files(&state).await?))
}

pub async fn preview_file(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
) -> Result<Json<CsvPreview>, ApiError> {
    let file = find_file(&state, file_id).await?;
    let max_rows = state.config.preview_max_rows;

    let preview = tokio::task::spawn_blocking(move || {
        csv_preview::preview(&file.storage_path, max_rows)
    })
    .await??;

    tracing::debug!(
        "Previewed file {}: {} columns, {} rows",
        file_id,
        preview.headers.len(),
        preview.rows.len()
    );
    Ok(Json(preview))
}

pub async fn download_file(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
) -> Result<Response, ApiError> {
    let file = find_file(&state, file_id).await?;

    let handle = match tokio::fs::File::open(&file.storage_path).await {
        Ok(handle) => handle,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Registered file is missing on disk: {}", file.storage_path);
            return Err(ApiError::not_found("File not found"));
        }
        Err(err) => return Err(err.into()),
    };

    let disposition = HeaderValue::from_str(&content_disposition(&file.filename))
        .map_err(|err| ApiError::internal("invalid content disposition", err))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(handle)),
    )
        .into_response())
}

/// `attachment` disposition carrying `filename`, with an RFC 5987
/// `filename*` parameter when the name is not plain ASCII.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();

    if fallback == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
