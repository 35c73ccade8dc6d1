use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::db::{files, is_unique_violation, users};
use crate::error::ApiError;
use crate::extract::AdminUser;
use crate::model::{FileOut, UploadQuery, UserOut};
use crate::routes::files::all_files;
use crate::state::AppState;
use crate::storage;

const UPLOAD_FIELD: &str = "file";

fn already_exists() -> ApiError {
    ApiError::Conflict("File already exists. Re-upload with ?replace=true to overwrite.".to_string())
}

pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserOut>>, ApiError> {
    let users = state.with_conn(|conn| Ok(users::list(conn)?)).await?;
    Ok(Json(users.into_iter().map(UserOut::from).collect()))
}

pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    if admin.id == user_id {
        return Err(ApiError::bad_request("Cannot delete yourself"));
    }

    let deleted = state
        .with_conn(move |conn| Ok(users::delete(conn, user_id)?))
        .await?;
    if deleted == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!("Admin {} deleted user {}", admin.username, user_id);
    Ok(Json(json!({ "ok": true, "deleted_user_id": user_id })))
}

pub async fn list_files(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<FileOut>>, ApiError> {
    Ok(Json(all_files(&state).await?))
}

/// Removes the registry entry, then the bytes on disk if they are still there.
pub async fn delete_file(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(file_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let removed = state
        .with_conn(move |conn| Ok(files::delete(conn, file_id)?))
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    storage::remove_best_effort(std::path::Path::new(&removed.storage_path)).await;

    tracing::info!(
        "Admin {} deleted file {} ({})",
        admin.username,
        file_id,
        removed.filename
    );
    Ok(Json(json!({ "ok": true, "deleted_id": file_id })))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::bad_request(err.body_text())
    }
}

async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "File exceeds the upload limit of {} bytes",
                limit
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Stores an uploaded CSV under its original name.
///
/// A name that is already registered is rejected with 409 unless
/// `?replace=true`, in which case the record keeps its id and points at the
/// new bytes.
pub async fn upload_file(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<FileOut>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let raw_name = field.file_name().unwrap_or_default().to_string();
        tracing::debug!("Received upload field: filename={:?}", raw_name);
        let filename = storage::original_name(&raw_name)
            .ok_or_else(|| ApiError::bad_request("Missing filename"))?;
        if !filename.to_lowercase().ends_with(".csv") {
            return Err(ApiError::bad_request("Please upload a .csv file"));
        }

        let data = read_limited(field, state.config.max_upload_bytes).await?;
        upload = Some((filename, data));
        break;
    }
    let Some((filename, data)) = upload else {
        return Err(ApiError::bad_request("Missing file"));
    };

    let lookup = filename.clone();
    let existing = state
        .with_conn(move |conn| Ok(files::find_by_filename(conn, &lookup)?))
        .await?;

    if existing.is_some() && !query.replace {
        return Err(already_exists());
    }

    let stored_at = storage::write_atomic(&state.upload_dir, &filename, &data).await?;
    let storage_path = stored_at.to_string_lossy().into_owned();

    let record = match existing {
        Some(existing) => {
            let file_id = existing.id;
            let path = storage_path.clone();
            let result = state
                .with_conn(move |conn| Ok(files::replace_storage(conn, file_id, &path)?))
                .await;
            let (previous, updated) = match result {
                Ok(replaced) => replaced,
                Err(err) => {
                    storage::remove_best_effort(&stored_at).await;
                    return Err(err);
                }
            };
            storage::remove_best_effort(std::path::Path::new(&previous)).await;
            tracing::info!(
                "Admin {} replaced {} (id {}, {} bytes)",
                admin.username,
                updated.filename,
                updated.id,
                data.len()
            );
            updated
        }
        None => {
            let name = filename.clone();
            let path = storage_path.clone();
            let result = state
                .with_conn(move |conn| match files::create(conn, &name, &path) {
                    Ok(created) => Ok(created),
                    Err(err) if is_unique_violation(&err) => Err(already_exists()),
                    Err(err) => Err(err.into()),
                })
                .await;
            let created = match result {
                Ok(created) => created,
                Err(err) => {
                    storage::remove_best_effort(&stored_at).await;
                    return Err(err);
                }
            };
            tracing::info!(
                "Admin {} uploaded {} (id {}, {} bytes)",
                admin.username,
                created.filename,
                created.id,
                data.len()
            );
            created
        }
    };

    Ok(Json(record.into()))
}
