use std::io;

use actix_multipart::{Field, Multipart};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType, CONTENT_TYPE};
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use log::info;

use super::uploads_models::{DeleteFileResponse, DeleteUploadQuery, UploadResponse};
use crate::auth::{authorize, Caller, Policy};
use crate::blob::{self, BlobStore, MAX_UPLOAD_BYTES, UPLOADS_URL_PREFIX};
use crate::error::ApiError;
use crate::models::attachment::{Attachment, NewAttachment};
use crate::store::TaskHubStore;

struct UploadedFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn too_large() -> ApiError {
    ApiError::PayloadTooLarge {
        limit_mb: MAX_UPLOAD_BYTES / (1024 * 1024),
    }
}

fn bad_multipart(e: impl std::fmt::Display) -> ApiError {
    ApiError::Validation(format!("Invalid multipart payload: {}", e))
}

/// Reads a field, giving up as soon as it grows past `limit`.
async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
        if bytes.len() + chunk.len() > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Resolves the attachment's task and checks the caller may touch it.
async fn authorize_attachment(
    store: &dyn TaskHubStore,
    caller: &Caller,
    attachment: &Attachment,
) -> Result<(), ApiError> {
    let task = store
        .find_task(&attachment.task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attachment"))?;
    authorize(store, caller, &task.workspace_id, Policy::Member)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::not_found("Attachment"),
            other => other,
        })?;
    Ok(())
}

/// Blob first, best-effort, then the row.
async fn remove_attachment(
    store: &dyn TaskHubStore,
    blobs: &BlobStore,
    attachment: &Attachment,
) -> Result<(), ApiError> {
    blobs.remove_best_effort(&attachment.file_url).await;
    store.delete_attachment(&attachment.id).await?;
    Ok(())
}

// Handler to upload a file and attach it to a task
pub async fn upload_file(
    store: web::Data<dyn TaskHubStore>,
    blobs: web::Data<BlobStore>,
    caller: Caller,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let mut file: Option<UploadedFile> = None;
    let mut task_id: Option<String> = None;

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();
                let content_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_default();
                let bytes = read_field(&mut field, MAX_UPLOAD_BYTES).await?;
                file = Some(UploadedFile { name, content_type, bytes });
            }
            Some("taskId") => {
                let raw = read_field(&mut field, 1024).await?;
                task_id = Some(String::from_utf8_lossy(&raw).trim().to_string());
            }
            _ => {} // ignore unknown fields
        }
    }

    let file = file
        .filter(|f| !f.name.is_empty())
        .ok_or_else(|| ApiError::Validation("No file uploaded".to_string()))?;
    let task_id = task_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("Task ID is required".to_string()))?;
    if !blob::is_allowed_content_type(&file.content_type) {
        return Err(ApiError::UnsupportedMediaType(file.content_type));
    }

    let task = store
        .find_task(&task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    authorize(store, &caller, &task.workspace_id, Policy::Member)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::not_found("Task"),
            other => other,
        })?;

    let stored = blobs
        .save(&file.name, &file.bytes)
        .await
        .map_err(|e| ApiError::internal("Failed to store upload", e))?;
    let created = store
        .create_attachment(NewAttachment {
            file_name: file.name,
            file_url: stored.url.clone(),
            file_size: file.bytes.len() as i64,
            file_type: file.content_type,
            task_id: task.id,
        })
        .await;
    let attachment = match created {
        Ok(attachment) => attachment,
        Err(e) => {
            blobs.remove_best_effort(&stored.url).await;
            return Err(e.into());
        }
    };
    info!("Attachment {} stored for task {} by {}", attachment.id, attachment.task_id, caller.user_id);

    Ok(HttpResponse::Created().json(UploadResponse {
        success: true,
        id: attachment.id,
        file_url: attachment.file_url,
        file_name: attachment.file_name,
        file_size: attachment.file_size,
        file_type: attachment.file_type,
    }))
}

// Handler to delete an uploaded file by its stored name
pub async fn delete_file(
    store: web::Data<dyn TaskHubStore>,
    blobs: web::Data<BlobStore>,
    caller: Caller,
    query: web::Query<DeleteUploadQuery>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let file_name = query
        .file_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("File name is required".to_string()))?;
    if !blob::is_plain_file_name(file_name) {
        return Err(ApiError::Validation("Invalid file name".to_string()));
    }

    let url = format!("{}/{}", UPLOADS_URL_PREFIX, file_name);
    let attachment = store
        .find_attachment_by_url(&url)
        .await?
        .ok_or_else(|| ApiError::not_found("File"))?;
    authorize_attachment(store, &caller, &attachment).await?;
    remove_attachment(store, &blobs, &attachment).await?;
    info!("File {} deleted by {}", file_name, caller.user_id);

    Ok(HttpResponse::Ok().json(DeleteFileResponse {
        success: true,
        message: "File deleted successfully".to_string(),
    }))
}

// Handler to delete an attachment
pub async fn delete_attachment(
    store: web::Data<dyn TaskHubStore>,
    blobs: web::Data<BlobStore>,
    caller: Caller,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let attachment_id = path.into_inner();
    let attachment = store
        .find_attachment(&attachment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attachment"))?;
    authorize_attachment(store, &caller, &attachment).await?;
    remove_attachment(store, &blobs, &attachment).await?;
    info!("Attachment {} deleted by {}", attachment_id, caller.user_id);

    Ok(HttpResponse::Ok().json(DeleteFileResponse {
        success: true,
        message: "Attachment deleted successfully".to_string(),
    }))
}

// Handler to serve a stored file under its public url
pub async fn serve_file(
    store: web::Data<dyn TaskHubStore>,
    blobs: web::Data<BlobStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let file_name = path.into_inner();
    if !blob::is_plain_file_name(&file_name) {
        return Err(ApiError::not_found("File"));
    }
    let url = format!("{}/{}", UPLOADS_URL_PREFIX, file_name);
    let attachment = store
        .find_attachment_by_url(&url)
        .await?
        .ok_or_else(|| ApiError::not_found("File"))?;

    let bytes = match blobs.read(&file_name).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ApiError::not_found("File")),
        Err(e) => return Err(ApiError::internal("Failed to read upload", e)),
    };
    let disposition = ContentDisposition {
        disposition: DispositionType::Inline,
        parameters: vec![DispositionParam::Filename(attachment.file_name)],
    };
    Ok(HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, attachment.file_type))
        .insert_header(disposition)
        .body(bytes))
}
