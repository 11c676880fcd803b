use actix_web::{web, HttpResponse};
use log::info;

use super::tags_models::{CreateTagRequest, DeleteTagResponse, TagListQuery, UpdateTagRequest};
use crate::auth::{authorize, Caller, Policy};
use crate::error::ApiError;
use crate::models::tag::{Tag, DEFAULT_TAG_COLOR};
use crate::routes::workspace_access::workspace_access;
use crate::store::TaskHubStore;

fn required_name(name: Option<&str>) -> Result<&str, ApiError> {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ApiError::Validation("Name is required".to_string())),
    }
}

fn color_or<'a>(color: Option<&'a str>, fallback: &'a str) -> &'a str {
    color.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(fallback)
}

async fn load_tag(store: &dyn TaskHubStore, caller: &Caller, tag_id: &str) -> Result<Tag, ApiError> {
    let tag = store
        .find_tag(tag_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag"))?;
    authorize(store, caller, &tag.workspace_id, Policy::Member)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::not_found("Tag"),
            other => other,
        })?;
    Ok(tag)
}

// Handler to get the tag list of a workspace
pub async fn get_tag_list(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    query: web::Query<TagListQuery>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let workspace_id = query
        .workspace_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("workspaceId is required".to_string()))?;
    let access = workspace_access(store, &caller, Some(workspace_id), Policy::Member).await?;
    let tags = store.list_tags(&access.workspace_id).await?;
    Ok(HttpResponse::Ok().json(tags))
}

// Handler to add a tag
pub async fn create_tag(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    request: web::Json<CreateTagRequest>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let name = required_name(request.name.as_deref())?;
    let workspace_id = request
        .workspace_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("workspace_id is required".to_string()))?;
    let access = workspace_access(store, &caller, Some(workspace_id), Policy::Member).await?;

    let color = color_or(request.color.as_deref(), DEFAULT_TAG_COLOR);
    let tag = store.create_tag(&access.workspace_id, name, color).await?;
    info!("Tag {} ({}) created in workspace {}", tag.tag.id, tag.tag.name, access.workspace_id);
    Ok(HttpResponse::Created().json(tag))
}

// Handler to rename or recolor a tag
pub async fn update_tag(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    path: web::Path<String>,
    request: web::Json<UpdateTagRequest>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let tag_id = path.into_inner();
    let name = required_name(request.name.as_deref())?;
    let existing = load_tag(store, &caller, &tag_id).await?;

    let color = color_or(request.color.as_deref(), &existing.color);
    let tag = store.update_tag(&tag_id, name, color).await?;
    info!("Tag {} updated by {}", tag_id, caller.user_id);
    Ok(HttpResponse::Ok().json(tag))
}

// Handler to delete a tag, detaching it from its tasks
pub async fn delete_tag(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let tag_id = path.into_inner();
    load_tag(store, &caller, &tag_id).await?;

    if !store.delete_tag(&tag_id).await? {
        return Err(ApiError::not_found("Tag"));
    }
    info!("Tag {} deleted by {}", tag_id, caller.user_id);
    Ok(HttpResponse::Ok().json(DeleteTagResponse {
        message: "Tag deleted successfully".to_string(),
    }))
}
