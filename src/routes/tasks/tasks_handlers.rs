use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use log::info;

use super::tasks_models::{CreateTaskRequest, DeleteTaskResponse, TaskListQuery, UpdateTaskRequest};
use crate::auth::{authorize, Caller, Policy};
use crate::blob::BlobStore;
use crate::error::ApiError;
use crate::models::task::{parse_datetime, NewTask, Task};
use crate::routes::workspace_access::workspace_access;
use crate::store::TaskHubStore;

async fn load_task(store: &dyn TaskHubStore, caller: &Caller, task_id: &str) -> Result<Task, ApiError> {
    let task = store
        .find_task(task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    authorize(store, caller, &task.workspace_id, Policy::Member)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::not_found("Task"),
            other => other,
        })?;
    Ok(task)
}

async fn check_assignee(store: &dyn TaskHubStore, workspace_id: &str, assignee_id: &str) -> Result<(), ApiError> {
    match store.find_membership_by_id(assignee_id).await? {
        Some(member) if member.workspace_id == workspace_id => Ok(()),
        _ => Err(ApiError::Validation("Assignee is not a member of this workspace".to_string())),
    }
}

async fn check_tags(store: &dyn TaskHubStore, workspace_id: &str, tag_ids: &[String]) -> Result<(), ApiError> {
    let found = store.find_tags(tag_ids).await?;
    let all_known = tag_ids
        .iter()
        .all(|id| found.iter().any(|t| &t.id == id && t.workspace_id == workspace_id));
    if !all_known {
        return Err(ApiError::Validation("Tags must belong to the task's workspace".to_string()));
    }
    Ok(())
}

fn parse_date_field(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw {
        Some(raw) => parse_datetime(raw).map_err(|e| ApiError::Validation(format!("{}: {}", name, e))),
        None => Ok(None),
    }
}

// Handler to list the top-level tasks of a workspace
pub async fn get_task_list(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let access = workspace_access(store, &caller, query.workspace_id.as_deref(), Policy::Member).await?;
    let tasks = store.list_tasks(&access.workspace_id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

// Handler to create a task
pub async fn create_task(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    request: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let request = request.into_inner();

    let title = request.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }

    let access = workspace_access(store, &caller, request.workspace_id.as_deref(), Policy::Member).await?;
    let workspace_id = access.workspace_id;

    let due_date = parse_date_field("due_date", request.due_date.as_deref())?;
    let start_date = parse_date_field("start_date", request.start_date.as_deref())?;

    let parent_id = request.parent_id.filter(|id| !id.is_empty());
    if let Some(parent_id) = &parent_id {
        match store.find_task(parent_id).await? {
            Some(parent) if parent.workspace_id == workspace_id => {}
            _ => return Err(ApiError::Validation("Parent task not found in this workspace".to_string())),
        }
    }
    let assignee_id = request.assignee_id.filter(|id| !id.is_empty());
    if let Some(assignee_id) = &assignee_id {
        check_assignee(store, &workspace_id, assignee_id).await?;
    }
    let tag_ids = request.tag_ids.unwrap_or_default();
    if !tag_ids.is_empty() {
        check_tags(store, &workspace_id, &tag_ids).await?;
    }

    let task = store
        .create_task(NewTask {
            title: title.to_string(),
            description: request.description,
            status: request.status.unwrap_or_default(),
            priority: request.priority.unwrap_or_default(),
            due_date,
            start_date,
            workspace_id,
            assignee_id,
            parent_id,
        })
        .await?;
    if !tag_ids.is_empty() {
        store.set_task_tags(&task.id, &tag_ids).await?;
    }
    info!("Task {} created in workspace {} by {}", task.id, task.workspace_id, caller.user_id);

    let view = store
        .task_view(&task.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    Ok(HttpResponse::Created().json(view))
}

// Handler to update a task, used by both PUT and PATCH
pub async fn update_task(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    path: web::Path<String>,
    request: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let task_id = path.into_inner();
    let UpdateTaskRequest { patch, tag_ids } = request.into_inner();

    let task = load_task(store, &caller, &task_id).await?;

    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::Validation("Title cannot be empty".to_string()));
    }
    if let Some(Some(assignee_id)) = &patch.assignee_id {
        check_assignee(store, &task.workspace_id, assignee_id).await?;
    }
    if let Some(tag_ids) = &tag_ids {
        check_tags(store, &task.workspace_id, tag_ids).await?;
    }

    if !patch.is_empty() {
        store.update_task(&task_id, &patch).await?;
    }
    if let Some(tag_ids) = &tag_ids {
        store.set_task_tags(&task_id, tag_ids).await?;
    }
    info!("Task {} updated by {}", task_id, caller.user_id);

    let view = store
        .task_view(&task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    Ok(HttpResponse::Ok().json(view))
}

// Handler to delete a task with its sub-tasks and attachments
pub async fn delete_task(
    store: web::Data<dyn TaskHubStore>,
    blobs: web::Data<BlobStore>,
    caller: Caller,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let task_id = path.into_inner();
    load_task(store, &caller, &task_id).await?;

    let removed = store
        .delete_task(&task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    for attachment in &removed {
        blobs.remove_best_effort(&attachment.file_url).await;
    }
    info!("Task {} deleted by {} ({} attachments)", task_id, caller.user_id, removed.len());

    Ok(HttpResponse::Ok().json(DeleteTaskResponse { success: true }))
}
