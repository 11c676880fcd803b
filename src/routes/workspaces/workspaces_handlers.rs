use actix_web::{web, HttpResponse};
use log::info;

use super::workspaces_models::{
    AddMemberRequest, CreateWorkspaceRequest, DeleteWorkspaceResponse, RenameWorkspaceRequest,
};
use crate::auth::{Caller, Owner, Policy};
use crate::blob::BlobStore;
use crate::error::ApiError;
use crate::models::membership::{MemberRef, Role};
use crate::models::workspace::{personal_workspace_id, WorkspaceSummary};
use crate::routes::workspace_access::workspace_access;
use crate::store::TaskHubStore;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

async fn summary_of(store: &dyn TaskHubStore, workspace_id: &str) -> Result<WorkspaceSummary, ApiError> {
    store
        .workspace_detail(workspace_id)
        .await?
        .map(WorkspaceSummary::from)
        .ok_or_else(|| ApiError::not_found("Workspace"))
}

// Handler to list the caller's workspaces
pub async fn get_workspace_list(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
) -> Result<HttpResponse, ApiError> {
    let personal_id = personal_workspace_id(&caller.user_id);
    let workspaces = store
        .list_workspaces_for_user(&caller.user_id, &personal_id)
        .await?;
    Ok(HttpResponse::Ok().json(workspaces))
}

// Handler to create a shared workspace with the caller as admin
pub async fn create_workspace(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    request: web::Json<CreateWorkspaceRequest>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let (Some(name), Some(organization_id)) = (
        non_empty(request.name.as_deref()),
        non_empty(request.organization_id.as_deref()),
    ) else {
        return Err(ApiError::Validation("Name and organizationId are required".to_string()));
    };
    if let Owner::Personal(_) = Owner::resolve(organization_id) {
        return Err(ApiError::Validation("organizationId is reserved for personal workspaces".to_string()));
    }

    let workspace = store.create_workspace(organization_id, name, &caller.user_id).await?;
    info!("Workspace {} created by {}", workspace.id, caller.user_id);
    let summary = summary_of(store, &workspace.id).await?;
    Ok(HttpResponse::Created().json(summary))
}

// Handler to get a workspace with members, tasks and tags
pub async fn get_workspace(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let workspace_id = path.into_inner();
    workspace_access(store, &caller, Some(&workspace_id), Policy::Member).await?;

    let detail = store
        .workspace_detail(&workspace_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Workspace"))?;
    Ok(HttpResponse::Ok().json(detail))
}

// Handler to rename a workspace
pub async fn rename_workspace(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    path: web::Path<String>,
    request: web::Json<RenameWorkspaceRequest>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let workspace_id = path.into_inner();
    workspace_access(store, &caller, Some(&workspace_id), Policy::Admin).await?;
    let name = non_empty(request.name.as_deref())
        .ok_or_else(|| ApiError::Validation("Name is required".to_string()))?;

    store.rename_workspace(&workspace_id, name).await?;
    info!("Workspace {} renamed by {}", workspace_id, caller.user_id);
    let summary = summary_of(store, &workspace_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

// Handler to delete a workspace and everything in it
pub async fn delete_workspace(
    store: web::Data<dyn TaskHubStore>,
    blobs: web::Data<BlobStore>,
    caller: Caller,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let workspace_id = path.into_inner();
    workspace_access(store, &caller, Some(&workspace_id), Policy::Admin).await?;

    let removed = store
        .delete_workspace(&workspace_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Workspace"))?;
    for attachment in &removed {
        blobs.remove_best_effort(&attachment.file_url).await;
    }
    info!("Workspace {} deleted by {}", workspace_id, caller.user_id);
    Ok(HttpResponse::Ok().json(DeleteWorkspaceResponse {
        message: "Workspace deleted successfully".to_string(),
    }))
}

// Handler to list members with their assigned tasks
pub async fn get_member_list(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let workspace_id = path.into_inner();
    workspace_access(store, &caller, Some(&workspace_id), Policy::Member).await?;

    let members = store.list_members(&workspace_id).await?;
    Ok(HttpResponse::Ok().json(members))
}

// Handler to add a member
pub async fn add_member(
    store: web::Data<dyn TaskHubStore>,
    caller: Caller,
    path: web::Path<String>,
    request: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let workspace_id = path.into_inner();
    let access = workspace_access(store, &caller, Some(&workspace_id), Policy::Admin).await?;
    if access.personal {
        return Err(ApiError::Validation("Personal workspaces cannot have members".to_string()));
    }
    let user_id = non_empty(request.user_id.as_deref())
        .ok_or_else(|| ApiError::Validation("user_id is required".to_string()))?;
    let role = request.role.unwrap_or(Role::Member);

    let member = store.add_membership(&workspace_id, user_id, role).await?;
    info!("User {} added to workspace {} as {} by {}", user_id, workspace_id, role, caller.user_id);
    Ok(HttpResponse::Created().json(MemberRef::from(&member)))
}
