use serde::{Deserialize, Serialize};

use crate::models::membership::Role;

// json format

#[derive(Deserialize)]
pub struct CreateWorkspaceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "organizationId")]
    pub organization_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RenameWorkspaceRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Serialize)]
pub struct DeleteWorkspaceResponse {
    pub message: String,
}
