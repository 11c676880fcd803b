use serde::{Deserialize, Serialize};

// json format

#[derive(Deserialize)]
pub struct TagListQuery {
    #[serde(rename = "workspaceId")]
    pub workspace_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, alias = "workspaceId")]
    pub workspace_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteTagResponse {
    pub message: String,
}
