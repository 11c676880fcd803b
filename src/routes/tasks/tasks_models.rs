use serde::{Deserialize, Serialize};

use crate::models::task::{TaskPatch, TaskPriority, TaskStatus};

// json format

#[derive(Deserialize)]
pub struct TaskListQuery {
    #[serde(rename = "workspaceId")]
    pub workspace_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub tag_ids: Option<Vec<String>>,
}

/// Body of PUT and PATCH. Both are partial.
#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(flatten)]
    pub patch: TaskPatch,
    #[serde(default)]
    pub tag_ids: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct DeleteTaskResponse {
    pub success: bool,
}
