use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::membership::MemberRef;
use super::tag::Tag;
use super::task::TaskView;

/// Prefix of the synthesized id of a user's personal workspace.
pub const PERSONAL_WORKSPACE_PREFIX: &str = "user_";

/// Name given to a personal workspace when it is provisioned.
pub const PERSONAL_WORKSPACE_NAME: &str = "Personal Workspace";

pub fn personal_workspace_id(user_id: &str) -> String {
    format!("{}{}", PERSONAL_WORKSPACE_PREFIX, user_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceCounts {
    pub tasks: i64,
    pub members: i64,
}

/// Workspace row as returned by listings: members and counts, no task graph.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub members: Vec<MemberRef>,
    #[serde(rename = "_count")]
    pub count: WorkspaceCounts,
}

/// Full workspace graph used to hydrate the board.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceDetail {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub members: Vec<MemberRef>,
    pub tasks: Vec<TaskView>,
    pub tags: Vec<Tag>,
    #[serde(rename = "_count")]
    pub count: WorkspaceCounts,
}

impl From<WorkspaceDetail> for WorkspaceSummary {
    fn from(detail: WorkspaceDetail) -> Self {
        WorkspaceSummary {
            workspace: detail.workspace,
            members: detail.members,
            count: detail.count,
        }
    }
}
