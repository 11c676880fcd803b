use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::TaskSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
        }
    }

    /// Maps an identity-provider role string (`org:admin`, `org:member`, ...).
    pub fn from_provider(role: &str) -> Self {
        if role == "org:admin" {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "MEMBER" => Ok(Role::Member),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Compact membership projection embedded in workspace and task payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberRef {
    pub id: String,
    pub user_id: String,
    pub role: Role,
}

impl From<&Membership> for MemberRef {
    fn from(m: &Membership) -> Self {
        MemberRef {
            id: m.id.clone(),
            user_id: m.user_id.clone(),
            role: m.role,
        }
    }
}

/// Membership enriched with the tasks assigned to it.
#[derive(Debug, Clone, Serialize)]
pub struct MemberWithTasks {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub assigned_tasks: Vec<TaskSummary>,
}

impl MemberWithTasks {
    pub fn new(member: &Membership, assigned_tasks: Vec<TaskSummary>) -> Self {
        MemberWithTasks {
            id: member.id.clone(),
            user_id: member.user_id.clone(),
            role: member.role,
            assigned_tasks,
        }
    }
}
