use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Colour assigned to a tag created without one.
pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub workspace_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagCounts {
    pub tasks: i64,
}

/// Tag listing entry with the number of tasks carrying it.
#[derive(Debug, Clone, Serialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    #[serde(rename = "_count")]
    pub count: TagCounts,
}
