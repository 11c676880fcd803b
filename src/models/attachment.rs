use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub task_id: String,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub task_id: String,
}
