use serde::{Deserialize, Serialize};

// json format

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub id: String,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
}

#[derive(Deserialize)]
pub struct DeleteUploadQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteFileResponse {
    pub success: bool,
    pub message: String,
}
