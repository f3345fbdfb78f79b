use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A stored photo as seen through a storage listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub stored_filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub modified_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhotoSummary {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DownloadRequest {
    #[serde(rename = "imageNames", default)]
    pub image_names: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
