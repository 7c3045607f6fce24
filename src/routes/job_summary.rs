use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::image_job::{ImageJob, JobStatus};
use crate::domain::entities::operation::OperationType;

/// The job representation returned to clients.
///
/// The download url is derived from the job record; the raw token never
/// appears as a standalone field.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: i64,
    pub file_name: String,
    pub operation: OperationType,
    pub original_size: i64,
    pub processed_size: Option<i64>,
    pub compression_ratio: Option<f64>,
    pub status: JobStatus,
    pub download_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&ImageJob> for JobSummary {
    fn from(job: &ImageJob) -> Self {
        Self {
            id: job.id,
            file_name: job.file_name.clone(),
            operation: job.operation,
            original_size: job.original_size,
            processed_size: job.processed_size,
            compression_ratio: job.compression_ratio,
            status: job.status,
            download_url: job.download_path(),
            expires_at: job.expires_at,
            created_at: job.created_at,
        }
    }
}
