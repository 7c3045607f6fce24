use chrono::{DateTime, Utc};
use std::str::FromStr;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::operation::OperationType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// A job never leaves `completed` or `failed` once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("Invalid job status: {}", other)),
        }
    }
}

/// One request to transform one input file with one operation, tracked from
/// creation to a terminal state.
///
/// The output fields (`processed_size`, `compression_ratio`, `artifact_name`,
/// `download_token`, `expires_at`) are all set together when the job
/// completes, and never set on any other path: a token is never observable
/// without a retrievable artifact behind it.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub operation: OperationType,
    /// File name received from the user
    pub file_name: String,
    pub original_size: i64,
    pub processed_size: Option<i64>,
    pub compression_ratio: Option<f64>,
    pub status: JobStatus,
    /// Name of the artifact in the processed-output area
    pub artifact_name: Option<String>,
    pub download_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ImageJob {
    /// Path under which the artifact can be fetched, when the job completed.
    pub fn download_path(&self) -> Option<String> {
        self.download_token
            .as_ref()
            .map(|token| format!("/download/{}/{}", token, self.id))
    }

    /// File name the artifact is served under, e.g. `compressed_photo.jpg`.
    pub fn download_file_name(&self) -> String {
        format!("{}{}", self.operation.download_prefix(), self.file_name)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }
}

/// The fields needed to create a job. Every job starts in `processing`.
#[derive(Debug, Clone, TypedBuilder)]
pub struct NewImageJob {
    #[builder(default)]
    pub user_id: Option<Uuid>,

    pub operation: OperationType,

    pub file_name: String,

    pub original_size: i64,
}

/// The full output record persisted in one atomic update when a job
/// completes. Grouping the fields in one value (instead of a free-form
/// partial update) makes a half-completed job unrepresentable.
#[derive(Debug, Clone)]
pub struct JobCompletion {
    pub processed_size: i64,
    pub compression_ratio: f64,
    pub artifact_name: String,
    pub download_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Size reduction in percent; negative when the output grew.
pub fn compression_ratio(original_size: i64, processed_size: i64) -> f64 {
    if original_size <= 0 {
        return 0.0;
    }
    (original_size - processed_size) as f64 / original_size as f64 * 100.0
}
