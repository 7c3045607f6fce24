use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::domain::entities::image_job::{ImageJob, JobStatus};
use crate::domain::services::download_token;
use crate::helper::error_chain_fmt;
use crate::ports::artifact_repository::{ArtifactRepository, ArtifactRepositoryError};
use crate::ports::job_repository::{JobRepository, JobRepositoryError};

/// Serves a processed artifact after walking the full validation ladder:
/// the job must exist and be completed, must not be expired, and the token
/// must match. Only then is the artifact read.
///
/// A nonexistent job and a not-yet-completed job are indistinguishable to the
/// caller; failed and expired jobs never regain downloadability.
#[tracing::instrument(name = "Download artifact handler", skip(job_repository, artifact_repository))]
pub async fn download(
    path: web::Path<(String, i64)>,
    job_repository: web::Data<dyn JobRepository>,
    artifact_repository: web::Data<dyn ArtifactRepository>,
) -> Result<HttpResponse, DownloadError> {
    let (token, job_id) = path.into_inner();

    let job = job_repository
        .get(job_id)
        .await?
        .ok_or(DownloadError::NotReady)?;

    if job.status != JobStatus::Completed {
        return Err(DownloadError::NotReady);
    }

    let (artifact_name, expected_token) = completed_fields(&job)?;

    if job.is_expired_at(Utc::now()) {
        return Err(DownloadError::Expired);
    }

    if !download_token::verify(&token, expected_token) {
        return Err(DownloadError::InvalidToken);
    }

    let bytes = match artifact_repository.retrieve(artifact_name).await {
        Ok(bytes) => bytes,
        Err(ArtifactRepositoryError::ArtifactNotFound(name)) => {
            error!(
                job_id = job.id,
                artifact_name = %name,
                "Completed job points at a missing artifact"
            );
            return Err(DownloadError::MissingArtifact);
        }
        Err(error) => return Err(DownloadError::ArtifactStore(error)),
    };

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "application/octet-stream"))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", job.download_file_name()),
        ))
        .insert_header((header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"))
        .insert_header((header::PRAGMA, "no-cache"))
        .insert_header((header::EXPIRES, "0"))
        .body(bytes))
}

/// A completed job carries all three output fields; a record missing any of
/// them is an integrity anomaly and is never served.
fn completed_fields(job: &ImageJob) -> Result<(&String, &String), DownloadError> {
    match (&job.artifact_name, &job.download_token, job.expires_at) {
        (Some(artifact_name), Some(token), Some(_)) => Ok((artifact_name, token)),
        _ => {
            error!(job_id = job.id, "Completed job is missing output fields");
            Err(DownloadError::MissingArtifact)
        }
    }
}

#[derive(thiserror::Error)]
pub enum DownloadError {
    #[error("File not found or not ready")]
    NotReady,
    #[error("File has expired")]
    Expired,
    #[error("Invalid download token")]
    InvalidToken,
    #[error("Processed file not found")]
    MissingArtifact,
    #[error("Failed to read the job store")]
    JobStore(#[from] JobRepositoryError),
    #[error("Failed to read the processed file")]
    ArtifactStore(ArtifactRepositoryError),
}

impl std::fmt::Debug for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for DownloadError {
    fn status_code(&self) -> StatusCode {
        match self {
            DownloadError::NotReady | DownloadError::MissingArtifact => StatusCode::NOT_FOUND,
            DownloadError::Expired => StatusCode::GONE,
            DownloadError::InvalidToken => StatusCode::FORBIDDEN,
            DownloadError::JobStore(_) | DownloadError::ArtifactStore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
