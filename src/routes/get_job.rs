use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;

use crate::helper::error_chain_fmt;
use crate::ports::job_repository::{JobRepository, JobRepositoryError};
use crate::routes::job_summary::JobSummary;

#[tracing::instrument(name = "Get job handler", skip(job_repository))]
pub async fn get_job(
    path: web::Path<i64>,
    job_repository: web::Data<dyn JobRepository>,
) -> Result<HttpResponse, GetJobError> {
    let job_id = path.into_inner();

    let job = job_repository
        .get(job_id)
        .await?
        .ok_or(GetJobError::JobNotFound)?;

    Ok(HttpResponse::Ok().json(JobSummary::from(&job)))
}

#[derive(thiserror::Error)]
pub enum GetJobError {
    #[error("Job not found")]
    JobNotFound,
    #[error("Failed to read the job store")]
    JobStore(#[from] JobRepositoryError),
}

impl std::fmt::Debug for GetJobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for GetJobError {
    fn status_code(&self) -> StatusCode {
        match self {
            GetJobError::JobNotFound => StatusCode::NOT_FOUND,
            GetJobError::JobStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
