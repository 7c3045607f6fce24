use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;

use crate::domain::entities::user_context::UserContext;
use crate::helper::error_chain_fmt;
use crate::ports::job_repository::{JobRepository, JobRepositoryError};
use crate::routes::job_summary::JobSummary;

/// Number of jobs returned by the recent-jobs listing.
const RECENT_JOBS_LIMIT: i64 = 50;

#[tracing::instrument(name = "My jobs handler", skip(user, job_repository))]
pub async fn my_jobs(
    user: web::ReqData<UserContext>,
    job_repository: web::Data<dyn JobRepository>,
) -> Result<HttpResponse, MyJobsError> {
    let user_id = user.user_id.ok_or(MyJobsError::NotAuthenticated)?;

    let jobs = job_repository
        .list_for_user(user_id, RECENT_JOBS_LIMIT)
        .await?;

    let summaries: Vec<JobSummary> = jobs.iter().map(JobSummary::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "jobs": summaries })))
}

#[derive(thiserror::Error)]
pub enum MyJobsError {
    #[error("Authentication required")]
    NotAuthenticated,
    #[error("Failed to read the job store")]
    JobStore(#[from] JobRepositoryError),
}

impl std::fmt::Debug for MyJobsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for MyJobsError {
    fn status_code(&self) -> StatusCode {
        match self {
            MyJobsError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            MyJobsError::JobStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
