use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::image_job::{ImageJob, JobCompletion, NewImageJob};
use crate::helper::error_chain_fmt;

/// Durable store of job records.
///
/// The status transitions are deliberately narrow: a job is created in
/// `processing` and can only be flipped to `completed` (with its full output
/// record) or `failed`. No operation exists that could leave a `completed`
/// job with missing output fields.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, new_job: &NewImageJob) -> Result<ImageJob, JobRepositoryError>;

    /// Flips the job to `completed`, setting all output fields in one atomic
    /// update: a concurrent reader sees either the processing job or the
    /// fully populated completed one.
    async fn complete(
        &self,
        job_id: i64,
        completion: &JobCompletion,
    ) -> Result<ImageJob, JobRepositoryError>;

    async fn fail(&self, job_id: i64) -> Result<ImageJob, JobRepositoryError>;

    async fn get(&self, job_id: i64) -> Result<Option<ImageJob>, JobRepositoryError>;

    /// The user's most recent jobs, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ImageJob>, JobRepositoryError>;
}

#[derive(thiserror::Error)]
pub enum JobRepositoryError {
    #[error("Job {0} does not exist")]
    JobNotFound(i64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for JobRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
