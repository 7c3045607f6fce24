use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::image_job::{ImageJob, JobCompletion, JobStatus, NewImageJob};
use crate::ports::job_repository::{JobRepository, JobRepositoryError};

/// Job store implemented using Postgres
pub struct JobPostgresRepository {
    pool: PgPool,
}

impl JobPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const JOB_COLUMNS: &str = "id, user_id, operation, file_name, original_size, processed_size, \
     compression_ratio, status, artifact_name, download_token, expires_at, created_at";

/// Raw row shape; status and operation come back as text and are parsed into
/// their closed enums when converting to the entity.
#[derive(sqlx::FromRow)]
struct ImageJobRow {
    id: i64,
    user_id: Option<Uuid>,
    operation: String,
    file_name: String,
    original_size: i64,
    processed_size: Option<i64>,
    compression_ratio: Option<f64>,
    status: String,
    artifact_name: Option<String>,
    download_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ImageJobRow> for ImageJob {
    type Error = anyhow::Error;

    fn try_from(row: ImageJobRow) -> Result<Self, Self::Error> {
        let operation = row
            .operation
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let status: JobStatus = row.status.parse().map_err(|e: String| anyhow::anyhow!(e))?;

        Ok(ImageJob {
            id: row.id,
            user_id: row.user_id,
            operation,
            file_name: row.file_name,
            original_size: row.original_size,
            processed_size: row.processed_size,
            compression_ratio: row.compression_ratio,
            status,
            artifact_name: row.artifact_name,
            download_token: row.download_token,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl JobRepository for JobPostgresRepository {
    #[tracing::instrument(name = "Saving new job in database", skip(self))]
    async fn create(&self, new_job: &NewImageJob) -> Result<ImageJob, JobRepositoryError> {
        let query = format!(
            "INSERT INTO image_jobs (user_id, operation, file_name, original_size, status)
             VALUES ($1, $2, $3, $4, 'processing')
             RETURNING {}",
            JOB_COLUMNS
        );

        let row = sqlx::query_as::<_, ImageJobRow>(&query)
            .bind(new_job.user_id)
            .bind(new_job.operation.as_str())
            .bind(&new_job.file_name)
            .bind(new_job.original_size)
            .fetch_one(&self.pool)
            .await
            .context("Failed to insert new job")?;

        Ok(row.try_into()?)
    }

    #[tracing::instrument(name = "Marking job as completed in database", skip(self, completion))]
    async fn complete(
        &self,
        job_id: i64,
        completion: &JobCompletion,
    ) -> Result<ImageJob, JobRepositoryError> {
        // Single UPDATE guarded on the current status: only a `processing`
        // row can transition, and the flip plus output fields are one
        // row-level atomic write.
        let query = format!(
            "UPDATE image_jobs
             SET status = 'completed',
                 processed_size = $2,
                 compression_ratio = $3,
                 artifact_name = $4,
                 download_token = $5,
                 expires_at = $6
             WHERE id = $1 AND status = 'processing'
             RETURNING {}",
            JOB_COLUMNS
        );

        let row = sqlx::query_as::<_, ImageJobRow>(&query)
            .bind(job_id)
            .bind(completion.processed_size)
            .bind(completion.compression_ratio)
            .bind(&completion.artifact_name)
            .bind(&completion.download_token)
            .bind(completion.expires_at)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to mark job as completed")?
            .ok_or(JobRepositoryError::JobNotFound(job_id))?;

        Ok(row.try_into()?)
    }

    #[tracing::instrument(name = "Marking job as failed in database", skip(self))]
    async fn fail(&self, job_id: i64) -> Result<ImageJob, JobRepositoryError> {
        let query = format!(
            "UPDATE image_jobs SET status = 'failed' WHERE id = $1 AND status = 'processing' RETURNING {}",
            JOB_COLUMNS
        );

        let row = sqlx::query_as::<_, ImageJobRow>(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to mark job as failed")?
            .ok_or(JobRepositoryError::JobNotFound(job_id))?;

        Ok(row.try_into()?)
    }

    #[tracing::instrument(name = "Fetching job from database", skip(self))]
    async fn get(&self, job_id: i64) -> Result<Option<ImageJob>, JobRepositoryError> {
        let query = format!("SELECT {} FROM image_jobs WHERE id = $1", JOB_COLUMNS);

        let row = sqlx::query_as::<_, ImageJobRow>(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch job")?;

        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(name = "Listing jobs of a user from database", skip(self))]
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ImageJob>, JobRepositoryError> {
        let query = format!(
            "SELECT {} FROM image_jobs WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
            JOB_COLUMNS
        );

        let rows = sqlx::query_as::<_, ImageJobRow>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list jobs for user")?;

        rows.into_iter()
            .map(|row| row.try_into().map_err(JobRepositoryError::Other))
            .collect()
    }
}
