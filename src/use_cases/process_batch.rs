use actix_multipart::form::tempfile::TempFile;
use chrono::{Duration, Utc};
use tracing::warn;

use crate::domain::entities::image_job::{
    compression_ratio, ImageJob, JobCompletion, NewImageJob,
};
use crate::domain::entities::operation::{OperationSettings, OperationType};
use crate::domain::entities::user_context::UserContext;
use crate::domain::services::download_token;
use crate::helper::error_chain_fmt;
use crate::ports::artifact_repository::{ArtifactRepository, ArtifactRepositoryError};
use crate::ports::image_transformer::{ImageTransformer, ImageTransformerError};
use crate::ports::job_repository::{JobRepository, JobRepositoryError};

/// An upload that already passed the request-level checks (mime type, size).
///
/// The temporary file lives as long as this value: the pipeline reads the
/// input from disk, and the file is removed when the batch is done with it.
pub struct AcceptedUpload {
    pub temp_file: TempFile,
    pub file_name: String,
    pub size: i64,
}

#[derive(thiserror::Error)]
pub enum ProcessBatchError {
    #[error("Failed to update the job store")]
    JobStore(#[from] JobRepositoryError),
}

impl std::fmt::Debug for ProcessBatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// A failure contained to one file of the batch. The job is marked failed
/// and the rest of the batch continues.
#[derive(thiserror::Error, Debug)]
enum ProcessingFailure {
    #[error(transparent)]
    Transform(#[from] ImageTransformerError),
    #[error(transparent)]
    Artifact(#[from] ArtifactRepositoryError),
}

/// Runs one operation over a batch of uploads, one job per file.
///
/// Files are processed sequentially and independently: a transformation
/// failure marks that job failed and moves on. Only a job-store failure
/// aborts the batch, as nothing can be tracked without it.
#[tracing::instrument(
    name = "Processing a batch of uploads",
    skip(files, job_repository, artifact_repository, transformer)
)]
pub async fn process_batch(
    user: &UserContext,
    operation: OperationType,
    settings: &OperationSettings,
    files: Vec<AcceptedUpload>,
    retention: Duration,
    job_repository: &dyn JobRepository,
    artifact_repository: &dyn ArtifactRepository,
    transformer: &dyn ImageTransformer,
) -> Result<Vec<ImageJob>, ProcessBatchError> {
    let mut jobs = Vec::with_capacity(files.len());

    for file in files {
        let job = process_single(
            user,
            operation,
            settings,
            file,
            retention,
            job_repository,
            artifact_repository,
            transformer,
        )
        .await?;
        jobs.push(job);
    }

    Ok(jobs)
}

#[allow(clippy::too_many_arguments)]
async fn process_single(
    user: &UserContext,
    operation: OperationType,
    settings: &OperationSettings,
    file: AcceptedUpload,
    retention: Duration,
    job_repository: &dyn JobRepository,
    artifact_repository: &dyn ArtifactRepository,
    transformer: &dyn ImageTransformer,
) -> Result<ImageJob, ProcessBatchError> {
    let new_job = NewImageJob::builder()
        .user_id(user.user_id)
        .operation(operation)
        .file_name(file.file_name.clone())
        .original_size(file.size)
        .build();

    let job = job_repository.create(&new_job).await?;

    match run_pipeline(&job, settings, &file, retention, artifact_repository, transformer).await {
        Ok(completion) => Ok(job_repository.complete(job.id, &completion).await?),
        Err(error) => {
            warn!(?error, job_id = job.id, "Processing failed, marking job as failed");
            Ok(job_repository.fail(job.id).await?)
        }
    }
}

/// Transforms the input and stores the artifact, producing the completion
/// record. Nothing here touches the job store.
async fn run_pipeline(
    job: &ImageJob,
    settings: &OperationSettings,
    file: &AcceptedUpload,
    retention: Duration,
    artifact_repository: &dyn ArtifactRepository,
    transformer: &dyn ImageTransformer,
) -> Result<JobCompletion, ProcessingFailure> {
    let input_path = file.temp_file.file.path();

    let mut output = transformer.transform(input_path, settings).await?;

    // A compression that did not shrink its input gets one retry at a more
    // aggressive quality; the retried output is kept either way.
    if output.len() as i64 >= file.size {
        if let Some(aggressive) = settings.more_aggressive() {
            output = transformer.transform(input_path, &aggressive).await?;
        }
    }

    let artifact_name = artifact_repository
        .store(job.id, &file.file_name, &output)
        .await?;

    let processed_size = output.len() as i64;

    Ok(JobCompletion {
        processed_size,
        compression_ratio: compression_ratio(file.size, processed_size),
        artifact_name,
        download_token: download_token::generate(),
        expires_at: Utc::now() + retention,
    })
}
