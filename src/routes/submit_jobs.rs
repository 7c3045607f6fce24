use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use chrono::Duration;
use serde_json::json;
use tracing::error;

use crate::configuration::Settings;
use crate::domain::entities::operation::{
    OperationSettings, OperationSettingsError, OperationType, RawOperationSettings,
};
use crate::domain::entities::tool_usage::ToolUsageRecord;
use crate::domain::entities::user_context::UserContext;
use crate::domain::services::entitlement::{authorize_batch, EntitlementError};
use crate::helper::error_chain_fmt;
use crate::ports::artifact_repository::ArtifactRepository;
use crate::ports::image_transformer::ImageTransformer;
use crate::ports::job_repository::JobRepository;
use crate::ports::usage_recorder::UsageRecorder;
use crate::routes::client_metadata;
use crate::routes::job_summary::JobSummary;
use crate::use_cases::process_batch::{process_batch, AcceptedUpload, ProcessBatchError};

#[derive(Debug, MultipartForm)]
pub struct SubmitJobsForm {
    #[multipart(rename = "images")]
    pub images: Vec<TempFile>,

    pub quality: Option<Text<u8>>,
    #[multipart(rename = "resizeMode")]
    pub resize_mode: Option<Text<String>>,
    pub width: Option<Text<u32>>,
    pub height: Option<Text<u32>>,
    pub percentage: Option<Text<f64>>,
    #[multipart(rename = "maintainAspectRatio")]
    pub maintain_aspect_ratio: Option<Text<bool>>,
    #[multipart(rename = "doNotEnlarge")]
    pub do_not_enlarge: Option<Text<bool>>,
    pub x: Option<Text<u32>>,
    pub y: Option<Text<u32>>,
    pub format: Option<Text<String>>,
    #[multipart(rename = "sessionId")]
    pub session_id: Option<Text<String>>,
}

impl SubmitJobsForm {
    fn raw_settings(&self) -> RawOperationSettings {
        RawOperationSettings {
            quality: self.quality.as_ref().map(|t| t.0),
            resize_mode: self.resize_mode.as_ref().map(|t| t.0.clone()),
            width: self.width.as_ref().map(|t| t.0),
            height: self.height.as_ref().map(|t| t.0),
            percentage: self.percentage.as_ref().map(|t| t.0),
            maintain_aspect_ratio: self.maintain_aspect_ratio.as_ref().map(|t| t.0),
            do_not_enlarge: self.do_not_enlarge.as_ref().map(|t| t.0),
            x: self.x.as_ref().map(|t| t.0),
            y: self.y.as_ref().map(|t| t.0),
            format: self.format.as_ref().map(|t| t.0.clone()),
        }
    }
}

/// Accepts a batch of image uploads and runs the requested operation over it,
/// one job per file.
///
/// All request-level validation (operation, file types, sizes, entitlement,
/// settings) happens before any job is created: a rejected request leaves no
/// trace in the job store.
#[tracing::instrument(
    name = "Submit jobs handler",
    skip(
        form,
        request,
        user,
        settings,
        job_repository,
        artifact_repository,
        transformer,
        usage_recorder
    )
)]
pub async fn submit_jobs(
    path: web::Path<String>,
    MultipartForm(form): MultipartForm<SubmitJobsForm>,
    request: HttpRequest,
    user: web::ReqData<UserContext>,
    settings: web::Data<Settings>,
    job_repository: web::Data<dyn JobRepository>,
    artifact_repository: web::Data<dyn ArtifactRepository>,
    transformer: web::Data<dyn ImageTransformer>,
    usage_recorder: web::Data<dyn UsageRecorder>,
) -> Result<HttpResponse, SubmitJobsError> {
    let operation: OperationType = path
        .into_inner()
        .parse()
        .map_err(SubmitJobsError::UnknownOperation)?;

    if form.images.is_empty() {
        return Err(SubmitJobsError::NoFilesUploaded);
    }

    let raw_settings = form.raw_settings();
    let session_id = form.session_id.map(|t| t.0);

    let mut files = Vec::with_capacity(form.images.len());
    for temp_file in form.images {
        files.push(accept_upload(temp_file, &settings)?);
    }

    authorize_batch(&user, files.len(), settings.storage.max_batch_size)?;

    let operation_settings = OperationSettings::parse(operation, raw_settings)?;

    record_usage(&usage_recorder, operation, &user, session_id, &request);

    let jobs = process_batch(
        &user,
        operation,
        &operation_settings,
        files,
        Duration::hours(settings.storage.retention_hours),
        job_repository.get_ref(),
        artifact_repository.get_ref(),
        transformer.get_ref(),
    )
    .await?;

    let summaries: Vec<JobSummary> = jobs.iter().map(JobSummary::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "jobs": summaries })))
}

/// Request-level checks on one upload: allowed mime type and size limit.
fn accept_upload(
    temp_file: TempFile,
    settings: &Settings,
) -> Result<AcceptedUpload, SubmitJobsError> {
    let file_name = temp_file
        .file_name
        .clone()
        .unwrap_or_else(|| "upload".to_string());

    let mime_type = temp_file
        .content_type
        .as_ref()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default();
    if !settings.storage.is_mime_type_allowed(&mime_type) {
        return Err(SubmitJobsError::InvalidFile(format!(
            "File type {} is not supported for {}",
            mime_type, file_name
        )));
    }

    if temp_file.size as u64 > settings.storage.max_file_size_bytes {
        return Err(SubmitJobsError::InvalidFile(format!(
            "File {} exceeds the maximum size of {} bytes",
            file_name, settings.storage.max_file_size_bytes
        )));
    }

    let size = temp_file.size as i64;
    Ok(AcceptedUpload {
        temp_file,
        file_name,
        size,
    })
}

/// Fire-and-forget usage recording: a failure is logged, never surfaced.
fn record_usage(
    usage_recorder: &web::Data<dyn UsageRecorder>,
    operation: OperationType,
    user: &UserContext,
    session_id: Option<String>,
    request: &HttpRequest,
) {
    let (user_agent, ip_address) = client_metadata(request);
    let record = ToolUsageRecord {
        operation,
        user_id: user.user_id,
        session_id,
        user_agent,
        ip_address,
    };

    let usage_recorder = usage_recorder.clone();
    tokio::spawn(async move {
        if let Err(error) = usage_recorder.record(&record).await {
            error!(?error, "Failed to record tool usage");
        }
    });
}

#[derive(thiserror::Error)]
pub enum SubmitJobsError {
    #[error("{0}")]
    UnknownOperation(String),
    #[error("No files were uploaded")]
    NoFilesUploaded,
    #[error("{0}")]
    InvalidFile(String),
    #[error(transparent)]
    InvalidSettings(#[from] OperationSettingsError),
    #[error(transparent)]
    NotEntitled(#[from] EntitlementError),
    #[error("Failed to process the uploaded files")]
    ProcessingError(#[from] ProcessBatchError),
}

impl std::fmt::Debug for SubmitJobsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubmitJobsError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubmitJobsError::UnknownOperation(_)
            | SubmitJobsError::NoFilesUploaded
            | SubmitJobsError::InvalidFile(_)
            | SubmitJobsError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
            SubmitJobsError::NotEntitled(_) => StatusCode::FORBIDDEN,
            SubmitJobsError::ProcessingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
