use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde_json::json;

use crate::domain::entities::operation::OperationType;
use crate::domain::entities::tool_usage::ToolUsageRecord;
use crate::domain::entities::user_context::UserContext;
use crate::helper::error_chain_fmt;
use crate::ports::usage_recorder::{UsageRecorder, UsageRecorderError};
use crate::routes::client_metadata;

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackUsageBody {
    pub tool_type: String,
    pub session_id: Option<String>,
}

/// Explicit usage-tracking endpoint, for client flows that do not go through
/// the job pipeline. Unlike the pipeline's fire-and-forget recording, this
/// one reports failures to the caller.
#[tracing::instrument(name = "Track usage handler", skip(request, user, usage_recorder))]
pub async fn track_usage(
    body: web::Json<TrackUsageBody>,
    request: HttpRequest,
    user: web::ReqData<UserContext>,
    usage_recorder: web::Data<dyn UsageRecorder>,
) -> Result<HttpResponse, TrackUsageError> {
    let operation: OperationType = body
        .tool_type
        .parse()
        .map_err(TrackUsageError::UnknownOperation)?;

    let (user_agent, ip_address) = client_metadata(&request);
    let record = ToolUsageRecord {
        operation,
        user_id: user.user_id,
        session_id: body.session_id.clone(),
        user_agent,
        ip_address,
    };

    usage_recorder.record(&record).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[derive(thiserror::Error)]
pub enum TrackUsageError {
    #[error("{0}")]
    UnknownOperation(String),
    #[error("Failed to track usage")]
    RecorderError(#[from] UsageRecorderError),
}

impl std::fmt::Debug for TrackUsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for TrackUsageError {
    fn status_code(&self) -> StatusCode {
        match self {
            TrackUsageError::UnknownOperation(_) => StatusCode::BAD_REQUEST,
            TrackUsageError::RecorderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
