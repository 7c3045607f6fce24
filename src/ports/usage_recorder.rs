use async_trait::async_trait;

use crate::domain::entities::tool_usage::ToolUsageRecord;
use crate::helper::error_chain_fmt;

/// Append-only side channel for tool-usage analytics.
///
/// Callers in the job pipeline invoke it fire-and-forget and only log
/// failures: a broken recorder never blocks or fails processing.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record(&self, usage: &ToolUsageRecord) -> Result<(), UsageRecorderError>;
}

#[derive(thiserror::Error)]
pub enum UsageRecorderError {
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for UsageRecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
