use uuid::Uuid;

use super::operation::OperationType;

/// One append-only record of a tool invocation, consumed by the usage
/// recorder. Recording is fire-and-forget: it never blocks or fails the job
/// pipeline.
#[derive(Debug, Clone)]
pub struct ToolUsageRecord {
    pub operation: OperationType,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
