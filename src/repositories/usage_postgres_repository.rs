use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::entities::tool_usage::ToolUsageRecord;
use crate::ports::usage_recorder::{UsageRecorder, UsageRecorderError};

/// Usage recorder implemented using Postgres
pub struct UsagePostgresRepository {
    pool: PgPool,
}

impl UsagePostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRecorder for UsagePostgresRepository {
    #[tracing::instrument(name = "Saving tool usage in database", skip(self))]
    async fn record(&self, usage: &ToolUsageRecord) -> Result<(), UsageRecorderError> {
        sqlx::query(
            "INSERT INTO tool_usage (operation, user_id, session_id, user_agent, ip_address, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(usage.operation.as_str())
        .bind(usage.user_id)
        .bind(&usage.session_id)
        .bind(&usage.user_agent)
        .bind(&usage.ip_address)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to insert tool usage record")?;

        Ok(())
    }
}
