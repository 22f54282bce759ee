//! Audit sink. Every successful transition records who did what; a failing
//! sink is logged and never rolls back the state change it describes.

use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::error::WorkflowError;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        district_id: u64,
        actor_id: u64,
        action: &str,
        entity_type: &str,
        entity_id: u64,
        description: &str,
    ) -> Result<(), WorkflowError>;
}

pub struct SqlAuditSink {
    pool: MySqlPool,
}

impl SqlAuditSink {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for SqlAuditSink {
    async fn record(
        &self,
        district_id: u64,
        actor_id: u64,
        action: &str,
        entity_type: &str,
        entity_id: u64,
        description: &str,
    ) -> Result<(), WorkflowError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log
                (district_id, actor_id, action, entity_type, entity_id, description)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(district_id)
        .bind(actor_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Discards audit records. Used in tests and when no audit table is wanted.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(
        &self,
        _district_id: u64,
        _actor_id: u64,
        _action: &str,
        _entity_type: &str,
        _entity_id: u64,
        _description: &str,
    ) -> Result<(), WorkflowError> {
        Ok(())
    }
}
