//! Durable audit trail of pipeline steps.
//!
//! Every entry is written on its own, independent of whether the step it
//! describes later succeeds. Audit failures are logged and swallowed.

use std::sync::Mutex;

use thiserror::Error;

use crate::models::{AuditAction, AuditEntry};

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit store error: {0}")]
    Store(#[from] crate::db::DatabaseError),

    #[error("Audit log lock poisoned")]
    LockPoisoned,
}

pub trait AuditLogger: Send + Sync {
    fn record(
        &self,
        action: AuditAction,
        details: serde_json::Value,
        application_id: &str,
        event_id: &str,
    ) -> Result<(), AuditError>;
}

/// Record an audit entry, logging instead of propagating failures.
pub fn record_quietly(
    logger: &dyn AuditLogger,
    action: AuditAction,
    details: serde_json::Value,
    application_id: &str,
    event_id: &str,
) {
    if let Err(e) = logger.record(action, details, application_id, event_id) {
        tracing::error!(
            application_id,
            event_id,
            action = action.as_str(),
            error = %e,
            "Failed to write audit entry"
        );
    }
}

/// In-process audit log for tests and dry runs.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries().into_iter().map(|e| e.action).collect()
    }

    pub fn count(&self, action: AuditAction) -> usize {
        self.entries().iter().filter(|e| e.action == action).count()
    }
}

impl AuditLogger for MemoryAuditLog {
    fn record(
        &self,
        action: AuditAction,
        details: serde_json::Value,
        application_id: &str,
        event_id: &str,
    ) -> Result<(), AuditError> {
        let mut entries = self.entries.lock().map_err(|_| AuditError::LockPoisoned)?;
        let id = entries.len() as i64 + 1;
        entries.push(AuditEntry {
            id,
            action,
            details,
            application_id: application_id.to_string(),
            event_id: event_id.to_string(),
            timestamp: chrono::Utc::now().naive_utc(),
        });
        Ok(())
    }
}
