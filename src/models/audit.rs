use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::AuditAction;

/// A durable trace of one pipeline step. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: AuditAction,
    pub details: serde_json::Value,
    pub application_id: String,
    pub event_id: String,
    pub timestamp: NaiveDateTime,
}
