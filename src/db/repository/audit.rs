use std::str::FromStr;

use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::{AuditAction, AuditEntry};

/// Append one entry to the audit log. Returns the new row id.
pub fn insert_audit_entry(
    conn: &Connection,
    action: AuditAction,
    details: &serde_json::Value,
    application_id: &str,
    event_id: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (action, details, application_id, event_id, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            action.as_str(),
            serde_json::to_string(details)?,
            application_id,
            event_id,
            format_timestamp(&chrono::Utc::now().naive_utc()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Entries for one application in insertion order.
pub fn list_audit_entries(
    conn: &Connection,
    application_id: &str,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, action, details, application_id, event_id, timestamp
         FROM audit_log WHERE application_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map(params![application_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (id, action, details, application_id, event_id, timestamp) in rows {
        entries.push(AuditEntry {
            id,
            action: AuditAction::from_str(&action)?,
            details: serde_json::from_str(&details)?,
            application_id,
            event_id,
            timestamp: parse_timestamp(&timestamp)?,
        });
    }
    Ok(entries)
}
