use rusqlite::{params, Connection};
use uuid::Uuid;

use super::format_timestamp;
use crate::db::DatabaseError;
use crate::models::{ExtractionResult, StructuredFields};

/// Store the extraction for a document, replacing any earlier one.
pub fn upsert_extraction(
    conn: &Connection,
    document_id: &Uuid,
    extraction: &ExtractionResult,
) -> Result<(), DatabaseError> {
    let now = format_timestamp(&chrono::Utc::now().naive_utc());
    let fields = serde_json::to_string(&extraction.structured_fields)?;
    conn.execute(
        "INSERT INTO extraction_results (document_id, raw_text, structured_fields,
         overall_confidence, processing_time_ms, used_fallback, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT(document_id) DO UPDATE SET
            raw_text = excluded.raw_text,
            structured_fields = excluded.structured_fields,
            overall_confidence = excluded.overall_confidence,
            processing_time_ms = excluded.processing_time_ms,
            used_fallback = excluded.used_fallback,
            updated_at = excluded.updated_at",
        params![
            document_id.to_string(),
            extraction.raw_text,
            fields,
            extraction.overall_confidence,
            extraction.processing_time_ms as i64,
            extraction.used_fallback as i32,
            now,
        ],
    )?;
    Ok(())
}

pub fn get_extraction(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Option<ExtractionResult>, DatabaseError> {
    let result = conn.query_row(
        "SELECT raw_text, structured_fields, overall_confidence, processing_time_ms, used_fallback
         FROM extraction_results WHERE document_id = ?1",
        params![document_id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f32>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i32>(4)?,
            ))
        },
    );

    match result {
        Ok((raw_text, fields, overall_confidence, processing_time_ms, used_fallback)) => {
            let structured_fields: StructuredFields = serde_json::from_str(&fields)?;
            Ok(Some(ExtractionResult {
                document_id: Some(*document_id),
                raw_text,
                structured_fields,
                overall_confidence,
                processing_time_ms: processing_time_ms.max(0) as u64,
                used_fallback: used_fallback != 0,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
