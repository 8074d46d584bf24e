use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::format_timestamp;
use crate::db::DatabaseError;
use crate::models::{DocumentType, FieldValidation, ValidationOutcome};

/// Store the validation outcome for a document, replacing any earlier one.
pub fn upsert_validation(
    conn: &Connection,
    document_id: &Uuid,
    outcome: &ValidationOutcome,
) -> Result<(), DatabaseError> {
    let now = format_timestamp(&chrono::Utc::now().naive_utc());
    let validations = serde_json::to_string(&outcome.field_validations)?;
    conn.execute(
        "INSERT INTO validation_outcomes (document_id, document_type, is_authentic, is_complete,
         overall_score, field_validations, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT(document_id) DO UPDATE SET
            document_type = excluded.document_type,
            is_authentic = excluded.is_authentic,
            is_complete = excluded.is_complete,
            overall_score = excluded.overall_score,
            field_validations = excluded.field_validations,
            updated_at = excluded.updated_at",
        params![
            document_id.to_string(),
            outcome.document_type.as_str(),
            outcome.is_authentic as i32,
            outcome.is_complete as i32,
            outcome.overall_score,
            validations,
            now,
        ],
    )?;
    Ok(())
}

pub fn get_validation(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Option<ValidationOutcome>, DatabaseError> {
    let result = conn.query_row(
        "SELECT document_type, is_authentic, is_complete, overall_score, field_validations
         FROM validation_outcomes WHERE document_id = ?1",
        params![document_id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, i32>(2)?,
                row.get::<_, f32>(3)?,
                row.get::<_, String>(4)?,
            ))
        },
    );

    match result {
        Ok((doc_type, is_authentic, is_complete, overall_score, validations)) => {
            let field_validations: BTreeMap<String, FieldValidation> =
                serde_json::from_str(&validations)?;
            Ok(Some(ValidationOutcome {
                document_id: Some(*document_id),
                document_type: DocumentType::from_str(&doc_type)?,
                is_authentic: is_authentic != 0,
                is_complete: is_complete != 0,
                overall_score,
                field_validations,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
