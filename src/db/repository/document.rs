use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::DocumentRecord;

const DOCUMENT_COLUMNS: &str = "id, applicant_id, document_type, storage_ref, file_name, byte_size,
     mime_type, status, created_at, updated_at";

/// Insert or replace the record for `(applicant_id, document_type)`.
///
/// On conflict the existing row keeps its id and `created_at`; every other
/// column takes the incoming value. Returns the row as stored.
pub fn upsert_document(
    conn: &Connection,
    doc: &DocumentRecord,
) -> Result<DocumentRecord, DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, applicant_id, document_type, storage_ref, file_name,
         byte_size, mime_type, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(applicant_id, document_type) DO UPDATE SET
            storage_ref = excluded.storage_ref,
            file_name = excluded.file_name,
            byte_size = excluded.byte_size,
            mime_type = excluded.mime_type,
            status = excluded.status,
            updated_at = excluded.updated_at",
        params![
            doc.id.to_string(),
            doc.applicant_id,
            doc.document_type.as_str(),
            doc.storage_ref,
            doc.file_name,
            doc.byte_size as i64,
            doc.mime_type,
            doc.status.as_str(),
            format_timestamp(&doc.created_at),
            format_timestamp(&doc.updated_at),
        ],
    )?;

    find_document(conn, &doc.applicant_id, doc.document_type)?.ok_or_else(|| {
        DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: format!("{}/{}", doc.applicant_id, doc.document_type),
        }
    })
}

pub fn find_document(
    conn: &Connection,
    applicant_id: &str,
    document_type: DocumentType,
) -> Result<Option<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents
         WHERE applicant_id = ?1 AND document_type = ?2"
    ))?;

    let result = stmt.query_row(params![applicant_id, document_type.as_str()], read_row);

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"))?;

    let result = stmt.query_row(params![id.to_string()], read_row);

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All documents registered for one applicant, ordered by document type.
pub fn list_documents_for_applicant(
    conn: &Connection,
    applicant_id: &str,
) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE applicant_id = ?1 ORDER BY document_type"
    ))?;

    let rows = stmt.query_map(params![applicant_id], read_row)?;

    let mut docs = Vec::new();
    for row in rows {
        docs.push(document_from_row(row?)?);
    }
    Ok(docs)
}

/// Update only the lifecycle status of a document.
pub fn update_document_status(
    conn: &Connection,
    document_id: &Uuid,
    status: DocumentStatus,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            document_id.to_string(),
            status.as_str(),
            format_timestamp(&chrono::Utc::now().naive_utc()),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: document_id.to_string(),
        });
    }
    Ok(())
}

pub fn update_document_size(
    conn: &Connection,
    document_id: &Uuid,
    byte_size: u64,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET byte_size = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            document_id.to_string(),
            byte_size as i64,
            format_timestamp(&chrono::Utc::now().naive_utc()),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: document_id.to_string(),
        });
    }
    Ok(())
}

/// Delete a document. Its extraction and validation rows go with it (CASCADE).
pub fn delete_document(conn: &Connection, document_id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM documents WHERE id = ?1",
        params![document_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: document_id.to_string(),
        });
    }
    tracing::info!(document_id = %document_id, "Document deleted with extraction and validation rows");
    Ok(())
}

struct DocumentRow {
    id: String,
    applicant_id: String,
    document_type: String,
    storage_ref: String,
    file_name: String,
    byte_size: i64,
    mime_type: String,
    status: String,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        applicant_id: row.get(1)?,
        document_type: row.get(2)?,
        storage_ref: row.get(3)?,
        file_name: row.get(4)?,
        byte_size: row.get(5)?,
        mime_type: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn document_from_row(row: DocumentRow) -> Result<DocumentRecord, DatabaseError> {
    Ok(DocumentRecord {
        id: parse_uuid(&row.id)?,
        applicant_id: row.applicant_id,
        document_type: DocumentType::from_str(&row.document_type)?,
        storage_ref: row.storage_ref,
        file_name: row.file_name,
        byte_size: row.byte_size.max(0) as u64,
        mime_type: row.mime_type,
        status: DocumentStatus::from_str(&row.status)?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
