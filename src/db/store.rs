//! Thread-safe persistence facade used by the pipeline.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use super::{repository, sqlite, DatabaseError};
use crate::audit::{AuditError, AuditLogger};
use crate::models::{
    AuditAction, AuditEntry, DocumentRecord, DocumentStatus, DocumentType, ExtractionResult,
    ValidationOutcome,
};

/// Document persistence as the pipeline sees it.
///
/// Each call commits on its own; there is no transaction spanning a
/// pipeline step.
pub trait DocumentStore: Send + Sync {
    fn find_by_applicant_and_type(
        &self,
        applicant_id: &str,
        document_type: DocumentType,
    ) -> Result<Option<DocumentRecord>, DatabaseError>;

    /// Insert or update keyed by `(applicant_id, document_type)`.
    fn upsert_document(&self, doc: &DocumentRecord) -> Result<DocumentRecord, DatabaseError>;

    fn set_status(&self, document_id: &Uuid, status: DocumentStatus) -> Result<(), DatabaseError>;

    fn set_byte_size(&self, document_id: &Uuid, byte_size: u64) -> Result<(), DatabaseError>;

    fn upsert_extraction(
        &self,
        document_id: &Uuid,
        extraction: &ExtractionResult,
    ) -> Result<(), DatabaseError>;

    fn upsert_validation(
        &self,
        document_id: &Uuid,
        outcome: &ValidationOutcome,
    ) -> Result<(), DatabaseError>;

    fn get_extraction(&self, document_id: &Uuid) -> Result<Option<ExtractionResult>, DatabaseError>;

    fn get_validation(&self, document_id: &Uuid) -> Result<Option<ValidationOutcome>, DatabaseError>;

    fn list_documents(&self, applicant_id: &str) -> Result<Vec<DocumentRecord>, DatabaseError>;

    fn delete_document(&self, document_id: &Uuid) -> Result<(), DatabaseError>;
}

/// SQLite-backed store. Access to the single connection is serialized.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(sqlite::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(sqlite::open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Audit entries for one application, oldest first.
    pub fn list_audit(&self, application_id: &str) -> Result<Vec<AuditEntry>, DatabaseError> {
        let conn = self.conn()?;
        repository::list_audit_entries(&conn, application_id)
    }
}

impl DocumentStore for SqliteStore {
    fn find_by_applicant_and_type(
        &self,
        applicant_id: &str,
        document_type: DocumentType,
    ) -> Result<Option<DocumentRecord>, DatabaseError> {
        let conn = self.conn()?;
        repository::find_document(&conn, applicant_id, document_type)
    }

    fn upsert_document(&self, doc: &DocumentRecord) -> Result<DocumentRecord, DatabaseError> {
        let conn = self.conn()?;
        repository::upsert_document(&conn, doc)
    }

    fn set_status(&self, document_id: &Uuid, status: DocumentStatus) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::update_document_status(&conn, document_id, status)
    }

    fn set_byte_size(&self, document_id: &Uuid, byte_size: u64) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::update_document_size(&conn, document_id, byte_size)
    }

    fn upsert_extraction(
        &self,
        document_id: &Uuid,
        extraction: &ExtractionResult,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::upsert_extraction(&conn, document_id, extraction)
    }

    fn upsert_validation(
        &self,
        document_id: &Uuid,
        outcome: &ValidationOutcome,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::upsert_validation(&conn, document_id, outcome)
    }

    fn get_extraction(&self, document_id: &Uuid) -> Result<Option<ExtractionResult>, DatabaseError> {
        let conn = self.conn()?;
        repository::get_extraction(&conn, document_id)
    }

    fn get_validation(&self, document_id: &Uuid) -> Result<Option<ValidationOutcome>, DatabaseError> {
        let conn = self.conn()?;
        repository::get_validation(&conn, document_id)
    }

    fn list_documents(&self, applicant_id: &str) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let conn = self.conn()?;
        repository::list_documents_for_applicant(&conn, applicant_id)
    }

    fn delete_document(&self, document_id: &Uuid) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::delete_document(&conn, document_id)
    }
}

impl AuditLogger for SqliteStore {
    fn record(
        &self,
        action: AuditAction,
        details: serde_json::Value,
        application_id: &str,
        event_id: &str,
    ) -> Result<(), AuditError> {
        let conn = self.conn()?;
        repository::insert_audit_entry(&conn, action, &details, application_id, event_id)?;
        Ok(())
    }
}
