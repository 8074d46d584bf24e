//! Document intake: registering uploaded files and removing them.
//!
//! An upload lands at `<storage_ref>/<TYPE>_<file name>` and replaces any
//! earlier upload of the same type under that reference. The record is left
//! UPLOADED until a verification request picks it up.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::audit::{record_quietly, AuditLogger};
use crate::db::{DatabaseError, DocumentStore};
use crate::models::{AuditAction, DocumentRecord, DocumentStatus, DocumentType};
use crate::storage::{object_key, DocumentStorage, StorageError};

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024; // 10MB
const MAX_FILE_NAME_LEN: usize = 255;
const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];
const ALLOWED_MIME_TYPES: [&str; 3] = ["application/pdf", "image/jpeg", "image/png"];

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedMimeType(String),

    #[error("Invalid upload: {0}")]
    InvalidRequest(String),

    #[error("No {document_type} document for applicant {applicant_id}")]
    NotFound {
        applicant_id: String,
        document_type: DocumentType,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// A file submitted for one applicant's document slot.
#[derive(Debug, Clone)]
pub struct Upload<'a> {
    pub application_id: &'a str,
    pub applicant_id: &'a str,
    pub document_type: DocumentType,
    pub storage_ref: &'a str,
    pub file_name: &'a str,
    /// Content type declared by the client, if any.
    pub mime_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

/// Validate an upload, store its bytes and mark the record UPLOADED.
pub fn register_upload(
    store: &dyn DocumentStore,
    storage: &dyn DocumentStorage,
    audit: &dyn AuditLogger,
    upload: &Upload<'_>,
) -> Result<DocumentRecord, UploadError> {
    if upload.applicant_id.trim().is_empty() {
        return Err(UploadError::InvalidRequest("applicant id is blank".into()));
    }
    if upload.storage_ref.trim().is_empty() {
        return Err(UploadError::InvalidRequest("storage reference is blank".into()));
    }
    check_size(upload.bytes.len() as u64)?;
    check_file_name(upload.file_name)?;
    let mime_type = resolve_mime_type(upload.file_name, upload.mime_type)?;

    // the previous upload stays in place until the new one is stored and recorded
    let type_prefix = format!("{}_", upload.document_type);
    let stored_name = format!("{type_prefix}{}", upload.file_name);
    storage.put(&object_key(upload.storage_ref, &stored_name), upload.bytes)?;

    let now = Utc::now().naive_utc();
    let mut record = store
        .find_by_applicant_and_type(upload.applicant_id, upload.document_type)?
        .unwrap_or_else(|| DocumentRecord {
            id: Uuid::new_v4(),
            applicant_id: upload.applicant_id.to_string(),
            document_type: upload.document_type,
            storage_ref: String::new(),
            file_name: String::new(),
            byte_size: 0,
            mime_type: String::new(),
            status: DocumentStatus::Uploaded,
            created_at: now,
            updated_at: now,
        });
    record.storage_ref = upload.storage_ref.to_string();
    record.file_name = stored_name;
    record.byte_size = upload.bytes.len() as u64;
    record.mime_type = mime_type;
    record.status = DocumentStatus::Uploaded;
    record.updated_at = now;
    let record = store.upsert_document(&record)?;

    for stale in storage.list(upload.storage_ref)? {
        if stale.starts_with(&type_prefix) && stale != record.file_name {
            storage.delete(&object_key(upload.storage_ref, &stale))?;
        }
    }

    tracing::info!(
        document_id = %record.id,
        applicant_id = upload.applicant_id,
        document_type = %upload.document_type,
        size = record.byte_size,
        "Document uploaded"
    );
    record_quietly(
        audit,
        AuditAction::DocumentUploaded,
        json!({
            "documentId": record.id,
            "applicantId": record.applicant_id,
            "documentType": record.document_type,
            "fileName": record.file_name,
            "size": record.byte_size,
        }),
        upload.application_id,
        "",
    );

    Ok(record)
}

/// Delete an applicant's document of one type, bytes first.
pub fn remove_document(
    store: &dyn DocumentStore,
    storage: &dyn DocumentStorage,
    audit: &dyn AuditLogger,
    application_id: &str,
    applicant_id: &str,
    document_type: DocumentType,
) -> Result<DocumentRecord, UploadError> {
    let record = store
        .find_by_applicant_and_type(applicant_id, document_type)?
        .ok_or_else(|| UploadError::NotFound {
            applicant_id: applicant_id.to_string(),
            document_type,
        })?;

    storage.delete(&object_key(&record.storage_ref, &record.file_name))?;
    store.delete_document(&record.id)?;

    record_quietly(
        audit,
        AuditAction::DocumentDeleted,
        json!({
            "documentId": record.id,
            "applicantId": applicant_id,
            "documentType": document_type,
        }),
        application_id,
        "",
    );

    Ok(record)
}

fn check_size(size: u64) -> Result<(), UploadError> {
    if size == 0 {
        return Err(UploadError::EmptyFile);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::FileTooLarge {
            size_mb: size as f64 / (1024.0 * 1024.0),
            max_mb: MAX_UPLOAD_BYTES / (1024 * 1024),
        });
    }
    Ok(())
}

fn check_file_name(name: &str) -> Result<(), UploadError> {
    let invalid = |reason: &str| Err(UploadError::InvalidFileName(format!("{name:?}: {reason}")));

    if name.trim().is_empty() {
        return invalid("empty");
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return invalid("too long");
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return invalid("path components are not allowed");
    }
    if name
        .chars()
        .any(|c| c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*'))
    {
        return invalid("reserved characters");
    }

    let extension = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadError::UnsupportedFormat(name.to_string()));
    }
    Ok(())
}

/// The declared type wins when present; otherwise guess from the extension.
fn resolve_mime_type(file_name: &str, declared: Option<&str>) -> Result<String, UploadError> {
    let mime = match declared.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => m.to_ascii_lowercase(),
        None => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };
    if ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        Ok(mime)
    } else {
        Err(UploadError::UnsupportedMimeType(mime))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::db::SqliteStore;
    use crate::models::{DocumentDetail, OutcomeStatus, VerificationRequest};
    use crate::pipeline::extraction::OcrExtractor;
    use crate::pipeline::orchestrator::VerificationPipeline;
    use crate::publish::MemoryPublisher;
    use crate::storage::{LocalFileStorage, MemoryStorage};

    fn upload<'a>(file_name: &'a str, bytes: &'a [u8]) -> Upload<'a> {
        Upload {
            application_id: "APP-1",
            applicant_id: "cust-1",
            document_type: DocumentType::Pan,
            storage_ref: "store/a",
            file_name,
            mime_type: None,
            bytes,
        }
    }

    #[test]
    fn upload_stores_bytes_and_marks_uploaded() {
        let store = SqliteStore::open_in_memory().unwrap();
        let storage = MemoryStorage::new();
        let audit = MemoryAuditLog::new();

        let record = register_upload(&store, &storage, &audit, &upload("card.png", b"png-bytes")).unwrap();

        assert_eq!(record.status, DocumentStatus::Uploaded);
        assert_eq!(record.file_name, "PAN_card.png");
        assert_eq!(record.mime_type, "image/png");
        assert_eq!(record.byte_size, 9);
        assert!(storage.contains("store/a/PAN_card.png"));
        assert_eq!(audit.actions(), vec![AuditAction::DocumentUploaded]);
    }

    #[test]
    fn reupload_replaces_previous_file_of_same_type() {
        let store = SqliteStore::open_in_memory().unwrap();
        let storage = MemoryStorage::new().with_object("store/a/AADHAAR_front.jpg", b"keep");
        let audit = MemoryAuditLog::new();

        let first = register_upload(&store, &storage, &audit, &upload("old.jpg", b"1")).unwrap();
        let second = register_upload(&store, &storage, &audit, &upload("new.pdf", b"22")).unwrap();

        assert_eq!(first.id, second.id);
        assert!(!storage.contains("store/a/PAN_old.jpg"));
        assert!(storage.contains("store/a/PAN_new.pdf"));
        assert!(storage.contains("store/a/AADHAAR_front.jpg"));
        assert_eq!(second.mime_type, "application/pdf");
        assert_eq!(store.list_documents("cust-1").unwrap().len(), 1);
    }

    /// Accepts reads and deletes but refuses every write.
    struct ReadOnlyStorage(MemoryStorage);

    impl DocumentStorage for ReadOnlyStorage {
        fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.0.get(key)
        }

        fn put(&self, _key: &str, _bytes: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only volume",
            )))
        }

        fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.0.delete(key)
        }

        fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            self.0.list(prefix)
        }
    }

    #[test]
    fn failed_write_keeps_previous_upload() {
        let store = SqliteStore::open_in_memory().unwrap();
        let audit = MemoryAuditLog::new();
        let writable = MemoryStorage::new();
        let first = register_upload(&store, &writable, &audit, &upload("old.jpg", b"old")).unwrap();

        let read_only = ReadOnlyStorage(writable);
        let err = register_upload(&store, &read_only, &audit, &upload("new.png", b"new")).unwrap_err();

        assert!(matches!(err, UploadError::Storage(StorageError::Io(_))));
        assert_eq!(read_only.get("store/a/PAN_old.jpg").unwrap(), b"old");
        let current = store
            .find_by_applicant_and_type("cust-1", DocumentType::Pan)
            .unwrap()
            .unwrap();
        assert_eq!(current.id, first.id);
        assert_eq!(current.file_name, "PAN_old.jpg");
        assert_eq!(audit.count(AuditAction::DocumentUploaded), 1);
    }

    #[test]
    fn reupload_under_same_name_keeps_the_new_bytes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let storage = MemoryStorage::new();
        let audit = MemoryAuditLog::new();
        register_upload(&store, &storage, &audit, &upload("card.png", b"v1")).unwrap();
        register_upload(&store, &storage, &audit, &upload("card.png", b"v2")).unwrap();

        assert_eq!(storage.get("store/a/PAN_card.png").unwrap(), b"v2");
    }

    #[test]
    fn rejects_bad_files() {
        let store = SqliteStore::open_in_memory().unwrap();
        let storage = MemoryStorage::new();
        let audit = MemoryAuditLog::new();
        let check = |u: Upload<'_>| register_upload(&store, &storage, &audit, &u).unwrap_err();

        assert!(matches!(check(upload("a.png", b"")), UploadError::EmptyFile));
        assert!(matches!(check(upload("../a.png", b"x")), UploadError::InvalidFileName(_)));
        assert!(matches!(check(upload("a?.png", b"x")), UploadError::InvalidFileName(_)));
        assert!(matches!(check(upload("", b"x")), UploadError::InvalidFileName(_)));
        assert!(matches!(check(upload("a.gif", b"x")), UploadError::UnsupportedFormat(_)));
        assert!(matches!(check(upload("noext", b"x")), UploadError::UnsupportedFormat(_)));

        let long = format!("{}.png", "a".repeat(260));
        assert!(matches!(check(upload(&long, b"x")), UploadError::InvalidFileName(_)));

        let mut declared = upload("a.png", b"x");
        declared.mime_type = Some("text/html");
        assert!(matches!(check(declared), UploadError::UnsupportedMimeType(_)));

        let mut blank = upload("a.png", b"x");
        blank.storage_ref = " ";
        assert!(matches!(check(blank), UploadError::InvalidRequest(_)));

        assert!(audit.entries().is_empty());
        assert!(store.list_documents("cust-1").unwrap().is_empty());
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert!(check_size(MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            check_size(MAX_UPLOAD_BYTES + 1),
            Err(UploadError::FileTooLarge { max_mb: 10, .. })
        ));
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(check_file_name("SCAN.JPEG").is_ok());
        assert_eq!(resolve_mime_type("SCAN.JPEG", None).unwrap(), "image/jpeg");
        assert_eq!(resolve_mime_type("a.pdf", Some(" Application/PDF ")).unwrap(), "application/pdf");
    }

    #[test]
    fn remove_deletes_bytes_and_record() {
        let store = SqliteStore::open_in_memory().unwrap();
        let storage = MemoryStorage::new();
        let audit = MemoryAuditLog::new();
        register_upload(&store, &storage, &audit, &upload("card.png", b"png")).unwrap();

        let removed = remove_document(&store, &storage, &audit, "APP-1", "cust-1", DocumentType::Pan).unwrap();

        assert_eq!(removed.file_name, "PAN_card.png");
        assert!(!storage.contains("store/a/PAN_card.png"));
        assert!(store.list_documents("cust-1").unwrap().is_empty());
        assert_eq!(audit.count(AuditAction::DocumentDeleted), 1);

        let again = remove_document(&store, &storage, &audit, "APP-1", "cust-1", DocumentType::Pan);
        assert!(matches!(again, Err(UploadError::NotFound { .. })));
    }

    #[test]
    fn uploaded_document_is_picked_up_by_verification() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let storage = Arc::new(LocalFileStorage::new(dir.path()).unwrap());
        let audit = Arc::new(MemoryAuditLog::new());

        let uploaded =
            register_upload(store.as_ref(), storage.as_ref(), audit.as_ref(), &upload("card.png", b"png-bytes"))
                .unwrap();
        assert!(dir.path().join("store/a/PAN_card.png").is_file());

        let pipeline = VerificationPipeline::new(
            store.clone(),
            storage,
            OcrExtractor::unavailable(),
            Arc::new(MemoryPublisher::new()),
            audit,
        );
        let request = VerificationRequest {
            event_id: "evt-1".into(),
            application_id: "APP-1".into(),
            timestamp: None,
            applicant_documents: [(
                "cust-1".to_string(),
                DocumentDetail {
                    storage_ref: "store/a".into(),
                    document_type: "PAN".into(),
                    expected_identifier: Some("ABCDE1234F".into()),
                },
            )]
            .into_iter()
            .collect(),
        };

        let outcome = pipeline.run(&request);

        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.customer_results["cust-1"][0].document_id, uploaded.id);
        let doc = store.find_by_applicant_and_type("cust-1", DocumentType::Pan).unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(doc.file_name, "PAN_card.png");
    }
}
