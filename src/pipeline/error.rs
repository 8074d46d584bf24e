use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::{mismatch_message, DocumentType};
use crate::pipeline::extraction::ExtractionError;
use crate::storage::StorageError;

/// Request-level failure. Aborts the whole request with a FAILED outcome.
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Malformed verification request: {0}")]
    MalformedMessage(String),

    #[error("Request is missing {0}")]
    MissingField(&'static str),

    #[error("Request contains no applicant documents")]
    NoApplicants,

    #[error("Request contains a blank applicant id")]
    BlankApplicantId,

    #[error("Applicant {applicant_id} has no storage reference")]
    BlankStorageRef { applicant_id: String },

    #[error("Unknown document type for applicant {applicant_id}: {value}")]
    UnknownDocumentType { applicant_id: String, value: String },

    #[error("No rules configured for document type {0}")]
    NoRuleSet(DocumentType),
}

/// Step failure while processing one applicant's document.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Why one applicant's document did not produce a result.
/// Isolated: other applicants in the same request are unaffected.
#[derive(Error, Debug)]
pub enum ApplicantFailure {
    #[error("{}", mismatch(.expected, .extracted))]
    IdentifierMismatch {
        expected: Option<String>,
        extracted: Option<String>,
    },

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

fn mismatch(expected: &Option<String>, extracted: &Option<String>) -> String {
    mismatch_message(expected.as_deref(), extracted.as_deref())
}

impl From<StorageError> for ApplicantFailure {
    fn from(e: StorageError) -> Self {
        Self::Processing(e.into())
    }
}

impl From<ExtractionError> for ApplicantFailure {
    fn from(e: ExtractionError) -> Self {
        Self::Processing(e.into())
    }
}

impl From<DatabaseError> for ApplicantFailure {
    fn from(e: DatabaseError) -> Self {
        Self::Processing(e.into())
    }
}
