pub mod types;
pub mod confidence;
pub mod sanitize;
pub mod ocr;
pub mod vision;
pub mod extractor;

pub use types::*;
pub use confidence::*;
pub use sanitize::*;
pub use ocr::*;
pub use vision::*;
pub use extractor::*;

use thiserror::Error;

use crate::models::DocumentType;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Cannot reach OCR service at {0}")]
    OcrConnection(String),

    #[error("OCR service returned {status}: {body}")]
    OcrService { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Unreadable OCR response: {0}")]
    ResponseParsing(String),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("No extraction rules for document type {0}")]
    NoRuleSet(DocumentType),
}
