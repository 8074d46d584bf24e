use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentStatus, DocumentType};

/// Clamp a confidence or score into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// A registered document, unique per (applicant, document type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub applicant_id: String,
    pub document_type: DocumentType,
    pub storage_ref: String,
    pub file_name: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub status: DocumentStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One extracted field value with the confidence of the rule that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    pub confidence: f32,
}

impl FieldValue {
    pub fn new(value: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: value.into(),
            confidence: clamp_unit(confidence),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// Field name → extracted value. Ordered so serialized output is stable.
pub type StructuredFields = BTreeMap<String, FieldValue>;

/// OCR output for a document. One per `DocumentRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: Option<Uuid>,
    pub raw_text: String,
    pub structured_fields: StructuredFields,
    pub overall_confidence: f32,
    pub processing_time_ms: u64,
    /// True when the OCR capability was unavailable and mock text was used.
    pub used_fallback: bool,
}

/// Per-field validation detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub value: String,
    pub confidence: f32,
    pub format_valid: bool,
    pub required: bool,
    pub valid: bool,
}

/// Validation verdict for a document. One per `DocumentRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub document_id: Option<Uuid>,
    pub document_type: DocumentType,
    pub is_authentic: bool,
    pub is_complete: bool,
    pub overall_score: f32,
    pub field_validations: BTreeMap<String, FieldValidation>,
}

impl ValidationOutcome {
    pub fn details(&self) -> VerificationDetails {
        VerificationDetails {
            document_type: self.document_type,
            field_validations: self.field_validations.clone(),
        }
    }
}

/// Published form of a validation outcome's per-field detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationDetails {
    pub document_type: DocumentType,
    pub field_validations: BTreeMap<String, FieldValidation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_unit_bounds_values() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert!((clamp_unit(0.42) - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn field_value_clamps_confidence() {
        let field = FieldValue::new("ABCDE1234F", 1.3);
        assert_eq!(field.confidence, 1.0);
    }

    #[test]
    fn field_value_serializes_as_value_confidence_pair() {
        let json = serde_json::to_value(FieldValue::new("John Doe", 0.85)).unwrap();
        assert_eq!(json["value"], "John Doe");
        assert!((json["confidence"].as_f64().unwrap() - 0.85).abs() < 1e-6);
    }

    #[test]
    fn blank_detection_ignores_whitespace() {
        assert!(FieldValue::new("   ", 0.9).is_blank());
        assert!(!FieldValue::new(" x ", 0.9).is_blank());
    }
}
