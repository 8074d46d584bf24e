use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{StructuredFields, VerificationDetails};
use super::enums::{DocumentType, OutcomeStatus};

/// Summary event for one verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutcome {
    pub application_number: String,
    pub request_id: String,
    pub status: OutcomeStatus,
    pub completed_at: i64,
    pub customer_results: BTreeMap<String, Vec<ApplicantDocumentResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_details: Option<FailureDetails>,
}

impl AggregateOutcome {
    /// Outcome for a request that aborted before or outside the applicant loop.
    pub fn failed(application_id: &str, event_id: &str, error: impl Into<String>) -> Self {
        Self {
            application_number: application_id.to_string(),
            request_id: event_id.to_string(),
            status: OutcomeStatus::Failed,
            completed_at: Utc::now().timestamp_millis(),
            customer_results: BTreeMap::new(),
            verification_details: Some(FailureDetails { error: error.into() }),
        }
    }

    pub fn result_count(&self) -> usize {
        self.customer_results.values().map(Vec::len).sum()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.verification_details.as_ref().map(|d| d.error.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetails {
    pub error: String,
}

/// Verification result for one applicant document that passed cross-checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDocumentResult {
    pub document_id: Uuid,
    pub storage_ref: String,
    pub document_type: DocumentType,
    pub is_authentic: bool,
    pub is_complete: bool,
    pub confidence_score: f32,
    pub raw_text: String,
    pub extracted_data: StructuredFields,
    pub verification_details: VerificationDetails,
}

/// Published once per document whose extracted identifier does not match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorEvent {
    pub event_id: String,
    pub application_id: String,
    pub applicant_id: String,
    pub storage_ref: String,
    pub document_type: DocumentType,
    pub expected_document_id: Option<String>,
    pub extracted_document_id: Option<String>,
    pub error_message: String,
    pub timestamp: i64,
}

impl ValidationErrorEvent {
    pub fn identifier_mismatch(
        application_id: &str,
        applicant_id: &str,
        storage_ref: &str,
        document_type: DocumentType,
        expected: Option<String>,
        extracted: Option<String>,
    ) -> Self {
        let error_message = mismatch_message(expected.as_deref(), extracted.as_deref());
        Self {
            event_id: Uuid::new_v4().to_string(),
            application_id: application_id.to_string(),
            applicant_id: applicant_id.to_string(),
            storage_ref: storage_ref.to_string(),
            document_type,
            expected_document_id: expected,
            extracted_document_id: extracted,
            error_message,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

pub fn mismatch_message(expected: Option<&str>, extracted: Option<&str>) -> String {
    format!(
        "Document validation failed: expected {}, but extracted {}",
        expected.unwrap_or("<none>"),
        extracted.unwrap_or("<none>")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_has_no_results_and_carries_error() {
        let outcome = AggregateOutcome::failed("APP-1", "evt-1", "Unknown document type: PASSPORT");
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.result_count(), 0);
        assert_eq!(outcome.error_message(), Some("Unknown document type: PASSPORT"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["applicationNumber"], "APP-1");
        assert_eq!(json["requestId"], "evt-1");
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["verificationDetails"]["error"], "Unknown document type: PASSPORT");
        assert!(json["customerResults"].as_object().unwrap().is_empty());
    }

    #[test]
    fn error_event_serializes_wire_names() {
        let event = ValidationErrorEvent::identifier_mismatch(
            "APP-1",
            "cust-2",
            "store/b",
            DocumentType::Pan,
            Some("ABCDE1234F".into()),
            Some("ZZZZZ9999Z".into()),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["applicantId"], "cust-2");
        assert_eq!(json["documentType"], "PAN");
        assert_eq!(json["expectedDocumentId"], "ABCDE1234F");
        assert_eq!(json["extractedDocumentId"], "ZZZZZ9999Z");
        assert!(json["errorMessage"].as_str().unwrap().contains("ZZZZZ9999Z"));
    }

    #[test]
    fn mismatch_message_handles_missing_identifier() {
        let msg = mismatch_message(Some("ABC"), None);
        assert_eq!(msg, "Document validation failed: expected ABC, but extracted <none>");
    }
}
