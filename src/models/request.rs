use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Inbound verification request, one per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub event_id: String,
    pub application_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(alias = "applicantStorageIds")]
    pub applicant_documents: BTreeMap<String, DocumentDetail>,
}

/// What the caller expects to find for one applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(alias = "storageId")]
    pub storage_ref: String,
    pub document_type: String,
    #[serde(default, alias = "documentId")]
    pub expected_identifier: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_wire_format() {
        let body = r#"{
            "eventId": "evt-1",
            "applicationId": "APP-9",
            "timestamp": "2026-01-05T10:00:00Z",
            "applicantDocuments": {
                "cust-1": { "storageRef": "store/a", "documentType": "PAN", "expectedIdentifier": "ABCDE1234F" }
            }
        }"#;
        let req: VerificationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.event_id, "evt-1");
        assert_eq!(req.applicant_documents.len(), 1);
        let detail = &req.applicant_documents["cust-1"];
        assert_eq!(detail.storage_ref, "store/a");
        assert_eq!(detail.expected_identifier.as_deref(), Some("ABCDE1234F"));
    }

    #[test]
    fn accepts_legacy_field_names() {
        let body = r#"{
            "eventId": "evt-2",
            "applicationId": "APP-9",
            "applicantStorageIds": {
                "cust-1": { "storageId": "s1", "documentType": "AADHAR", "documentId": "1234 5678 9012" }
            }
        }"#;
        let req: VerificationRequest = serde_json::from_str(body).unwrap();
        let detail = &req.applicant_documents["cust-1"];
        assert_eq!(detail.storage_ref, "s1");
        assert_eq!(detail.expected_identifier.as_deref(), Some("1234 5678 9012"));
        assert!(req.timestamp.is_none());
    }

    #[test]
    fn missing_applicant_map_is_rejected() {
        let body = r#"{ "eventId": "e", "applicationId": "a" }"#;
        assert!(serde_json::from_str::<VerificationRequest>(body).is_err());
    }
}
