//! Verification request orchestrator.
//!
//! Drives one request through resolve → extract → validate → cross-check for
//! each applicant, folds the per-applicant results into one aggregate
//! outcome and publishes it. Collaborators are injected as trait objects so
//! the pipeline runs unchanged against SQLite and local files or against
//! in-memory test doubles.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::audit::{record_quietly, AuditLogger};
use crate::db::DocumentStore;
use crate::models::{
    AggregateOutcome, ApplicantDocumentResult, AuditAction, DocumentDetail, DocumentRecord,
    DocumentStatus, DocumentType, ExtractionResult, OutcomeStatus,
    ValidationErrorEvent, ValidationOutcome, VerificationRequest,
};
use crate::pipeline::error::{ApplicantFailure, ProcessingError, VerificationError};
use crate::pipeline::extraction::OcrExtractor;
use crate::pipeline::identifier::{extract_canonical_id, identifiers_match};
use crate::pipeline::rules::{self, RuleSet};
use crate::pipeline::validation::validate;
use crate::publish::ResultPublisher;
use crate::storage::{object_key, DocumentStorage};

/// One applicant's entry after request-level checks.
struct PlannedDocument<'a> {
    applicant_id: &'a str,
    detail: &'a DocumentDetail,
    document_type: DocumentType,
    rules: &'static RuleSet,
}

pub struct VerificationPipeline {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn DocumentStorage>,
    extractor: OcrExtractor,
    publisher: Arc<dyn ResultPublisher>,
    audit: Arc<dyn AuditLogger>,
}

impl VerificationPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn DocumentStorage>,
        extractor: OcrExtractor,
        publisher: Arc<dyn ResultPublisher>,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            store,
            storage,
            extractor,
            publisher,
            audit,
        }
    }

    /// Parse a raw message body and run it.
    ///
    /// A body that does not deserialize is a fatal request error; the event
    /// and application ids are salvaged from the JSON when present so the
    /// FAILED outcome can still be correlated.
    pub fn handle_message(&self, body: &[u8]) -> AggregateOutcome {
        match serde_json::from_slice::<VerificationRequest>(body) {
            Ok(request) => self.run(&request),
            Err(e) => {
                let (application_id, event_id) = salvage_ids(body);
                tracing::error!(
                    application_id = %application_id,
                    event_id = %event_id,
                    error = %e,
                    "Unreadable verification request"
                );
                self.fail(
                    &application_id,
                    &event_id,
                    VerificationError::MalformedMessage(e.to_string()),
                )
            }
        }
    }

    /// Run one verification request to completion and publish its outcome.
    pub fn run(&self, request: &VerificationRequest) -> AggregateOutcome {
        let application_id = request.application_id.as_str();
        let event_id = request.event_id.as_str();

        tracing::info!(
            application_id,
            event_id,
            applicants = request.applicant_documents.len(),
            "Received verification request"
        );
        record_quietly(
            self.audit.as_ref(),
            AuditAction::RequestReceived,
            json!({
                "applicants": request.applicant_documents.len(),
                "timestamp": request.timestamp,
            }),
            application_id,
            event_id,
        );

        let plan = match plan_request(request) {
            Ok(plan) => plan,
            Err(e) => return self.fail(application_id, event_id, e),
        };

        let mut customer_results: BTreeMap<String, Vec<ApplicantDocumentResult>> = BTreeMap::new();
        let mut failures = 0usize;

        for item in &plan {
            match self.process_applicant(request, item) {
                Ok(result) => {
                    customer_results
                        .entry(item.applicant_id.to_string())
                        .or_default()
                        .push(result);
                }
                Err(failure) => {
                    failures += 1;
                    self.report_failure(request, item, failure);
                }
            }
        }

        let successes = plan.len() - failures;
        let status = aggregate_status(failures);
        let outcome = AggregateOutcome {
            application_number: application_id.to_string(),
            request_id: event_id.to_string(),
            status,
            completed_at: Utc::now().timestamp_millis(),
            customer_results,
            verification_details: None,
        };

        tracing::info!(
            application_id,
            event_id,
            status = %status,
            successes,
            failures,
            "Verification request complete"
        );

        self.publish(&outcome);
        outcome
    }

    /// Fatal path: audit, publish a FAILED outcome without results.
    fn fail(&self, application_id: &str, event_id: &str, error: VerificationError) -> AggregateOutcome {
        tracing::error!(application_id, event_id, error = %error, "Verification request failed");
        record_quietly(
            self.audit.as_ref(),
            AuditAction::RequestFailed,
            json!({ "error": error.to_string() }),
            application_id,
            event_id,
        );
        let outcome = AggregateOutcome::failed(application_id, event_id, error.to_string());
        self.publish(&outcome);
        outcome
    }

    fn publish(&self, outcome: &AggregateOutcome) {
        match self.publisher.publish_outcome(outcome) {
            Ok(()) => record_quietly(
                self.audit.as_ref(),
                AuditAction::OutcomePublished,
                json!({
                    "status": outcome.status,
                    "results": outcome.result_count(),
                }),
                &outcome.application_number,
                &outcome.request_id,
            ),
            Err(e) => tracing::error!(
                application_id = %outcome.application_number,
                event_id = %outcome.request_id,
                error = %e,
                "Failed to publish verification outcome"
            ),
        }
    }

    fn report_failure(&self, request: &VerificationRequest, item: &PlannedDocument<'_>, failure: ApplicantFailure) {
        let application_id = request.application_id.as_str();
        let event_id = request.event_id.as_str();

        match failure {
            ApplicantFailure::IdentifierMismatch { expected, extracted } => {
                tracing::warn!(
                    application_id,
                    applicant_id = item.applicant_id,
                    document_type = %item.document_type,
                    "Identifier mismatch"
                );
                let event = ValidationErrorEvent::identifier_mismatch(
                    application_id,
                    item.applicant_id,
                    &item.detail.storage_ref,
                    item.document_type,
                    expected,
                    extracted,
                );
                if let Err(e) = self.publisher.publish_validation_error(&event) {
                    tracing::error!(
                        application_id,
                        applicant_id = item.applicant_id,
                        error = %e,
                        "Failed to publish validation error"
                    );
                }
                record_quietly(
                    self.audit.as_ref(),
                    AuditAction::ValidationFailed,
                    json!({
                        "applicantId": item.applicant_id,
                        "storageRef": item.detail.storage_ref,
                        "documentType": item.document_type,
                        "error": event.error_message,
                    }),
                    application_id,
                    event_id,
                );
            }
            ApplicantFailure::Processing(e) => {
                tracing::error!(
                    application_id,
                    applicant_id = item.applicant_id,
                    document_type = %item.document_type,
                    error = %e,
                    "Document processing failed"
                );
                record_quietly(
                    self.audit.as_ref(),
                    AuditAction::ProcessingError,
                    json!({
                        "applicantId": item.applicant_id,
                        "storageRef": item.detail.storage_ref,
                        "documentType": item.document_type,
                        "error": e.to_string(),
                    }),
                    application_id,
                    event_id,
                );
            }
        }
    }

    fn process_applicant(
        &self,
        request: &VerificationRequest,
        item: &PlannedDocument<'_>,
    ) -> Result<ApplicantDocumentResult, ApplicantFailure> {
        let record = self.resolve_document(request, item)?;

        let extraction = match self.extract_document(&record, item) {
            Ok(extraction) => extraction,
            Err(e) => {
                self.mark_failed(&record);
                return Err(e.into());
            }
        };

        let validation = match self.persist_and_validate(&record, item, &extraction) {
            Ok(validation) => validation,
            Err(e) => {
                self.mark_failed(&record);
                return Err(e.into());
            }
        };

        let expected = item
            .detail
            .expected_identifier
            .clone()
            .filter(|id| !id.trim().is_empty());
        let extracted = extract_canonical_id(&extraction.structured_fields, item.rules);
        if !identifiers_match(expected.as_deref(), extracted.as_deref()) {
            return Err(ApplicantFailure::IdentifierMismatch { expected, extracted });
        }

        record_quietly(
            self.audit.as_ref(),
            AuditAction::DocumentProcessed,
            json!({
                "documentId": record.id,
                "applicantId": item.applicant_id,
                "documentType": item.document_type,
                "score": validation.overall_score,
            }),
            &request.application_id,
            &request.event_id,
        );

        Ok(ApplicantDocumentResult {
            document_id: record.id,
            storage_ref: record.storage_ref.clone(),
            document_type: item.document_type,
            is_authentic: validation.is_authentic,
            is_complete: validation.is_complete,
            confidence_score: validation.overall_score,
            raw_text: extraction.raw_text,
            extracted_data: extraction.structured_fields,
            verification_details: validation.details(),
        })
    }

    /// Find or create the record for `(applicant, type)` and point it at
    /// this request's storage reference.
    fn resolve_document(
        &self,
        request: &VerificationRequest,
        item: &PlannedDocument<'_>,
    ) -> Result<DocumentRecord, ProcessingError> {
        let existing = self
            .store
            .find_by_applicant_and_type(item.applicant_id, item.document_type)?;
        let created = existing.is_none();
        let now = Utc::now().naive_utc();

        let mut record = existing.unwrap_or_else(|| placeholder_record(item, now));
        record.storage_ref = item.detail.storage_ref.clone();
        record.status = DocumentStatus::Pending;
        record.updated_at = now;
        let record = self.store.upsert_document(&record)?;

        let details = json!({
            "documentId": record.id,
            "applicantId": item.applicant_id,
            "storageRef": record.storage_ref,
            "documentType": item.document_type,
        });
        if created {
            tracing::info!(
                document_id = %record.id,
                applicant_id = item.applicant_id,
                document_type = %item.document_type,
                "Created document for processing"
            );
            record_quietly(
                self.audit.as_ref(),
                AuditAction::DocumentCreated,
                details.clone(),
                &request.application_id,
                &request.event_id,
            );
        }
        record_quietly(
            self.audit.as_ref(),
            AuditAction::DocumentFound,
            details,
            &request.application_id,
            &request.event_id,
        );

        Ok(record)
    }

    fn extract_document(
        &self,
        record: &DocumentRecord,
        item: &PlannedDocument<'_>,
    ) -> Result<ExtractionResult, ProcessingError> {
        self.store.set_status(&record.id, DocumentStatus::Processing)?;

        let key = object_key(&record.storage_ref, &record.file_name);
        let bytes = self.storage.get(&key)?;
        self.store.set_byte_size(&record.id, bytes.len() as u64)?;

        Ok(self.extractor.extract_with_rules(&bytes, item.rules)?)
    }

    fn persist_and_validate(
        &self,
        record: &DocumentRecord,
        item: &PlannedDocument<'_>,
        extraction: &ExtractionResult,
    ) -> Result<ValidationOutcome, ProcessingError> {
        self.store.upsert_extraction(&record.id, extraction)?;
        self.store.set_status(&record.id, DocumentStatus::Completed)?;

        let validation = validate(item.rules, &extraction.structured_fields);
        self.store.upsert_validation(&record.id, &validation)?;
        Ok(validation)
    }

    fn mark_failed(&self, record: &DocumentRecord) {
        if let Err(e) = self.store.set_status(&record.id, DocumentStatus::Failed) {
            tracing::warn!(document_id = %record.id, error = %e, "Failed to mark document FAILED");
        }
    }
}

/// Request-level checks. Every applicant's type must resolve to a rule set
/// before any document is touched.
fn plan_request(request: &VerificationRequest) -> Result<Vec<PlannedDocument<'_>>, VerificationError> {
    if request.event_id.trim().is_empty() {
        return Err(VerificationError::MissingField("eventId"));
    }
    if request.application_id.trim().is_empty() {
        return Err(VerificationError::MissingField("applicationId"));
    }
    if request.applicant_documents.is_empty() {
        return Err(VerificationError::NoApplicants);
    }

    request
        .applicant_documents
        .iter()
        .map(|(applicant_id, detail)| {
            if applicant_id.trim().is_empty() {
                return Err(VerificationError::BlankApplicantId);
            }
            if detail.storage_ref.trim().is_empty() {
                return Err(VerificationError::BlankStorageRef {
                    applicant_id: applicant_id.clone(),
                });
            }
            let document_type = DocumentType::from_str(&detail.document_type).map_err(|_| {
                VerificationError::UnknownDocumentType {
                    applicant_id: applicant_id.clone(),
                    value: detail.document_type.clone(),
                }
            })?;
            let rules = rules::rules_for(document_type)
                .ok_or(VerificationError::NoRuleSet(document_type))?;
            Ok(PlannedDocument {
                applicant_id,
                detail,
                document_type,
                rules,
            })
        })
        .collect()
}

/// COMPLETED when nothing failed, PARTIAL_SUCCESS as soon as any applicant
/// failed. FAILED is reserved for requests aborted before the applicant loop.
pub fn aggregate_status(failures: usize) -> OutcomeStatus {
    if failures == 0 {
        OutcomeStatus::Completed
    } else {
        OutcomeStatus::PartialSuccess
    }
}

fn placeholder_record(item: &PlannedDocument<'_>, now: chrono::NaiveDateTime) -> DocumentRecord {
    let file_name = format!("{}_document.jpg", item.document_type);
    let mime_type = mime_guess::from_path(&file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    DocumentRecord {
        id: uuid::Uuid::new_v4(),
        applicant_id: item.applicant_id.to_string(),
        document_type: item.document_type,
        storage_ref: item.detail.storage_ref.clone(),
        file_name,
        byte_size: 0,
        mime_type,
        status: DocumentStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

fn salvage_ids(body: &[u8]) -> (String, String) {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| value.get(*n).and_then(|v| v.as_str()))
            .unwrap_or_default()
            .to_string()
    };
    (
        field(&["applicationId", "application_id"]),
        field(&["eventId", "event_id"]),
    )
}
