use std::sync::Arc;
use std::time::Instant;

use super::confidence::{mean_confidence, thresholds};
use super::sanitize::normalize_field_value;
use super::types::OcrEngine;
use super::ExtractionError;
use crate::models::{clamp_unit, DocumentType, ExtractionResult, FieldValue, StructuredFields};
use crate::pipeline::rules::{self, RuleSet};

/// Turns document bytes into raw text and structured fields.
///
/// Without an engine the OCR capability counts as unavailable: the rule
/// set's sample text stands in for recognition and extraction never fails.
pub struct OcrExtractor {
    engine: Option<Arc<dyn OcrEngine>>,
}

impl OcrExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine: Some(engine) }
    }

    pub fn unavailable() -> Self {
        Self { engine: None }
    }

    pub fn from_option(engine: Option<Arc<dyn OcrEngine>>) -> Self {
        Self { engine }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn extract(
        &self,
        bytes: &[u8],
        document_type: DocumentType,
    ) -> Result<ExtractionResult, ExtractionError> {
        let rule_set = rules::rules_for(document_type)
            .ok_or(ExtractionError::NoRuleSet(document_type))?;
        self.extract_with_rules(bytes, rule_set)
    }

    pub fn extract_with_rules(
        &self,
        bytes: &[u8],
        rule_set: &RuleSet,
    ) -> Result<ExtractionResult, ExtractionError> {
        let start = Instant::now();

        let (raw_text, overall_confidence, used_fallback) = match &self.engine {
            Some(engine) => {
                if bytes.is_empty() {
                    return Err(ExtractionError::EmptyDocument);
                }
                let output = engine.recognize(bytes)?;
                (output.text, mean_confidence(&output.block_confidences), false)
            }
            None => {
                tracing::info!(
                    document_type = %rule_set.document_type,
                    "OCR unavailable, using sample text"
                );
                (rule_set.mock_text.to_string(), thresholds::HIGH, true)
            }
        };

        let structured_fields = extract_fields(&raw_text, rule_set);
        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            document_type = %rule_set.document_type,
            fields = structured_fields.len(),
            confidence = overall_confidence,
            used_fallback,
            elapsed_ms = processing_time_ms,
            "Extraction complete"
        );

        Ok(ExtractionResult {
            document_id: None,
            raw_text,
            structured_fields,
            overall_confidence: clamp_unit(overall_confidence),
            processing_time_ms,
            used_fallback,
        })
    }
}

/// Apply a rule set's extraction rules to OCR text.
///
/// Each rule takes its first match only: capture group 1 when the pattern
/// has one, the whole match otherwise. Values that normalize to nothing are
/// dropped.
pub fn extract_fields(text: &str, rule_set: &RuleSet) -> StructuredFields {
    let mut fields = StructuredFields::new();

    for rule in &rule_set.extraction_rules {
        let Some(caps) = rule.pattern.captures(text) else {
            continue;
        };
        let Some(matched) = caps.get(1).or_else(|| caps.get(0)) else {
            continue;
        };

        let transformed = rule.transform.apply(matched.as_str().trim());
        let value = normalize_field_value(&transformed);
        if value.is_empty() {
            continue;
        }

        fields
            .entry(rule.field.to_string())
            .or_insert_with(|| FieldValue::new(value, rule.confidence));
    }

    fields
}
