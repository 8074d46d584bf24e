//! Completeness, format and confidence checks over extracted fields.

use std::collections::BTreeMap;

use crate::models::{clamp_unit, FieldValidation, StructuredFields, ValidationOutcome};
use crate::pipeline::extraction::thresholds;
use crate::pipeline::rules::RuleSet;

const FIELD_CONFIDENCE_WEIGHT: f32 = 0.6;
const FORMAT_VALIDATION_WEIGHT: f32 = 0.4;

/// Validate extracted fields against a rule set.
///
/// Pure: the same fields and rules always give the same outcome.
pub fn validate(rule_set: &RuleSet, fields: &StructuredFields) -> ValidationOutcome {
    let is_complete = is_complete(rule_set, fields);
    let formats = check_formats(rule_set, fields);
    let formats_valid = formats.values().all(|ok| *ok);
    let confidence_ok = confidence_gate(fields);

    let outcome = ValidationOutcome {
        document_id: None,
        document_type: rule_set.document_type,
        is_authentic: formats_valid && confidence_ok,
        is_complete,
        overall_score: overall_score(fields, &formats),
        field_validations: field_validations(rule_set, fields),
    };

    tracing::debug!(
        document_type = %rule_set.document_type,
        is_complete,
        formats_valid,
        confidence_ok,
        score = outcome.overall_score,
        "Validation complete"
    );

    outcome
}

/// Every required field present with a non-empty value.
pub fn is_complete(rule_set: &RuleSet, fields: &StructuredFields) -> bool {
    rule_set
        .required_fields
        .iter()
        .all(|name| fields.get(*name).is_some_and(|f| !f.is_blank()))
}

/// Result of every declared format constraint. An absent field fails.
pub fn check_formats(rule_set: &RuleSet, fields: &StructuredFields) -> BTreeMap<&'static str, bool> {
    rule_set
        .format_constraints
        .iter()
        .map(|c| {
            let ok = fields
                .get(c.field)
                .is_some_and(|f| c.pattern.is_match(&f.value));
            (c.field, ok)
        })
        .collect()
}

/// All present fields at or above the moderate confidence threshold.
pub fn confidence_gate(fields: &StructuredFields) -> bool {
    fields.values().all(|f| f.confidence >= thresholds::MODERATE)
}

/// `0.6 × mean field confidence + 0.4 × share of formats that passed`.
/// Either term is zero when it has nothing to average.
pub fn overall_score(fields: &StructuredFields, formats: &BTreeMap<&'static str, bool>) -> f32 {
    let confidence_term = if fields.is_empty() {
        0.0
    } else {
        fields.values().map(|f| f.confidence).sum::<f32>() / fields.len() as f32
    };
    let format_term = if formats.is_empty() {
        0.0
    } else {
        formats.values().filter(|ok| **ok).count() as f32 / formats.len() as f32
    };
    clamp_unit(FIELD_CONFIDENCE_WEIGHT * confidence_term + FORMAT_VALIDATION_WEIGHT * format_term)
}

fn field_validations(rule_set: &RuleSet, fields: &StructuredFields) -> BTreeMap<String, FieldValidation> {
    fields
        .iter()
        .map(|(name, field)| {
            let required = rule_set.is_required(name);
            let format_valid = rule_set
                .format_for(name)
                .map_or(true, |pattern| pattern.is_match(&field.value));
            let valid = (!required || !field.is_blank()) && format_valid;
            (
                name.clone(),
                FieldValidation {
                    value: field.value.clone(),
                    confidence: field.confidence,
                    format_valid,
                    required,
                    valid,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, FieldValue};
    use crate::pipeline::extraction::extract_fields;
    use crate::pipeline::rules::rules_for;

    fn fields(pairs: &[(&str, &str, f32)]) -> StructuredFields {
        pairs
            .iter()
            .map(|(k, v, c)| (k.to_string(), FieldValue::new(*v, *c)))
            .collect()
    }

    fn complete_pan() -> StructuredFields {
        fields(&[
            ("pan_number", "ABCDE1234F", 0.9),
            ("name", "John Doe", 0.85),
            ("fathers_name", "James Doe", 0.8),
            ("date_of_birth", "01/01/1990", 0.85),
        ])
    }

    #[test]
    fn complete_pan_is_authentic_and_complete() {
        let rules = rules_for(DocumentType::Pan).unwrap();
        let outcome = validate(rules, &complete_pan());

        assert!(outcome.is_complete);
        assert!(outcome.is_authentic);
        // mean confidence 0.85, both formats pass
        assert!((outcome.overall_score - (0.6 * 0.85 + 0.4)).abs() < 1e-5);
        assert!(outcome.field_validations.values().all(|v| v.valid));
    }

    #[test]
    fn missing_required_field_is_incomplete() {
        let rules = rules_for(DocumentType::Pan).unwrap();
        let mut f = complete_pan();
        f.remove("fathers_name");
        let outcome = validate(rules, &f);

        assert!(!outcome.is_complete);
        // fathers_name has no format constraint, so authenticity is unaffected
        assert!(outcome.is_authentic);
    }

    #[test]
    fn bad_format_fails_authenticity() {
        let rules = rules_for(DocumentType::Pan).unwrap();
        let mut f = complete_pan();
        f.insert("date_of_birth".into(), FieldValue::new("1990-01-01", 0.85));
        let outcome = validate(rules, &f);

        assert!(!outcome.is_authentic);
        let dob = &outcome.field_validations["date_of_birth"];
        assert!(!dob.format_valid);
        assert!(!dob.valid);
        assert!(dob.required);
        assert!((outcome.overall_score - (0.6 * 0.85 + 0.4 * 0.5)).abs() < 1e-5);
    }

    #[test]
    fn absent_formatted_field_counts_as_format_failure() {
        let rules = rules_for(DocumentType::Aadhaar).unwrap();
        let f = fields(&[("name", "John Doe", 0.85)]);
        let formats = check_formats(rules, &f);
        assert_eq!(formats.len(), 2);
        assert!(formats.values().all(|ok| !ok));
        assert!(!validate(rules, &f).is_authentic);
    }

    #[test]
    fn low_confidence_field_fails_gate() {
        let rules = rules_for(DocumentType::Pan).unwrap();
        let mut f = complete_pan();
        f.insert("name".into(), FieldValue::new("John Doe", 0.69));
        assert!(!confidence_gate(&f));
        assert!(!validate(rules, &f).is_authentic);
    }

    #[test]
    fn threshold_confidence_passes_gate() {
        let f = fields(&[("name", "John Doe", 0.70)]);
        assert!(confidence_gate(&f));
    }

    #[test]
    fn empty_fields_score_zero() {
        let rules = rules_for(DocumentType::BankStatement).unwrap();
        let outcome = validate(rules, &StructuredFields::new());
        assert_eq!(outcome.overall_score, 0.0);
        assert!(!outcome.is_complete);
        assert!(!outcome.is_authentic);
        assert!(outcome.field_validations.is_empty());
    }

    #[test]
    fn score_is_deterministic() {
        let rules = rules_for(DocumentType::Pan).unwrap();
        let a = validate(rules, &complete_pan());
        let b = validate(rules, &complete_pan());
        assert_eq!(a, b);
    }

    #[test]
    fn undeclared_field_is_format_valid_and_optional() {
        let rules = rules_for(DocumentType::Pan).unwrap();
        let mut f = complete_pan();
        f.insert("signature".into(), FieldValue::new("present", 0.9));
        let v = &validate(rules, &f).field_validations["signature"];
        assert!(v.format_valid);
        assert!(!v.required);
        assert!(v.valid);
    }

    #[test]
    fn sample_texts_validate_cleanly() {
        for doc_type in DocumentType::ALL {
            let rules = rules_for(doc_type).unwrap();
            let outcome = validate(rules, &extract_fields(rules.mock_text, rules));
            assert!(outcome.is_complete, "{doc_type} sample should be complete");
            assert!(outcome.is_authentic, "{doc_type} sample should be authentic");
        }
    }
}
