//! Canonical identifier lookup and comparison against the expected value.

use crate::models::StructuredFields;
use crate::pipeline::rules::RuleSet;

/// First non-blank value among the rule set's identifier keys.
pub fn extract_canonical_id(fields: &StructuredFields, rule_set: &RuleSet) -> Option<String> {
    rule_set
        .identifier_keys
        .iter()
        .filter_map(|key| fields.get(*key))
        .find(|f| !f.is_blank())
        .map(|f| f.value.clone())
}

/// Strip all whitespace and upper-case.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// True only when both sides are present, non-blank, and equal after
/// normalization.
pub fn identifiers_match(expected: Option<&str>, extracted: Option<&str>) -> bool {
    match (expected, extracted) {
        (Some(expected), Some(extracted)) => {
            let expected = normalize_identifier(expected);
            !expected.is_empty() && expected == normalize_identifier(extracted)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, FieldValue};
    use crate::pipeline::rules::rules_for;

    fn single(key: &str, value: &str) -> StructuredFields {
        let mut f = StructuredFields::new();
        f.insert(key.into(), FieldValue::new(value, 0.9));
        f
    }

    #[test]
    fn comparison_ignores_case_and_whitespace() {
        assert!(identifiers_match(Some("abcde 1234f"), Some("ABCDE1234F")));
        assert!(identifiers_match(Some("1234 5678 9012"), Some("123456789012")));
    }

    #[test]
    fn different_identifiers_do_not_match() {
        assert!(!identifiers_match(Some("ABCDE1234F"), Some("ZZZZZ9999Z")));
    }

    #[test]
    fn missing_or_blank_side_never_matches() {
        assert!(!identifiers_match(None, Some("ABCDE1234F")));
        assert!(!identifiers_match(Some("ABCDE1234F"), None));
        assert!(!identifiers_match(None, None));
        assert!(!identifiers_match(Some("  "), Some("")));
    }

    #[test]
    fn type_specific_key_preferred() {
        let rules = rules_for(DocumentType::Pan).unwrap();
        let mut f = single("document_number", "GENERIC1");
        f.insert("pan_number".into(), FieldValue::new("ABCDE1234F", 0.9));
        assert_eq!(extract_canonical_id(&f, rules).as_deref(), Some("ABCDE1234F"));
    }

    #[test]
    fn generic_fallback_used_when_specific_missing() {
        let rules = rules_for(DocumentType::Aadhaar).unwrap();
        let f = single("number", "123412341234");
        assert_eq!(extract_canonical_id(&f, rules).as_deref(), Some("123412341234"));
    }

    #[test]
    fn blank_specific_value_falls_through() {
        let rules = rules_for(DocumentType::DrivingLicense).unwrap();
        let mut f = single("license_number", "   ");
        f.insert("documentNumber".into(), FieldValue::new("KA0120120012345", 0.9));
        assert_eq!(extract_canonical_id(&f, rules).as_deref(), Some("KA0120120012345"));
    }

    #[test]
    fn no_identifier_fields_gives_none() {
        let rules = rules_for(DocumentType::BankStatement).unwrap();
        assert!(extract_canonical_id(&single("bank_name", "HDFC"), rules).is_none());
    }

    #[test]
    fn other_types_keys_are_not_used() {
        let rules = rules_for(DocumentType::Aadhaar).unwrap();
        assert!(extract_canonical_id(&single("pan_number", "ABCDE1234F"), rules).is_none());
    }
}
