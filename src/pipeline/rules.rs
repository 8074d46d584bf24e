//! Per-document-type rule tables.
//!
//! Built once and shared read-only. Each `RuleSet` carries everything the
//! pipeline needs to know about one document type: how to pull fields out
//! of OCR text, which fields must be present, which must match a format,
//! which field holds the canonical identifier, and the sample text used
//! when no OCR engine is configured.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::DocumentType;

/// Post-capture rewrite applied before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTransform {
    None,
    /// Drop every whitespace character (`1234 5678 9012` → `123456789012`).
    RemoveWhitespace,
    /// Collapse line breaks into single spaces.
    JoinLines,
}

impl FieldTransform {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::None => value.to_string(),
            Self::RemoveWhitespace => value.chars().filter(|c| !c.is_whitespace()).collect(),
            Self::JoinLines => value
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug)]
pub struct ExtractionRule {
    pub field: &'static str,
    pub pattern: Regex,
    pub confidence: f32,
    pub transform: FieldTransform,
}

/// A field whose value must fully match `pattern`.
#[derive(Debug)]
pub struct FormatConstraint {
    pub field: &'static str,
    pub pattern: Regex,
}

#[derive(Debug)]
pub struct RuleSet {
    pub document_type: DocumentType,
    pub required_fields: &'static [&'static str],
    pub format_constraints: Vec<FormatConstraint>,
    /// Applied in order; each contributes at most one field.
    pub extraction_rules: Vec<ExtractionRule>,
    /// Field names searched in order for the document's identifier.
    pub identifier_keys: Vec<&'static str>,
    pub mock_text: &'static str,
}

impl RuleSet {
    pub fn is_required(&self, field: &str) -> bool {
        self.required_fields.contains(&field)
    }

    pub fn format_for(&self, field: &str) -> Option<&Regex> {
        self.format_constraints
            .iter()
            .find(|c| c.field == field)
            .map(|c| &c.pattern)
    }
}

#[derive(Debug)]
pub struct RuleRegistry {
    sets: BTreeMap<DocumentType, RuleSet>,
}

impl RuleRegistry {
    pub fn get(&self, document_type: DocumentType) -> Option<&RuleSet> {
        self.sets.get(&document_type)
    }

    pub fn document_types(&self) -> impl Iterator<Item = DocumentType> + '_ {
        self.sets.keys().copied()
    }
}

/// The process-wide rule registry.
pub fn registry() -> &'static RuleRegistry {
    &REGISTRY
}

/// Rule set for a document type, if one is registered.
pub fn rules_for(document_type: DocumentType) -> Option<&'static RuleSet> {
    REGISTRY.get(document_type)
}

const GENERIC_IDENTIFIER_KEYS: [&str; 3] = ["document_number", "documentNumber", "number"];

const DATE_FORMAT: &str = r"^(0[1-9]|[12][0-9]|3[01])/(0[1-9]|1[0-2])/[0-9]{4}$";
const NAME_PATTERN: &str = r"(?i)(?:name|नाम)[:\s]+([\p{L} ]+)";
const DOB_PATTERN: &str = r"(?i)(?:DOB|Date of Birth|जन्म तिथि)[:\s]+([0-9]{2}/[0-9]{2}/[0-9]{4})";
const ADDRESS_PATTERN: &str = r"(?i)(?:Address|पता)[:\s]+([\s\S]+?)(?:\n\n|[0-9]{6}|$)";

static REGISTRY: LazyLock<RuleRegistry> = LazyLock::new(|| {
    let sets = [aadhaar(), pan(), driving_license(), bank_statement()]
        .into_iter()
        .map(|set| (set.document_type, set))
        .collect();
    RuleRegistry { sets }
});

fn rule(field: &'static str, pattern: &str, confidence: f32, transform: FieldTransform) -> ExtractionRule {
    ExtractionRule {
        field,
        pattern: Regex::new(pattern).unwrap(),
        confidence,
        transform,
    }
}

fn format(field: &'static str, pattern: &str) -> FormatConstraint {
    FormatConstraint {
        field,
        pattern: Regex::new(pattern).unwrap(),
    }
}

fn identifier_keys(specific: [&'static str; 2]) -> Vec<&'static str> {
    specific.into_iter().chain(GENERIC_IDENTIFIER_KEYS).collect()
}

fn aadhaar() -> RuleSet {
    RuleSet {
        document_type: DocumentType::Aadhaar,
        required_fields: &["aadhaar_number", "name", "date_of_birth", "gender", "address"],
        format_constraints: vec![
            format("aadhaar_number", r"^[0-9]{12}$"),
            format("date_of_birth", DATE_FORMAT),
        ],
        extraction_rules: vec![
            rule("aadhaar_number", r"[0-9]{4}\s?[0-9]{4}\s?[0-9]{4}", 0.9, FieldTransform::RemoveWhitespace),
            rule("name", NAME_PATTERN, 0.85, FieldTransform::None),
            rule("date_of_birth", DOB_PATTERN, 0.85, FieldTransform::None),
            rule("gender", r"(?i)(Male|Female)", 0.9, FieldTransform::None),
            rule("address", ADDRESS_PATTERN, 0.75, FieldTransform::JoinLines),
        ],
        identifier_keys: identifier_keys(["aadhaar_number", "aadhaarNumber"]),
        mock_text: "Government of India\n\
                    Unique Identification Authority of India\n\
                    Name: John Doe\n\
                    DOB: 01/01/1990\n\
                    Gender: MALE\n\
                    Address: 123 Main Street, Apartment 4B, Bangalore, Karnataka, 560001\n\
                    Aadhaar: 1234 5678 9012",
    }
}

fn pan() -> RuleSet {
    RuleSet {
        document_type: DocumentType::Pan,
        required_fields: &["pan_number", "name", "fathers_name", "date_of_birth"],
        format_constraints: vec![
            format("pan_number", r"^[A-Z]{5}[0-9]{4}[A-Z]{1}$"),
            format("date_of_birth", DATE_FORMAT),
        ],
        extraction_rules: vec![
            rule("pan_number", r"[A-Z]{5}[0-9]{4}[A-Z]{1}", 0.9, FieldTransform::None),
            rule("name", NAME_PATTERN, 0.85, FieldTransform::None),
            rule(
                "fathers_name",
                r"(?i)(?:Father's Name|Father|पिता)[:\s]+([\p{L} ]+)",
                0.8,
                FieldTransform::None,
            ),
            rule("date_of_birth", DOB_PATTERN, 0.85, FieldTransform::None),
        ],
        identifier_keys: identifier_keys(["pan_number", "panNumber"]),
        mock_text: "INCOME TAX DEPARTMENT\n\
                    GOVT. OF INDIA\n\
                    Permanent Account Number\n\
                    ABCDE1234F\n\
                    Name: John Doe\n\
                    Father's Name: James Doe\n\
                    Date of Birth: 01/01/1990",
    }
}

fn driving_license() -> RuleSet {
    RuleSet {
        document_type: DocumentType::DrivingLicense,
        required_fields: &[
            "license_number",
            "name",
            "date_of_birth",
            "address",
            "valid_from",
            "valid_until",
        ],
        format_constraints: vec![
            format("date_of_birth", DATE_FORMAT),
            format("valid_from", DATE_FORMAT),
            format("valid_until", DATE_FORMAT),
        ],
        extraction_rules: vec![
            rule(
                "license_number",
                r"(?i)(?:DL No|License No)[.:\s]+([A-Za-z0-9]+\s?[A-Za-z0-9]+)",
                0.9,
                FieldTransform::None,
            ),
            rule("name", NAME_PATTERN, 0.85, FieldTransform::None),
            rule("date_of_birth", DOB_PATTERN, 0.85, FieldTransform::None),
            rule("address", ADDRESS_PATTERN, 0.75, FieldTransform::JoinLines),
            rule(
                "valid_from",
                r"(?i)(?:Valid From|Issue Date)[:\s]+([0-9]{2}/[0-9]{2}/[0-9]{4})",
                0.85,
                FieldTransform::None,
            ),
            rule(
                "valid_until",
                r"(?i)(?:Valid Until|Valid Till|Expiry Date)[:\s]+([0-9]{2}/[0-9]{2}/[0-9]{4})",
                0.85,
                FieldTransform::None,
            ),
        ],
        identifier_keys: identifier_keys(["license_number", "licenseNumber"]),
        mock_text: "DRIVING LICENSE\n\
                    License No: KA01 20120012345\n\
                    Name: John Doe\n\
                    DOB: 01/01/1990\n\
                    Address: 123 Main Street, Apartment 4B, Bangalore, Karnataka, 560001\n\
                    Valid From: 01/01/2020\n\
                    Valid Until: 31/12/2030\n\
                    Blood Group: O+\n\
                    Issuing Authority: RTO Bangalore",
    }
}

fn bank_statement() -> RuleSet {
    RuleSet {
        document_type: DocumentType::BankStatement,
        required_fields: &[
            "account_number",
            "account_holder_name",
            "bank_name",
            "statement_period",
            "opening_balance",
            "closing_balance",
        ],
        format_constraints: vec![format("account_number", r"^[0-9]{9,18}$")],
        extraction_rules: vec![
            rule(
                "account_number",
                r"(?i)(?:A/C No|Account No|Account Number)[.:\s]+([0-9][0-9\s]+)",
                0.9,
                FieldTransform::RemoveWhitespace,
            ),
            rule(
                "account_holder_name",
                r"(?i)(?:Name|Customer Name|Account Name)[:\s]+([\p{L} ]+)",
                0.85,
                FieldTransform::None,
            ),
            rule(
                "bank_name",
                r"(?i)(HDFC|SBI|ICICI|AXIS|KOTAK|PNB|BANK OF BARODA|CANARA|UNION BANK)",
                0.9,
                FieldTransform::None,
            ),
            rule(
                "statement_period",
                r"(?i)(?:Statement Period|Period)[:\s]+([0-9/\s\-]+to[0-9/\s\-]+)",
                0.8,
                FieldTransform::None,
            ),
            rule(
                "opening_balance",
                r"(?i)(?:Opening Balance)[:\s]+([$₹]?[0-9,.]+)",
                0.8,
                FieldTransform::None,
            ),
            rule(
                "closing_balance",
                r"(?i)(?:Closing Balance)[:\s]+([$₹]?[0-9,.]+)",
                0.8,
                FieldTransform::None,
            ),
        ],
        identifier_keys: identifier_keys(["account_number", "accountNumber"]),
        mock_text: "HDFC BANK\n\
                    Statement of Account\n\
                    Account Name: John Doe\n\
                    A/C No: 12345678901234\n\
                    Statement Period: 01/01/2023 to 31/01/2023\n\
                    Opening Balance: ₹50,000.00\n\
                    Closing Balance: ₹65,432.10\n\
                    Date       Description                 Debit      Credit     Balance\n\
                    01/01/2023 Opening Balance                                  50,000.00\n\
                    05/01/2023 Salary                                20,000.00  70,000.00\n\
                    10/01/2023 Rent Payment               15,000.00            55,000.00\n\
                    15/01/2023 Grocery Shopping            2,500.00            52,500.00\n\
                    20/01/2023 Utility Bills               1,500.00            51,000.00\n\
                    25/01/2023 Online Purchase             1,200.00            49,800.00\n\
                    28/01/2023 Interest Credit                         632.10   50,432.10\n\
                    30/01/2023 ATM Withdrawal              5,000.00            45,432.10\n\
                    31/01/2023 Deposit                                20,000.00  65,432.10",
    }
}
