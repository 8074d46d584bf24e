use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(DocumentStatus {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Uploaded => "UPLOADED",
    Completed => "COMPLETED",
    Failed => "FAILED",
});

str_enum!(OutcomeStatus {
    Completed => "COMPLETED",
    PartialSuccess => "PARTIAL_SUCCESS",
    Failed => "FAILED",
});

str_enum!(AuditAction {
    RequestReceived => "VERIFY_DOCUMENT_EVENT_RECEIVED",
    DocumentCreated => "DOCUMENT_CREATED_FOR_PROCESSING",
    DocumentFound => "DOCUMENT_FOUND_FOR_PROCESSING",
    DocumentProcessed => "DOCUMENT_PROCESSED_SUCCESSFULLY",
    ValidationFailed => "DOCUMENT_VALIDATION_FAILED",
    ProcessingError => "DOCUMENT_PROCESSING_ERROR",
    OutcomePublished => "DOCUMENT_VERIFICATION_COMPLETED_EVENT_PUBLISHED",
    RequestFailed => "VERIFY_DOCUMENT_EVENT_ERROR",
    DocumentUploaded => "DOCUMENT_UPLOADED",
    DocumentDeleted => "DOCUMENT_DELETED",
});

/// Identity document categories the verification pipeline knows rules for.
///
/// Not generated by `str_enum!`: inbound requests use several spellings
/// for the same category, so parsing is case-insensitive and alias-aware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "AADHAAR")]
    Aadhaar,
    #[serde(rename = "PAN")]
    Pan,
    #[serde(rename = "DRIVING_LICENSE")]
    DrivingLicense,
    #[serde(rename = "BANK_STATEMENT")]
    BankStatement,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Aadhaar,
        DocumentType::Pan,
        DocumentType::DrivingLicense,
        DocumentType::BankStatement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aadhaar => "AADHAAR",
            Self::Pan => "PAN",
            Self::DrivingLicense => "DRIVING_LICENSE",
            Self::BankStatement => "BANK_STATEMENT",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AADHAAR" | "AADHAR" => Ok(Self::Aadhaar),
            "PAN" | "PANCARD" => Ok(Self::Pan),
            "DRIVING_LICENSE" | "DRIVING_LICENCE" | "DL" => Ok(Self::DrivingLicense),
            "BANK_STATEMENT" => Ok(Self::BankStatement),
            _ => Err(DatabaseError::InvalidEnum {
                field: "DocumentType".into(),
                value: s.into(),
            }),
        }
    }
}
