pub mod error;
pub mod extraction;
pub mod identifier;
pub mod intake;
pub mod orchestrator; // request fan-out, per-applicant processing, aggregation
pub mod rules;
pub mod validation;

pub use error::{ApplicantFailure, ProcessingError, VerificationError};
pub use intake::{register_upload, remove_document, Upload, UploadError};
pub use orchestrator::VerificationPipeline;
