//! Outbound event publication.
//!
//! Publication is fire-and-forget from the pipeline's point of view: callers
//! log a `PublishError` and carry on.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::config::{DEFAULT_COMPLETED_TOPIC, DEFAULT_ERROR_TOPIC};
use crate::models::{AggregateOutcome, ValidationErrorEvent};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Publisher lock poisoned")]
    LockPoisoned,
}

pub trait ResultPublisher: Send + Sync {
    fn publish_outcome(&self, outcome: &AggregateOutcome) -> Result<(), PublishError>;

    fn publish_validation_error(&self, event: &ValidationErrorEvent) -> Result<(), PublishError>;
}

/// One message on the wire: the topic, a partition key, and the event body.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    topic: &'a str,
    key: &'a str,
    payload: &'a T,
}

/// Writes each event as one JSON line tagged with its topic.
pub struct JsonLinesPublisher<W: Write + Send> {
    writer: Mutex<W>,
    completed_topic: String,
    error_topic: String,
}

impl<W: Write + Send> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self::with_topics(writer, DEFAULT_COMPLETED_TOPIC, DEFAULT_ERROR_TOPIC)
    }

    pub fn with_topics(writer: W, completed_topic: &str, error_topic: &str) -> Self {
        Self {
            writer: Mutex::new(writer),
            completed_topic: completed_topic.to_string(),
            error_topic: error_topic.to_string(),
        }
    }

    pub fn into_inner(self) -> Result<W, PublishError> {
        self.writer.into_inner().map_err(|_| PublishError::LockPoisoned)
    }

    fn write_line<T: Serialize>(&self, topic: &str, key: &str, payload: &T) -> Result<(), PublishError> {
        let line = serde_json::to_string(&Envelope { topic, key, payload })?;
        let mut writer = self.writer.lock().map_err(|_| PublishError::LockPoisoned)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> ResultPublisher for JsonLinesPublisher<W> {
    fn publish_outcome(&self, outcome: &AggregateOutcome) -> Result<(), PublishError> {
        self.write_line(&self.completed_topic, &outcome.application_number, outcome)?;
        tracing::info!(
            topic = %self.completed_topic,
            application_id = %outcome.application_number,
            status = %outcome.status,
            "Published verification outcome"
        );
        Ok(())
    }

    fn publish_validation_error(&self, event: &ValidationErrorEvent) -> Result<(), PublishError> {
        self.write_line(&self.error_topic, &event.application_id, event)?;
        tracing::info!(
            topic = %self.error_topic,
            application_id = %event.application_id,
            applicant_id = %event.applicant_id,
            "Published validation error"
        );
        Ok(())
    }
}

/// Collects published events in memory, for tests.
#[derive(Default)]
pub struct MemoryPublisher {
    outcomes: Mutex<Vec<AggregateOutcome>>,
    errors: Mutex<Vec<ValidationErrorEvent>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<AggregateOutcome> {
        self.outcomes.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn validation_errors(&self) -> Vec<ValidationErrorEvent> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ResultPublisher for MemoryPublisher {
    fn publish_outcome(&self, outcome: &AggregateOutcome) -> Result<(), PublishError> {
        self.outcomes
            .lock()
            .map_err(|_| PublishError::LockPoisoned)?
            .push(outcome.clone());
        Ok(())
    }

    fn publish_validation_error(&self, event: &ValidationErrorEvent) -> Result<(), PublishError> {
        self.errors
            .lock()
            .map_err(|_| PublishError::LockPoisoned)?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;

    #[test]
    fn json_lines_tag_each_event_with_topic() {
        let publisher = JsonLinesPublisher::new(Vec::new());
        publisher
            .publish_outcome(&AggregateOutcome::failed("APP-1", "evt-1", "boom"))
            .unwrap();
        publisher
            .publish_validation_error(&ValidationErrorEvent::identifier_mismatch(
                "APP-1",
                "cust-1",
                "store/a",
                DocumentType::Aadhaar,
                Some("1".into()),
                Some("2".into()),
            ))
            .unwrap();

        let bytes = publisher.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["topic"], "document-verification-completed");
        assert_eq!(lines[0]["key"], "APP-1");
        assert_eq!(lines[0]["payload"]["status"], "FAILED");
        assert_eq!(lines[1]["topic"], "document-verification-error");
        assert_eq!(lines[1]["payload"]["applicantId"], "cust-1");
    }

    #[test]
    fn custom_topics_are_used() {
        let publisher = JsonLinesPublisher::with_topics(Vec::new(), "done", "oops");
        publisher
            .publish_outcome(&AggregateOutcome::failed("A", "e", "x"))
            .unwrap();
        let text = String::from_utf8(publisher.into_inner().unwrap()).unwrap();
        assert!(text.starts_with(r#"{"topic":"done""#));
    }

    #[test]
    fn memory_publisher_records_events() {
        let publisher = MemoryPublisher::new();
        publisher
            .publish_outcome(&AggregateOutcome::failed("A", "e", "x"))
            .unwrap();
        assert_eq!(publisher.outcomes().len(), 1);
        assert!(publisher.validation_errors().is_empty());
    }
}
