use super::types::{OcrEngine, OcrOutput};
use super::ExtractionError;

/// Engine returning fixed text, for tests.
pub struct MockOcrEngine {
    pub text: String,
    pub block_confidences: Vec<f32>,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            block_confidences: vec![confidence],
        }
    }

    pub fn with_blocks(text: &str, block_confidences: Vec<f32>) -> Self {
        Self {
            text: text.to_string(),
            block_confidences,
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrOutput, ExtractionError> {
        Ok(OcrOutput {
            text: self.text.clone(),
            block_confidences: self.block_confidences.clone(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Engine that always fails, for exercising error paths.
pub struct FailingOcrEngine {
    pub message: String,
}

impl FailingOcrEngine {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl OcrEngine for FailingOcrEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrOutput, ExtractionError> {
        Err(ExtractionError::OcrProcessing(self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
