/// Raw recognition output for one document image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    /// Per-block confidences in [0, 1], as reported by the engine.
    pub block_confidences: Vec<f32>,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<OcrOutput, super::ExtractionError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
