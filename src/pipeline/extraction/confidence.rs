use crate::models::clamp_unit;

/// Confidence thresholds used by extraction and validation
pub mod thresholds {
    /// Fields below this fail the validation confidence gate.
    pub const MODERATE: f32 = 0.70;

    /// Confidence assigned to text produced without an OCR engine.
    pub const HIGH: f32 = 0.85;
}

/// Mean of per-block confidences, clamped to [0, 1]. Empty input gives 0.
pub fn mean_confidence(blocks: &[f32]) -> f32 {
    if blocks.is_empty() {
        return 0.0;
    }
    let sum: f32 = blocks.iter().map(|c| clamp_unit(*c)).sum();
    clamp_unit(sum / blocks.len() as f32)
}
