//! HTTP adapter for a Vision-style `images:annotate` OCR service.
//!
//! Sends the document as base64 with a `DOCUMENT_TEXT_DETECTION` feature and
//! reads the full-text annotation plus per-block confidences back.

use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::types::{OcrEngine, OcrOutput};
use super::ExtractionError;

const FEATURE_DOCUMENT_TEXT: &str = "DOCUMENT_TEXT_DETECTION";

pub struct VisionOcrClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl VisionOcrClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature<'a>>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize, Default)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    full_text_annotation: Option<TextAnnotation>,
    #[serde(default)]
    error: Option<ServiceStatus>,
}

#[derive(Deserialize, Default)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize, Default)]
struct Page {
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Deserialize, Default)]
struct Block {
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Deserialize, Default)]
struct ServiceStatus {
    #[serde(default)]
    message: String,
}

/// Turn an annotate response body into OCR output.
/// A missing annotation means the image had no text, which is not an error.
fn parse_annotate_response(body: &str) -> Result<OcrOutput, ExtractionError> {
    let parsed: AnnotateResponse =
        serde_json::from_str(body).map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

    let Some(first) = parsed.responses.into_iter().next() else {
        return Ok(OcrOutput::default());
    };

    if let Some(status) = first.error {
        return Err(ExtractionError::OcrProcessing(format!(
            "Error from Vision API: {}",
            status.message
        )));
    }

    let Some(annotation) = first.full_text_annotation else {
        return Ok(OcrOutput::default());
    };

    let block_confidences = annotation
        .pages
        .iter()
        .flat_map(|p| p.blocks.iter())
        .map(|b| b.confidence.unwrap_or(0.0))
        .collect();

    Ok(OcrOutput {
        text: annotation.text,
        block_confidences,
    })
}

impl OcrEngine for VisionOcrClient {
    fn recognize(&self, image_bytes: &[u8]) -> Result<OcrOutput, ExtractionError> {
        let _span = tracing::info_span!(
            "vision_ocr_recognize",
            endpoint = %self.endpoint,
            image_size = image_bytes.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(image_bytes),
                },
                features: vec![Feature {
                    kind: FEATURE_DOCUMENT_TEXT,
                }],
            }],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                ExtractionError::OcrConnection(self.endpoint.clone())
            } else if e.is_timeout() {
                ExtractionError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ExtractionError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::OcrService {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;
        let output = parse_annotate_response(&text)?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = output.text.len(),
            blocks = output.block_confidences.len(),
            "Vision OCR complete"
        );

        Ok(output)
    }

    fn name(&self) -> &str {
        "vision"
    }
}
