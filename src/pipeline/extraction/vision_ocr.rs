//! Vision OCR engine: transcribes lab report photos through the hosted model.
//!
//! Used when no native Tesseract build is available. The image travels
//! base64-encoded as inline data next to a transcription instruction; the
//! model's reply is the page text.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;

use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;
use crate::pipeline::interpretation::types::VisionClient;

const TRANSCRIPTION_PROMPT: &str = "\
You are a meticulous OCR engine. Transcribe ALL visible text from this medical lab report \
image exactly as printed, one table row per line, keeping test names, values, units and \
reference ranges together. Do not summarize, interpret or add any commentary.";

/// Production vision OCR engine backed by the Gemini API.
pub struct GeminiVisionOcr {
    vision_client: Arc<dyn VisionClient>,
}

impl GeminiVisionOcr {
    pub fn new(vision_client: Arc<dyn VisionClient>) -> Self {
        Self { vision_client }
    }
}

#[async_trait]
impl OcrEngine for GeminiVisionOcr {
    async fn ocr_image(
        &self,
        image_bytes: &[u8],
        media_type: &str,
    ) -> Result<OcrPageResult, ExtractionError> {
        let start = std::time::Instant::now();
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let mime = inline_mime_type(media_type);

        let text = self
            .vision_client
            .transcribe_image(TRANSCRIPTION_PROMPT, &encoded, mime)
            .await
            .map_err(|e| ExtractionError::OcrProcessing(format!("Vision OCR failed: {e}")))?;

        let confidence = compute_heuristic_confidence(&text);

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            image_size = image_bytes.len(),
            text_len = text.len(),
            confidence,
            "Vision OCR extraction complete"
        );

        Ok(OcrPageResult { text, confidence })
    }

    fn engine_name(&self) -> &'static str {
        "gemini-vision"
    }
}

/// `image/jpg` is a browser alias; the API only knows `image/jpeg`.
fn inline_mime_type(media_type: &str) -> &str {
    match media_type {
        "image/jpg" => "image/jpeg",
        other => other,
    }
}

/// Vision models report no per-word confidence; estimate from output length.
/// Capped at 0.95.
fn compute_heuristic_confidence(text: &str) -> f32 {
    let len = text.trim().len();
    let base: f32 = match len {
        0 => return 0.0,
        1..=49 => 0.2,
        50..=199 => 0.4,
        200..=499 => 0.6,
        _ => 0.8,
    };

    // Lab tables nearly always carry digits; none suggests a misread.
    let has_digits = text.chars().any(|c| c.is_ascii_digit());
    let bonus = if has_digits { 0.1 } else { 0.0 };

    (base + bonus).min(0.95)
}
