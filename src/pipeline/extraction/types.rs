use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::pipeline::import::{FileCategory, Upload};

/// Result of text extraction from a single upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub method: ExtractionMethod,
    pub pages: Vec<PageExtraction>,
    pub full_text: String,
    pub page_count: usize,
}

/// How text was extracted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PdfTextLayer,
    Ocr,
}

/// Per-page extraction result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
}

/// Raw OCR result from the engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// 0.0..=1.0. Heuristic for engines that report no confidence.
    pub confidence: f32,
}

/// OCR engine abstraction (allows mocking for tests)
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn ocr_image(
        &self,
        image_bytes: &[u8],
        media_type: &str,
    ) -> Result<OcrPageResult, ExtractionError>;

    /// Short identifier used in logs.
    fn engine_name(&self) -> &'static str;
}

/// PDF text-layer extraction abstraction. CPU bound, run off the async runtime.
pub trait PdfExtractor: Send + Sync {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;
}

/// Turns a validated upload into one plain-text string.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(
        &self,
        upload: &Upload,
        category: FileCategory,
    ) -> Result<ExtractionResult, ExtractionError>;
}
