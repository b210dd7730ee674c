pub mod types;
pub mod sanitize;
pub mod pdf;
pub mod ocr;
pub mod vision_ocr;
pub mod orchestrator;

pub use types::*;
pub use sanitize::*;
pub use pdf::*;
pub use ocr::*;
pub use vision_ocr::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Image OCR is not available: {0}")]
    OcrUnavailable(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction task failed: {0}")]
    TaskFailed(String),
}
