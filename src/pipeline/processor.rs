//! Lab report analysis orchestrator.
//!
//! Single entry point that drives the server-side flow for one upload:
//! validate → extract → interpret → summarize.
//!
//! Uses trait-based DI for all engines (OcrEngine, PdfExtractor, LlmClient)
//! so the orchestrator remains fully testable with mock implementations.

use std::sync::Arc;

use serde::Serialize;

use crate::config::ServerConfig;
use crate::pipeline::extraction::orchestrator::DocumentExtractor;
use crate::pipeline::extraction::types::{ExtractionMethod, OcrEngine, TextExtractor};
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::import::{validate_upload, Upload, UploadInfo, ValidationError};
use crate::pipeline::interpretation::gemini::GeminiClient;
use crate::pipeline::interpretation::orchestrator::ReportInterpreter;
use crate::pipeline::interpretation::summary::{
    group_by_status, render_rows, summarize, ResultRow, ResultsSummary, StatusGroup,
};
use crate::pipeline::interpretation::types::{InterpretedReport, LabResult};
use crate::pipeline::interpretation::InterpretationError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while analyzing an upload.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Interpretation failed: {0}")]
    Interpretation(#[from] InterpretationError),
}

impl ProcessingError {
    /// Dialog shown for this failure. Validation problems get their own
    /// titles; everything else is a generic processing error carrying the
    /// underlying message.
    pub fn dialog(&self) -> Dialog {
        match self {
            Self::Validation(e) => Dialog::new(e.title(), e.user_message()),
            Self::Extraction(e) => Dialog::new(PROCESSING_ERROR_TITLE, e.to_string()),
            Self::Interpretation(e) => Dialog::new(PROCESSING_ERROR_TITLE, e.client_message()),
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

pub const PROCESSING_ERROR_TITLE: &str = "Processing Error";
pub const INVALID_REPORT_TITLE: &str = "Invalid Report";
pub const INVALID_REPORT_MESSAGE: &str = "The uploaded file does not appear to be a valid medical lab report. Please upload a proper lab report.";
pub const DISCLAIMER_TITLE: &str = "Disclaimer";
pub const DISCLAIMER_MESSAGE: &str = "This is an AI model for educational and project purposes only. The analysis may present incorrect values. Do not rely on it for medical decisions. Kindly consult a doctor for accurate interpretation.";

/// A dismissible `{ title, message }` notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dialog {
    pub title: String,
    pub message: String,
}

impl Dialog {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn disclaimer() -> Self {
        Self::new(DISCLAIMER_TITLE, DISCLAIMER_MESSAGE)
    }

    pub fn invalid_report() -> Self {
        Self::new(INVALID_REPORT_TITLE, INVALID_REPORT_MESSAGE)
    }
}

/// Summary returned to the client after analyzing one upload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed {
        upload: UploadInfo,
        method: ExtractionMethod,
        page_count: usize,
        extracted_text: String,
        results: Vec<LabResult>,
        rows: Vec<ResultRow>,
        /// Non-empty per-status tables: high, low, normal, unknown.
        groups: Vec<StatusGroup>,
        summary: ResultsSummary,
        /// Set when the model answered but its output could not be read;
        /// `results` is then empty.
        parse_failed: bool,
    },
    /// Refused before any processing; no model call was made.
    Rejected { dialog: Dialog },
    NotLabReport { dialog: Dialog },
    Failed { dialog: Dialog },
}

impl AnalysisOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Rejected { .. } => "rejected",
            Self::NotLabReport { .. } => "not_lab_report",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        match self {
            Self::Completed { .. } => None,
            Self::Rejected { dialog } | Self::NotLabReport { dialog } | Self::Failed { dialog } => {
                Some(dialog)
            }
        }
    }

    /// Results to display. Every non-completed outcome clears the table.
    pub fn results(&self) -> &[LabResult] {
        match self {
            Self::Completed { results, .. } => results,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Orchestrates lab report analysis: validate → extract → interpret.
///
/// Pure pipeline logic with trait-based DI. Does not know about HTTP or
/// progress reporting; that belongs to the API layer.
pub struct LabReportAnalyzer {
    extractor: Arc<dyn TextExtractor>,
    /// `None` when no model API key is configured.
    interpreter: Option<ReportInterpreter>,
}

impl LabReportAnalyzer {
    pub fn new(extractor: Arc<dyn TextExtractor>, interpreter: Option<ReportInterpreter>) -> Self {
        Self {
            extractor,
            interpreter,
        }
    }

    /// Analyze one upload. Never fails: every error is folded into a
    /// dialog-bearing outcome.
    pub async fn analyze(&self, upload: &Upload) -> AnalysisOutcome {
        let outcome = match self.run(upload).await {
            Ok(outcome) => outcome,
            Err(ProcessingError::Validation(e)) => {
                tracing::info!(file = %upload.file_name, error = %e, "Upload rejected");
                AnalysisOutcome::Rejected {
                    dialog: ProcessingError::Validation(e).dialog(),
                }
            }
            Err(e) => {
                tracing::warn!(file = %upload.file_name, error = %e, "Analysis failed");
                AnalysisOutcome::Failed { dialog: e.dialog() }
            }
        };

        tracing::info!(
            file = %upload.file_name,
            outcome = outcome.kind(),
            results = outcome.results().len(),
            "Analysis finished"
        );
        outcome
    }

    async fn run(&self, upload: &Upload) -> Result<AnalysisOutcome, ProcessingError> {
        // Step 1: Validate (type, then size)
        let category = validate_upload(upload)?;

        // Step 2: Extract text
        let extraction = self.extractor.extract(upload, category).await?;

        // Step 3: Interpret
        let interpreter = self
            .interpreter
            .as_ref()
            .ok_or(InterpretationError::MissingApiKey)?;
        let parsed = interpreter.interpret(&extraction.full_text).await?;

        let parse_failed = parsed.parse_failed();
        let results = match parsed.report {
            InterpretedReport::NotLabReport => {
                return Ok(AnalysisOutcome::NotLabReport {
                    dialog: Dialog::invalid_report(),
                });
            }
            InterpretedReport::Results(results) => results,
        };

        // Step 4: Summarize for display
        Ok(AnalysisOutcome::Completed {
            upload: upload.describe(),
            method: extraction.method,
            page_count: extraction.page_count,
            extracted_text: extraction.full_text,
            rows: render_rows(&results),
            groups: group_by_status(&results),
            summary: summarize(&results),
            results,
            parse_failed,
        })
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build the Gemini client when an API key is configured.
pub fn build_gemini_client(
    config: &ServerConfig,
) -> Result<Option<Arc<GeminiClient>>, ProcessingError> {
    if !config.has_api_key() {
        tracing::warn!("GEMINI_API_KEY not set; interpretation is unavailable");
        return Ok(None);
    }
    let client = GeminiClient::from_config(config)?;
    tracing::info!(model = %client.model(), "Gemini client configured");
    Ok(Some(Arc::new(client)))
}

/// Build a `LabReportAnalyzer` with production implementations.
///
/// - OCR: `BundledTesseract` (feature-gated), else Gemini vision, else unavailable
/// - PDF: `PdfTextExtractor`
/// - LLM: `GeminiClient` → `ReportInterpreter`
pub fn build_analyzer(gemini: Option<Arc<GeminiClient>>) -> LabReportAnalyzer {
    let ocr = build_ocr_engine(gemini.clone());
    let pdf = Arc::new(crate::pipeline::extraction::pdf::PdfTextExtractor);
    let extractor = Arc::new(DocumentExtractor::new(ocr, pdf));

    let interpreter = gemini.map(|client| ReportInterpreter::new(client));

    LabReportAnalyzer::new(extractor, interpreter)
}

/// Build the OCR engine, respecting feature flags.
fn build_ocr_engine(gemini: Option<Arc<GeminiClient>>) -> Arc<dyn OcrEngine> {
    #[cfg(feature = "ocr")]
    {
        match crate::pipeline::extraction::ocr::BundledTesseract::locate() {
            Ok(engine) => {
                tracing::info!("Tesseract OCR initialized");
                return Arc::new(engine);
            }
            Err(e) => tracing::warn!(error = %e, "Tesseract unavailable"),
        }
    }

    match gemini {
        Some(client) => {
            tracing::info!("Using Gemini vision for image OCR");
            Arc::new(crate::pipeline::extraction::vision_ocr::GeminiVisionOcr::new(client))
        }
        None => {
            tracing::warn!("No OCR engine available; image uploads will fail");
            Arc::new(crate::pipeline::extraction::ocr::UnavailableOcrEngine::new(
                "no OCR engine configured",
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
