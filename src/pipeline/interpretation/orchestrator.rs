use std::sync::Arc;

use super::parser::{parse_model_response_lenient, ParsedResponse};
use super::prompt::build_lab_report_prompt;
use super::types::LlmClient;
use super::InterpretationError;

/// Turns extracted report text into structured results:
/// prompt → LLM → lenient parse
pub struct ReportInterpreter {
    llm: Arc<dyn LlmClient>,
}

impl ReportInterpreter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Interpret one document's text.
    ///
    /// Empty (or whitespace-only) text is rejected before any model call.
    /// Upstream failures propagate; an unparseable answer does not, it comes
    /// back as an empty result list with the failure recorded.
    pub async fn interpret(&self, text: &str) -> Result<ParsedResponse, InterpretationError> {
        if text.trim().is_empty() {
            return Err(InterpretationError::MissingText);
        }

        let start = std::time::Instant::now();
        let prompt = build_lab_report_prompt(text);
        let raw = self.llm.complete(&prompt).await?;
        let parsed = parse_model_response_lenient(&raw);

        tracing::info!(
            text_len = text.len(),
            response_len = raw.len(),
            results = parsed.report.results().len(),
            not_lab_report = parsed.report.is_not_lab_report(),
            parse_failed = parsed.parse_failed(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Report interpretation complete"
        );

        Ok(parsed)
    }
}
