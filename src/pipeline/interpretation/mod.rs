pub mod types;
pub mod prompt;
pub mod parser;
pub mod summary;
pub mod gemini;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use summary::*;
pub use gemini::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpretationError {
    #[error("Gemini API key not set.")]
    MissingApiKey,

    #[error("Missing text.")]
    MissingText,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Gemini API returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Gemini API: Prompt or output too long (MAX_TOKENS). Please try with less text.")]
    ResponseTooLong,

    #[error("No response received from AI model")]
    NoResponse,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl InterpretationError {
    /// Message reported to the caller. Failures of the model call itself
    /// carry the "Failed to generate chat response:" prefix; precondition
    /// failures are reported as-is.
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingApiKey | Self::MissingText => self.to_string(),
            other => format!("Failed to generate chat response: {other}"),
        }
    }
}
