pub mod format;
pub mod upload;

pub use format::*;
pub use upload::*;

use thiserror::Error;

/// Why an upload was refused before any processing started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported media type: {0}")]
    InvalidFileType(String),

    #[error("File too large: {size_bytes} bytes exceeds {max_bytes} byte limit")]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },
}

impl ValidationError {
    /// Dialog title shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidFileType(_) => "Invalid File Type",
            Self::FileTooLarge { .. } => "File Too Large",
        }
    }

    /// Dialog body shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidFileType(_) => "Please upload a PNG, JPG, JPEG, or PDF file.",
            Self::FileTooLarge { .. } => "File size must be less than 10MB.",
        }
    }
}
