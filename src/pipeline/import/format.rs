use std::path::Path;

use serde::{Deserialize, Serialize};

use super::upload::Upload;
use super::ValidationError;
use crate::config::{ACCEPTED_MEDIA_TYPES, MAX_UPLOAD_BYTES};

/// Broad file categories we handle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Image,
    Pdf,
    Unsupported,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn needs_ocr(&self) -> bool {
        matches!(self, Self::Image)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// Category for an already-normalized media type.
    pub fn from_media_type(media_type: &str) -> Self {
        match media_type {
            "image/png" | "image/jpeg" | "image/jpg" => Self::Image,
            "application/pdf" => Self::Pdf,
            _ => Self::Unsupported,
        }
    }
}

/// Lowercase and strip parameters (`image/PNG; name=x` → `image/png`).
pub fn normalize_media_type(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Detect a media type from magic bytes. Only the formats we accept are recognized.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        // PDF: starts with %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => Some("application/pdf"),
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: starts with 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        _ => None,
    }
}

/// Effective media type of an upload.
///
/// The declared type wins when present. Clients that send no type (or the
/// generic `application/octet-stream`) fall back to magic bytes, then to the
/// file extension.
pub fn resolve_media_type(upload: &Upload) -> String {
    let declared = normalize_media_type(&upload.media_type);
    if !declared.is_empty() && declared != "application/octet-stream" {
        return declared;
    }

    if let Some(sniffed) = sniff_media_type(&upload.bytes) {
        return sniffed.to_string();
    }

    mime_guess::from_path(&upload.file_name)
        .first()
        .map(|m| m.essence_str().to_ascii_lowercase())
        .unwrap_or(declared)
}

/// Accept an upload only if its media type is allowed and it fits the size limit.
///
/// The type check runs first, so an oversized file of the wrong type is
/// reported as an invalid type.
pub fn validate_upload(upload: &Upload) -> Result<FileCategory, ValidationError> {
    let media_type = resolve_media_type(upload);

    if !ACCEPTED_MEDIA_TYPES.contains(&media_type.as_str()) {
        tracing::info!(
            file = %sanitize_filename(&upload.file_name),
            media_type = %media_type,
            "Upload rejected: invalid file type"
        );
        return Err(ValidationError::InvalidFileType(media_type));
    }

    let size = upload.size_bytes();
    if size > MAX_UPLOAD_BYTES {
        tracing::info!(
            file = %sanitize_filename(&upload.file_name),
            size_bytes = size,
            "Upload rejected: file too large"
        );
        return Err(ValidationError::FileTooLarge {
            size_bytes: size,
            max_bytes: MAX_UPLOAD_BYTES,
        });
    }

    Ok(FileCategory::from_media_type(&media_type))
}

/// Sanitize a filename: strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}
