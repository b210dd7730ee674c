use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::InterpretationError;

/// Literal the model returns instead of an array when the text is not a lab report.
pub const NOT_LAB_REPORT: &str = "NOT_LAB_REPORT";

/// Classification of a single result against its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabStatus {
    Normal,
    High,
    Low,
    #[default]
    Unknown,
}

impl LabStatus {
    /// Order of the per-status tables: abnormal findings first.
    pub const DISPLAY_ORDER: [LabStatus; 4] = [Self::High, Self::Low, Self::Normal, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }

    /// Case-insensitive; anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "normal" => Self::Normal,
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }

    /// Color family used by the results table.
    pub fn tone(&self) -> &'static str {
        match self {
            Self::Normal => "emerald",
            Self::High => "red",
            Self::Low => "amber",
            Self::Unknown => "slate",
        }
    }

    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::High | Self::Low)
    }
}

impl<'de> Deserialize<'de> for LabStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(LabStatus::parse).unwrap_or_default())
    }
}

/// One structured lab-test finding, exactly as the model produced it.
///
/// Fields are free text: numbers arrive as strings or JSON numbers and are
/// kept verbatim. Missing fields become empty strings, a missing status is
/// `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub parameter: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub normal_range: String,
    #[serde(default)]
    pub status: LabStatus,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// What the interpreter concluded about a document.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpretedReport {
    Results(Vec<LabResult>),
    NotLabReport,
}

impl InterpretedReport {
    pub fn results(&self) -> &[LabResult] {
        match self {
            Self::Results(results) => results,
            Self::NotLabReport => &[],
        }
    }

    pub fn is_not_lab_report(&self) -> bool {
        matches!(self, Self::NotLabReport)
    }
}

/// Wire form shared by both outcomes: a result array, or the sentinel as a JSON string.
impl Serialize for InterpretedReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Results(results) => results.serialize(serializer),
            Self::NotLabReport => serializer.serialize_str(NOT_LAB_REPORT),
        }
    }
}

/// Hosted text-completion model (allows mocking).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, InterpretationError>;
}

/// Hosted multimodal model used for image transcription (allows mocking).
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn transcribe_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, InterpretationError>;
}
