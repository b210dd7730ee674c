use serde::Deserialize;

use super::types::{InterpretedReport, LabResult, NOT_LAB_REPORT};

/// Why a model response could not be turned into results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("no JSON array found in model response")]
    NoArray,

    #[error("invalid JSON array in model response: {0}")]
    InvalidJson(String),

    #[error("JSON array in model response holds no result objects ({0} entries)")]
    NoObjects(usize),
}

/// Outcome of best-effort parsing. `failure` is set when the report was
/// coalesced to an empty result list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub report: InterpretedReport,
    pub failure: Option<ParseFailure>,
}

impl ParsedResponse {
    pub fn parse_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// True when the whole response is the sentinel, bare or as a JSON string.
pub fn is_not_lab_report(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed == NOT_LAB_REPORT {
        return true;
    }
    matches!(serde_json::from_str::<String>(trimmed), Ok(s) if s.trim() == NOT_LAB_REPORT)
}

/// True when the sliced array is non-empty and every entry is the sentinel
/// string, as JSON-mode replies sometimes wrap it.
fn is_sentinel_array(raw: &str) -> bool {
    let Some(slice) = slice_json_array(raw) else {
        return false;
    };
    match serde_json::from_str::<Vec<serde_json::Value>>(slice) {
        Ok(items) => {
            !items.is_empty()
                && items
                    .iter()
                    .all(|v| matches!(v.as_str(), Some(s) if s.trim() == NOT_LAB_REPORT))
        }
        Err(_) => false,
    }
}

/// Slice from the first `[` to the last `]`, inclusive.
pub fn slice_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Strict bracket-slice parse.
///
/// Array elements that are not objects are skipped; object fields are read
/// leniently (see [`LabResult`]). A non-empty array with no usable entry is
/// a failure, not an empty report.
pub fn parse_lab_results(raw: &str) -> Result<Vec<LabResult>, ParseFailure> {
    let slice = slice_json_array(raw).ok_or(ParseFailure::NoArray)?;

    let items: Vec<serde_json::Value> =
        serde_json::from_str(slice).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;

    let total = items.len();
    let results: Vec<LabResult> = items
        .into_iter()
        .filter(|v| v.is_object())
        .filter_map(|v| LabResult::deserialize(v).ok())
        .collect();

    if total > 0 && results.is_empty() {
        return Err(ParseFailure::NoObjects(total));
    }

    if results.len() < total {
        tracing::debug!(
            skipped = total - results.len(),
            "Skipped non-object entries in model response"
        );
    }

    Ok(results)
}

/// Best-effort parse that never fails: malformed or missing JSON yields `[]`.
pub fn extract_lab_results(raw: &str) -> Vec<LabResult> {
    parse_lab_results(raw).unwrap_or_default()
}

/// Strict parse of a full model response, sentinel included.
///
/// The sentinel wins when it is the entire response, or when the response
/// holds no array but mentions it.
pub fn parse_model_response(raw: &str) -> Result<InterpretedReport, ParseFailure> {
    if is_not_lab_report(raw) || is_sentinel_array(raw) {
        return Ok(InterpretedReport::NotLabReport);
    }

    match parse_lab_results(raw) {
        Ok(results) => Ok(InterpretedReport::Results(results)),
        Err(ParseFailure::NoArray) if raw.contains(NOT_LAB_REPORT) => {
            Ok(InterpretedReport::NotLabReport)
        }
        Err(e) => Err(e),
    }
}

/// Lenient form of [`parse_model_response`]: failures become an empty result
/// list, recorded in `failure` and logged.
pub fn parse_model_response_lenient(raw: &str) -> ParsedResponse {
    match parse_model_response(raw) {
        Ok(report) => ParsedResponse {
            report,
            failure: None,
        },
        Err(failure) => {
            tracing::warn!(
                error = %failure,
                response_len = raw.len(),
                "Model response unparseable; treating as empty result list"
            );
            ParsedResponse {
                report: InterpretedReport::Results(Vec::new()),
                failure: Some(failure),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::interpretation::types::LabStatus;

    const NOISY_RESPONSE: &str = "Here is the data:\n[{\"parameter\":\"Glucose\",\"value\":\"125\",\"unit\":\"mg/dL\",\"normalRange\":\"70-100 mg/dL\",\"status\":\"high\"}]\nthanks";

    #[test]
    fn extracts_array_surrounded_by_prose() {
        let results = extract_lab_results(NOISY_RESPONSE);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].parameter, "Glucose");
        assert_eq!(results[0].value, "125");
        assert_eq!(results[0].status, LabStatus::High);
    }

    #[test]
    fn no_brackets_yields_empty() {
        assert!(extract_lab_results("no json here").is_empty());
        assert_eq!(parse_lab_results("no json here"), Err(ParseFailure::NoArray));
    }

    #[test]
    fn unbalanced_brackets_yield_empty() {
        assert!(extract_lab_results("[{\"parameter\":\"x\"").is_empty());
        assert!(extract_lab_results("] then [").is_empty());
        assert!(matches!(
            parse_lab_results("[{\"parameter\": }]"),
            Err(ParseFailure::InvalidJson(_))
        ));
    }

    #[test]
    fn trailing_summary_object_is_ignored() {
        let raw = r#"[
  {"parameter":"Hemoglobin","value":"13.5","unit":"g/dL","normalRange":"12.0-15.5 g/dL","status":"normal"},
  {"parameter":"Glucose","value":"180","unit":"mg/dL","normalRange":"70-100 mg/dL","status":"high"}
]
{
  "normalCount": 1,
  "statusSummary": {"normal": 1, "high": 1, "low": 0, "unknown": 0}
}"#;
        let results = extract_lab_results(raw);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].status, LabStatus::High);
    }

    #[test]
    fn serialized_array_round_trips_exactly() {
        let original = vec![
            LabResult {
                parameter: "Sodium".into(),
                value: "140".into(),
                unit: "mmol/L".into(),
                normal_range: "135-145 mmol/L".into(),
                status: LabStatus::Normal,
            },
            LabResult {
                parameter: "Ferritin".into(),
                value: "8".into(),
                unit: "ng/mL".into(),
                normal_range: "15-150 ng/mL".into(),
                status: LabStatus::Low,
            },
        ];
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(extract_lab_results(&json), original);
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let results = extract_lab_results(r#"[1, "x", {"parameter":"LDL","status":"high"}]"#);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].parameter, "LDL");
    }

    #[test]
    fn sentinel_as_json_string_or_bare() {
        assert!(is_not_lab_report("\"NOT_LAB_REPORT\""));
        assert!(is_not_lab_report("  NOT_LAB_REPORT\n"));
        assert!(!is_not_lab_report("[]"));
        assert_eq!(
            parse_model_response("\"NOT_LAB_REPORT\"").unwrap(),
            InterpretedReport::NotLabReport
        );
    }

    #[test]
    fn sentinel_wrapped_in_array() {
        assert_eq!(
            parse_model_response(r#"["NOT_LAB_REPORT"]"#).unwrap(),
            InterpretedReport::NotLabReport
        );
        let parsed = parse_model_response_lenient("```json\n[ \"NOT_LAB_REPORT\" ]\n```");
        assert_eq!(parsed.report, InterpretedReport::NotLabReport);
        assert!(!parsed.parse_failed());
    }

    #[test]
    fn array_without_objects_is_a_failure() {
        assert_eq!(
            parse_lab_results(r#"[1, 2, "x"]"#),
            Err(ParseFailure::NoObjects(3))
        );
        let parsed = parse_model_response_lenient(r#"[1, 2, "x"]"#);
        assert_eq!(parsed.report, InterpretedReport::Results(vec![]));
        assert_eq!(parsed.failure, Some(ParseFailure::NoObjects(3)));
        assert!(extract_lab_results("[null]").is_empty());
    }

    #[test]
    fn sentinel_inside_prose_without_array() {
        let report = parse_model_response("Sorry, this is NOT_LAB_REPORT.").unwrap();
        assert!(report.is_not_lab_report());
    }

    #[test]
    fn array_wins_over_mentioned_sentinel() {
        let raw = r#"not NOT_LAB_REPORT: [{"parameter":"ALT","status":"normal"}]"#;
        let report = parse_model_response(raw).unwrap();
        assert_eq!(report.results().len(), 1);
    }

    #[test]
    fn lenient_parse_flags_failures() {
        let parsed = parse_model_response_lenient("[oops]");
        assert_eq!(parsed.report, InterpretedReport::Results(vec![]));
        assert!(parsed.parse_failed());

        let parsed = parse_model_response_lenient("[]");
        assert_eq!(parsed.report, InterpretedReport::Results(vec![]));
        assert!(!parsed.parse_failed());
    }
}
