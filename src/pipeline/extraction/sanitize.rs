use std::sync::LazyLock;

use regex::Regex;

static HORIZONTAL_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static BLANK_LINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Sanitize extracted text before it is sent to the interpreter.
///
/// Strips control characters (OCR engines emit form feeds between pages),
/// collapses runs of spaces, and keeps line structure intact so table rows
/// stay on their own line.
pub fn sanitize_extracted_text(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");

    let cleaned: String = normalized
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();

    let collapsed = HORIZONTAL_RUNS.replace_all(&cleaned, " ");

    let trimmed_lines = collapsed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_LINE_RUNS
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let raw = "Glucose: 125\x0c\x00 mg/dL\x01";
        let clean = sanitize_extracted_text(raw);
        assert!(!clean.contains('\x0c'));
        assert!(!clean.contains('\x00'));
        assert!(clean.contains("Glucose: 125 mg/dL"));
    }

    #[test]
    fn keeps_line_structure() {
        let raw = "Hemoglobin   13.5  g/dL\r\nGlucose\t125 mg/dL\n";
        let clean = sanitize_extracted_text(raw);
        assert_eq!(clean, "Hemoglobin 13.5 g/dL\nGlucose\t125 mg/dL");
    }

    #[test]
    fn collapses_blank_line_runs() {
        let raw = "Page one\n\n\n\n\nPage two";
        assert_eq!(sanitize_extracted_text(raw), "Page one\n\nPage two");
    }

    #[test]
    fn preserves_medical_symbols() {
        let raw = "Platelets 250 x10³/µL (150-400) ≥";
        assert_eq!(sanitize_extracted_text(raw), raw);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_extracted_text(" \n\t \n"), "");
    }
}
