use serde::Serialize;

use super::types::{LabResult, LabStatus};

/// Count of results per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub normal: usize,
    pub high: usize,
    pub low: usize,
    pub unknown: usize,
}

impl StatusSummary {
    pub fn count(&self, status: LabStatus) -> usize {
        match status {
            LabStatus::Normal => self.normal,
            LabStatus::High => self.high,
            LabStatus::Low => self.low,
            LabStatus::Unknown => self.unknown,
        }
    }

    fn increment(&mut self, status: LabStatus) {
        match status {
            LabStatus::Normal => self.normal += 1,
            LabStatus::High => self.high += 1,
            LabStatus::Low => self.low += 1,
            LabStatus::Unknown => self.unknown += 1,
        }
    }
}

/// Header numbers shown above the results table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub total: usize,
    pub normal_count: usize,
    pub abnormal_count: usize,
    pub status_summary: StatusSummary,
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub parameter: String,
    pub value: String,
    pub unit: String,
    pub normal_range: String,
    pub status: LabStatus,
    pub tone: &'static str,
}

pub fn summarize(results: &[LabResult]) -> ResultsSummary {
    let mut status_summary = StatusSummary::default();
    for result in results {
        status_summary.increment(result.status);
    }

    ResultsSummary {
        total: results.len(),
        normal_count: status_summary.normal,
        abnormal_count: status_summary.high + status_summary.low,
        status_summary,
    }
}

/// One table per status, as shown on the analyzer page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusGroup {
    pub status: LabStatus,
    pub tone: &'static str,
    pub rows: Vec<ResultRow>,
}

/// Group results by status in [`LabStatus::DISPLAY_ORDER`], skipping
/// statuses with no results. Rows keep the model's order within a group.
pub fn group_by_status(results: &[LabResult]) -> Vec<StatusGroup> {
    LabStatus::DISPLAY_ORDER
        .iter()
        .filter_map(|&status| {
            let rows: Vec<ResultRow> = results
                .iter()
                .filter(|r| r.status == status)
                .map(ResultRow::from)
                .collect();
            (!rows.is_empty()).then(|| StatusGroup {
                status,
                tone: status.tone(),
                rows,
            })
        })
        .collect()
}

impl From<&LabResult> for ResultRow {
    fn from(r: &LabResult) -> Self {
        Self {
            parameter: r.parameter.clone(),
            value: r.value.clone(),
            unit: r.unit.clone(),
            normal_range: r.normal_range.clone(),
            status: r.status,
            tone: r.status.tone(),
        }
    }
}

/// Table rows in the order the model returned them.
pub fn render_rows(results: &[LabResult]) -> Vec<ResultRow> {
    results.iter().map(ResultRow::from).collect()
}
