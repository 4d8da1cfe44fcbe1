//! Batch report and summary aggregation
//!
//! Ordered per-recipient outcomes plus derived counts, and the exportable
//! audit record set.

use chrono::{DateTime, Local};

use crate::error::Result;

/// Per-recipient result of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failure,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failure => "failure",
        }
    }
}

/// One outcome, appended in row order and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub row_index: usize,
    pub name: String,
    pub recipient: String,
    pub status: OutcomeStatus,
    pub detail: String,
    pub timestamp: DateTime<Local>,
}

/// Derived summary counts. `success_count + failure_count == total` holds
/// for any outcome sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

/// The complete, ordered record of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    outcomes: Vec<DispatchOutcome>,
    cancelled: bool,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome. Only the dispatcher calls this.
    pub fn push(&mut self, outcome: DispatchOutcome) {
        self.outcomes.push(outcome);
    }

    /// Mark the report as the partial result of a cancelled batch.
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn outcomes(&self) -> &[DispatchOutcome] {
        &self.outcomes
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let success_count = self
            .outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Success)
            .count();
        ReportSummary {
            total: self.outcomes.len(),
            success_count,
            failure_count: self.outcomes.len() - success_count,
        }
    }

    /// Recipients that did not get their message, for manual re-runs.
    pub fn failed_outcomes(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failure)
    }

    /// Render the exportable record set as CSV with a stable column order:
    /// name, phone, status, detail, timestamp.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["name", "phone", "status", "detail", "timestamp"])?;
        for outcome in &self.outcomes {
            writer.write_record([
                outcome.name.as_str(),
                outcome.recipient.as_str(),
                outcome.status.as_str(),
                outcome.detail.as_str(),
                &outcome.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| crate::error::Error::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| crate::error::Error::Serialization(e.to_string()))
    }
}
