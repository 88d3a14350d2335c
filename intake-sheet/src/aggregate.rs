//! Entry state machine: boundary rows open entries, continuation rows extend them.

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use intake_core::{DiagnosisEntry, ExtractionNotice, ExtractionResult, PatientHeader, Row};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::dates::{is_boundary, DateNormalizer};

const DIAGNOSIS_COLUMNS: RangeInclusive<usize> = 2..=6;
const TREATMENT_COLUMNS: RangeInclusive<usize> = 7..=9;

#[derive(Default)]
pub(crate) struct AggregateData {
    open: Option<EntryBuilder>,
    entries: Vec<DiagnosisEntry>,
    notices: Vec<ExtractionNotice>,
}

impl AggregateData {
    pub(crate) fn handle_row(&mut self, row_number: usize, row: &Row, dates: &DateNormalizer<'_>) {
        if !is_boundary(row.first()) {
            // Rows before the first entry carry no diagnosis content.
            if let Some(entry) = self.open.as_mut() {
                entry.push_row(row);
            }
            return;
        }

        self.close_open();

        match dates.normalize(row.first()) {
            Ok(normalized) => {
                if let Some(token) = normalized.month_fallback {
                    warn!(row = row_number, %token, "unknown month, defaulting to January");
                    self.notices
                        .push(ExtractionNotice::MonthFallback { row: row_number, token });
                }

                let mut entry = EntryBuilder::new(row_number, normalized.date);
                entry.push_row(row);
                self.open = Some(entry);
            }
            Err(err) => {
                // The row and its continuation rows are dropped; extraction goes on.
                warn!(row = row_number, %err, "skipping dated row");
                self.notices.push(ExtractionNotice::SkippedBoundary {
                    row: row_number,
                    reason: err.to_string(),
                });
            }
        }
    }

    pub(crate) fn finalize(mut self, header: PatientHeader) -> ExtractionResult {
        self.close_open();
        ExtractionResult::new(header, self.entries, self.notices)
    }

    fn close_open(&mut self) {
        if let Some(entry) = self.open.take() {
            self.entries.push(entry.finish());
        }
    }
}

struct EntryBuilder {
    first_row: usize,
    rows: usize,
    date: NaiveDate,
    diagnosis: String,
    treatment: String,
}

impl EntryBuilder {
    fn new(first_row: usize, date: NaiveDate) -> Self {
        Self {
            first_row,
            rows: 0,
            date,
            diagnosis: String::new(),
            treatment: String::new(),
        }
    }

    fn push_row(&mut self, row: &Row) {
        self.rows += 1;
        push_line(&mut self.diagnosis, &range_line(row, DIAGNOSIS_COLUMNS));
        push_line(&mut self.treatment, &range_line(row, TREATMENT_COLUMNS));
    }

    fn finish(self) -> DiagnosisEntry {
        debug!(
            row = self.first_row,
            rows = self.rows,
            date = %self.date,
            "diagnosis entry complete"
        );
        DiagnosisEntry {
            date: self.date,
            diagnosis: self.diagnosis.trim().to_string(),
            treatment: self.treatment.trim().to_string(),
        }
    }
}

fn push_line(target: &mut String, line: &str) {
    target.push_str(line);
    target.push('\n');
}

/// Distinct non-empty cell texts of one row within `columns`, joined by spaces.
fn range_line(row: &Row, columns: RangeInclusive<usize>) -> String {
    let values: Vec<_> = columns.map(|column| row.cell(column).text()).collect();
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .unique()
        .join(" ")
}
