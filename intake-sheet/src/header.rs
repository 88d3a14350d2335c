//! Labeled patient fields at the top of the sheet.

use std::ops::RangeInclusive;

use intake_core::{ExtractionConfig, PatientHeader, Row, Sheet};
use tracing::debug;

use crate::dates::{is_boundary, year_only};

/// Columns searched, left to right, for the value next to a label.
const HEADER_VALUE_COLUMNS: RangeInclusive<usize> = 2..=4;

/// Diagnosis rows start this many rows below the address label.
const ADDRESS_SEPARATOR_ROWS: usize = 2;

/// Header fields found so far and the first row left for diagnosis scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderScan {
    pub header: PatientHeader,
    pub start_row: usize,
}

/// Scan rows from `start_row` until the address label, the first boundary row
/// or the end of the sheet. Missing labels leave their fields empty.
pub fn scan_header(sheet: &Sheet, start_row: usize, config: &ExtractionConfig) -> HeaderScan {
    let labels = &config.labels;
    let mut header = PatientHeader::default();

    for (row_number, row) in sheet.rows_from(start_row) {
        let first = row.first();
        if is_boundary(first) {
            debug!(row = row_number, "header scan reached first dated row");
            break;
        }

        let label = first.text();

        if labels.name.matches(&label) {
            if let Some(name) = label_value(row, |text| labels.name.matches(text)) {
                debug!(row = row_number, "found patient name");
                header.name = Some(name);
            }
        } else if labels.birthdate.matches(&label) {
            if let Some(raw) = label_value(row, |text| labels.birthdate.matches(text)) {
                header.birth_year = year_only(&raw);
                debug!(row = row_number, birth_year = ?header.birth_year, "found birthdate");
            }
        } else if config.is_address_label(&label) {
            if let Some(address) = label_value(row, |text| config.is_address_label(text)) {
                header.address = Some(address);
            }
            debug!(row = row_number, "found address label, header complete");
            return HeaderScan {
                header,
                start_row: row_number + ADDRESS_SEPARATOR_ROWS,
            };
        }
    }

    HeaderScan { header, start_row }
}

fn label_value(row: &Row, is_label: impl Fn(&str) -> bool) -> Option<String> {
    HEADER_VALUE_COLUMNS
        .map(|column| row.cell(column).text().trim().to_string())
        .find(|value| !value.is_empty() && !is_label(value))
}
