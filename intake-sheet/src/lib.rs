//! Spreadsheet rows to `ExtractionResult`: patient header plus dated diagnosis entries.

mod aggregate;
mod dates;
mod header;

use intake_core::{ExtractionConfig, ExtractionResult, IntakeError, Sheet};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use aggregate::AggregateData;

pub use dates::{is_boundary, year_only, DateNormalizer, NormalizedDate};
pub use header::{scan_header, HeaderScan};

/// Extract a sheet given as JSON text.
pub fn extract_sheet_str(
    sheet_json: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, IntakeError> {
    let value: Value =
        serde_json::from_str(sheet_json).map_err(|err| IntakeError::Parse(err.to_string()))?;
    extract_sheet_value(&value, config)
}

/// Extract a sheet given as a `serde_json::Value`.
pub fn extract_sheet_value(
    sheet: &Value,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, IntakeError> {
    let sheet = Sheet::deserialize(sheet).map_err(|err| {
        IntakeError::MalformedSheet(format!("expected a grid of rows: {err}"))
    })?;
    extract_sheet(&sheet, config)
}

/// Single forward pass: header scan, then boundary/continuation aggregation.
///
/// Only an empty sheet is an error. Bad dates and missing header fields
/// degrade into notices and `None` fields.
pub fn extract_sheet(
    sheet: &Sheet,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, IntakeError> {
    if sheet.is_empty() {
        return Err(IntakeError::MalformedSheet("sheet has no rows".to_string()));
    }

    let scan = scan_header(sheet, 1, config);
    let dates = DateNormalizer::new(&config.months);
    let mut aggregate = AggregateData::default();

    for (row_number, row) in sheet.rows_from(scan.start_row) {
        aggregate.handle_row(row_number, row, &dates);
    }

    let result = aggregate.finalize(scan.header);
    info!(
        rows = sheet.row_count(),
        entries = result.entries.len(),
        notices = result.notices.len(),
        "sheet extracted"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use intake_core::{Cell, DiagnosisEntry, PatientHeader, Row};

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|text| Cell::from(*text)).collect()
    }

    #[test]
    fn end_to_end_minimal_sheet() {
        let sheet: Sheet = [
            row(&["Name", "", "John Doe"]),
            row(&["Adress", "", "12 Main St"]),
            row(&["01/02/23", "Flu", "", "", "", "", "Rest"]),
        ]
        .into_iter()
        .collect();

        let result = extract_sheet(&sheet, &ExtractionConfig::default()).unwrap();

        assert_eq!(
            result.header,
            PatientHeader {
                name: Some("John Doe".to_string()),
                birth_year: None,
                address: Some("12 Main St".to_string()),
            }
        );
        assert_eq!(
            result.entries,
            vec![DiagnosisEntry {
                date: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
                diagnosis: "Flu".to_string(),
                treatment: "Rest".to_string(),
            }]
        );
        assert!(result.notices.is_empty());
    }

    #[test]
    fn header_only_sheet_has_no_entries() {
        let sheet: Sheet = [row(&["Name", "Jane Roe"])].into_iter().collect();
        let result = extract_sheet(&sheet, &ExtractionConfig::default()).unwrap();

        assert_eq!(result.header.name.as_deref(), Some("Jane Roe"));
        assert_eq!(result.header.birth_year, None);
        assert_eq!(result.header.address, None);
        assert!(result.entries.is_empty());
    }

    #[test]
    fn sheet_without_header_still_yields_entries() {
        let sheet: Sheet = [row(&["Visits"]), row(&["3/4/22", "Otitis"])]
            .into_iter()
            .collect();
        let result = extract_sheet(&sheet, &ExtractionConfig::default()).unwrap();

        assert!(result.header.is_empty());
        assert_eq!(result.entries.len(), 1);
        assert_eq!(
            result.entries[0].date,
            NaiveDate::from_ymd_opt(2022, 4, 3).unwrap()
        );
    }

    #[test]
    fn empty_sheet_is_malformed() {
        let err = extract_sheet(&Sheet::default(), &ExtractionConfig::default()).unwrap_err();
        assert!(matches!(err, IntakeError::MalformedSheet(_)));
    }

    #[test]
    fn extraction_is_repeatable() {
        let sheet: Sheet = [
            row(&["Name", "A"]),
            row(&["02/01/24", "Flu", "Flu"]),
            row(&["", "Cough"]),
            row(&["9/foo/21", "Sprain"]),
        ]
        .into_iter()
        .collect();
        let config = ExtractionConfig::default();

        let first = extract_sheet(&sheet, &config).unwrap();
        let second = extract_sheet(&sheet, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn json_input_is_parsed() {
        let result = extract_sheet_str(
            r#"{"rows": [["Name", null, "John"], [{"date": "2024-05-06"}, "Flu"]]}"#,
            &ExtractionConfig::default(),
        )
        .unwrap();
        assert_eq!(result.header.name.as_deref(), Some("John"));
        assert_eq!(
            result.entries[0].date,
            NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
        );
    }

    #[test]
    fn odd_cells_do_not_reject_the_sheet() {
        let result = extract_sheet_str(
            r#"[
                ["Name", "A"],
                [{"date": "2024-02-30"}, "x"],
                [["nested"], {"richText": "Cough"}],
                ["01/02/23", "Flu", {"richText": "Fever"}]
            ]"#,
            &ExtractionConfig::default(),
        )
        .unwrap();

        assert_eq!(result.header.name.as_deref(), Some("A"));
        assert_eq!(
            result.entries,
            vec![DiagnosisEntry {
                date: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
                diagnosis: "Flu Fever".to_string(),
                treatment: String::new(),
            }]
        );
    }

    #[test]
    fn invalid_json_is_reported() {
        let config = ExtractionConfig::default();
        assert!(matches!(
            extract_sheet_str("{not json", &config),
            Err(IntakeError::Parse(_))
        ));
        assert!(matches!(
            extract_sheet_str(r#"{"cells": 3}"#, &config),
            Err(IntakeError::MalformedSheet(_))
        ));
        assert!(matches!(
            extract_sheet_str("[]", &config),
            Err(IntakeError::MalformedSheet(_))
        ));
    }
}
