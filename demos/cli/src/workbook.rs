//! Đọc worksheet bằng calamine và chuyển sang `Sheet` với tọa độ tuyệt đối.

use std::path::Path;

use anyhow::Context;
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;
use intake_core::{number_text, Cell, Row, Sheet};
use tracing::debug;

/// Mở workbook và đọc worksheet `sheet_name`, hoặc worksheet đầu tiên.
pub fn load_sheet(path: &Path, sheet_name: Option<&str>) -> anyhow::Result<Sheet> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Không mở được workbook {path:?}"))?;

    let name = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .context("Workbook không có worksheet nào")?,
    };

    let range = workbook
        .worksheet_range(&name)
        .with_context(|| format!("Không đọc được worksheet {name:?}"))?;
    debug!(sheet = %name, height = range.height(), width = range.width(), "worksheet loaded");

    Ok(range_to_sheet(&range))
}

/// Calamine bỏ các hàng/cột trống ở đầu; thêm lại để cột 1 luôn là cột A.
pub fn range_to_sheet(range: &Range<Data>) -> Sheet {
    let Some((start_row, start_col)) = range.start() else {
        return Sheet::default();
    };

    let leading_rows = (0..start_row).map(|_| Row::default());
    let data_rows = range.rows().map(|cells| {
        std::iter::repeat(Cell::Empty)
            .take(start_col as usize)
            .chain(cells.iter().map(data_to_cell))
            .collect::<Row>()
    });

    leading_rows.chain(data_rows).collect()
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Int(value) => Cell::Text(value.to_string()),
        Data::Float(value) => Cell::Text(number_text(*value)),
        Data::Bool(value) => Cell::Text(value.to_string()),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => Cell::Date(datetime.date()),
            None => Cell::Text(number_text(value.as_f64())),
        },
        Data::DateTimeIso(text) => iso_date(text)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(text.clone())),
        Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}

fn iso_date(text: &str) -> Option<NaiveDate> {
    text.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
