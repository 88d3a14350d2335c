//! Mô hình dữ liệu lõi cho việc trích xuất bệnh sử từ bảng tính.

use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Giá trị của một ô: rỗng, văn bản hoặc ngày gốc của bảng tính.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "WireCell", into = "WireCell")]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Date(NaiveDate),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Chuỗi đại diện của ô, dùng cho mọi phân tích dạng văn bản.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(text) => Cow::Borrowed(text.as_str()),
            Cell::Date(date) => Cow::Owned(date.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Date(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

/// Dạng JSON của ô: `null`, chuỗi, số, bool hoặc `{"date": "YYYY-MM-DD"}`.
/// Mọi dạng khác được ép thành văn bản thay vì làm hỏng cả bảng tính.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date {
        date: String,
    },
    #[serde(skip_serializing)]
    Other(Value),
}

impl From<WireCell> for Cell {
    fn from(wire: WireCell) -> Self {
        match wire {
            WireCell::Empty => Cell::Empty,
            WireCell::Text(text) => Cell::Text(text),
            WireCell::Number(value) => Cell::Text(number_text(value)),
            WireCell::Bool(value) => Cell::Text(value.to_string()),
            WireCell::Date { date } => match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
                Ok(parsed) => Cell::Date(parsed),
                Err(_) => Cell::Text(date),
            },
            WireCell::Other(value) => {
                let mut parts = Vec::new();
                collect_leaf_text(&value, &mut parts);
                if parts.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(parts.join(" "))
                }
            }
        }
    }
}

impl From<Cell> for WireCell {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => WireCell::Empty,
            Cell::Text(text) => WireCell::Text(text),
            Cell::Date(date) => WireCell::Date {
                date: date.format("%Y-%m-%d").to_string(),
            },
        }
    }
}

/// Gom các giá trị lá (chuỗi, số, bool) theo thứ tự xuất hiện.
fn collect_leaf_text(value: &Value, parts: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(text) => {
            if !text.trim().is_empty() {
                parts.push(text.clone());
            }
        }
        Value::Number(number) => match number.as_f64() {
            Some(value) => parts.push(number_text(value)),
            None => parts.push(number.to_string()),
        },
        Value::Bool(value) => parts.push(value.to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_leaf_text(item, parts)),
        Value::Object(fields) => fields
            .values()
            .for_each(|field| collect_leaf_text(field, parts)),
    }
}

/// Chuyển số sang chuỗi, bỏ phần `.0` của số nguyên.
pub fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Một hàng của bảng tính, cột đánh số từ 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Ô tại cột `column` (bắt đầu từ 1); cột thiếu trả về ô rỗng.
    pub fn cell(&self, column: usize) -> &Cell {
        column
            .checked_sub(1)
            .and_then(|index| self.cells.get(index))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn first(&self) -> &Cell {
        self.cell(1)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Self::new(cells)
    }
}

impl FromIterator<Cell> for Row {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Một worksheet đã giải mã: danh sách hàng theo thứ tự, hàng đánh số từ 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "WireSheet")]
pub struct Sheet {
    rows: Vec<Row>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireSheet {
    Grid { rows: Vec<Row> },
    Rows(Vec<Row>),
}

impl From<WireSheet> for Sheet {
    fn from(wire: WireSheet) -> Self {
        match wire {
            WireSheet::Grid { rows } | WireSheet::Rows(rows) => Sheet::new(rows),
        }
    }
}

impl Sheet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Hàng thứ `number` (bắt đầu từ 1).
    pub fn row(&self, number: usize) -> Option<&Row> {
        number.checked_sub(1).and_then(|index| self.rows.get(index))
    }

    /// Duyệt các hàng từ `start` (bắt đầu từ 1) kèm số thứ tự hàng.
    pub fn rows_from(&self, start: usize) -> impl Iterator<Item = (usize, &Row)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| (index + 1, row))
            .skip(start.saturating_sub(1))
    }
}

impl FromIterator<Row> for Sheet {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Thông tin hành chính ở đầu bảng tính. Chỉ giữ lại năm sinh.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PatientHeader {
    pub name: Option<String>,
    pub birth_year: Option<i32>,
    pub address: Option<String>,
}

impl PatientHeader {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.birth_year.is_none() && self.address.is_none()
    }
}

/// Một lần khám: ngày, chẩn đoán và điều trị (mỗi hàng đóng góp một dòng).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosisEntry {
    pub date: NaiveDate,
    pub diagnosis: String,
    pub treatment: String,
}

/// Các giá trị mặc định âm thầm được áp dụng trong quá trình trích xuất.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionNotice {
    /// Tháng không có trong bảng tháng, đã mặc định thành tháng 1.
    MonthFallback { row: usize, token: String },
    /// Hàng trông giống ngày nhưng không chuẩn hóa được, đã bỏ qua.
    SkippedBoundary { row: usize, reason: String },
}

/// Kết quả cuối cùng trả về cho tầng lưu trữ.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub header: PatientHeader,
    pub entries: Vec<DiagnosisEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<ExtractionNotice>,
}

impl ExtractionResult {
    pub fn new(
        header: PatientHeader,
        entries: Vec<DiagnosisEntry>,
        notices: Vec<ExtractionNotice>,
    ) -> Self {
        Self {
            header,
            entries,
            notices,
        }
    }
}

/// Tập các cách viết được chấp nhận cho một nhãn (chữ thường).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            labels
                .into_iter()
                .map(|label| normalize_label(label.as_ref()))
                .collect(),
        )
    }

    /// So khớp không phân biệt hoa thường, chấp nhận `:` hoặc ` :` ở cuối.
    pub fn matches(&self, raw: &str) -> bool {
        let normalized = normalize_label(raw);
        self.0.iter().any(|label| normalize_label(label) == normalized)
    }
}

fn normalize_label(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    lower
        .strip_suffix(':')
        .unwrap_or(lower.as_str())
        .trim_end()
        .to_string()
}

/// Nhãn của ba trường tiêu đề.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderLabels {
    pub name: LabelSet,
    pub birthdate: LabelSet,
    pub address: LabelSet,
}

impl Default for HeaderLabels {
    fn default() -> Self {
        Self {
            name: LabelSet::new(["name"]),
            birthdate: LabelSet::new(["birthdate", "date of birth"]),
            // Dữ liệu nguồn dùng đúng cách viết "adress".
            address: LabelSet::new(["adress"]),
        }
    }
}

/// Bảng tháng: 12 danh sách bí danh, bắt đầu từ tháng 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MonthTable {
    months: Vec<Vec<String>>,
}

const DEFAULT_MONTHS: [&[&str]; 12] = [
    &["jan", "january", "01", "1", "janv", "janvier"],
    &["feb", "february", "02", "2", "fev", "fevr", "fevrier"],
    &["mar", "march", "03", "3", "mars"],
    &["apr", "april", "04", "4", "avril", "avr"],
    &["may", "05", "5", "mai"],
    &["jun", "june", "06", "6", "juin"],
    &["jul", "july", "07", "7", "juil", "juillet"],
    &["aug", "august", "08", "8", "aout"],
    &["sep", "sept", "september", "09", "9", "septembre"],
    &["oct", "october", "10", "octobre"],
    &["nov", "november", "11", "novembre"],
    &["dec", "december", "12", "decembre"],
];

impl MonthTable {
    pub fn new(months: Vec<Vec<String>>) -> Self {
        let months = months
            .into_iter()
            .map(|aliases| aliases.iter().map(|alias| alias.to_lowercase()).collect())
            .collect();
        Self { months }
    }

    /// Số tháng (1-12) của bí danh đầu tiên khớp, theo thứ tự khai báo.
    pub fn resolve(&self, token: &str) -> Option<u32> {
        let needle = token.trim().to_lowercase();
        self.months
            .iter()
            .position(|aliases| aliases.iter().any(|alias| alias.to_lowercase() == needle))
            .map(|index| index as u32 + 1)
    }
}

impl Default for MonthTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_MONTHS
                .iter()
                .map(|aliases| aliases.iter().map(|alias| alias.to_string()).collect())
                .collect(),
        )
    }
}

/// Cấu hình bất biến cho bộ trích xuất.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ExtractionConfig {
    pub labels: HeaderLabels,
    /// Chấp nhận thêm cách viết đúng "address" bên cạnh "adress".
    pub accept_address_spelling: bool,
    pub months: MonthTable,
}

impl ExtractionConfig {
    pub fn is_address_label(&self, raw: &str) -> bool {
        self.labels.address.matches(raw)
            || (self.accept_address_spelling && normalize_label(raw) == "address")
    }
}

/// Lỗi chung khi trích xuất bảng tính.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Bảng tính không hợp lệ: {0}")]
    MalformedSheet(String),
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
}

/// Lỗi chuẩn hóa ngày của một hàng; không bao giờ làm dừng cả quá trình.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateParseError {
    #[error("cần 2 hoặc 3 thành phần ngày, nhận được {0}")]
    TokenCount(usize),
    #[error("năm không hợp lệ: {0}")]
    InvalidYear(String),
    #[error("ngày không tồn tại: {0}")]
    InvalidDate(String),
}
