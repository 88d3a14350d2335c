//! Boundary detection and day/month/year normalization.

use std::sync::LazyLock;

use chrono::NaiveDate;
use intake_core::{Cell, DateParseError, MonthTable};
use regex::Regex;

const DEFAULT_YEAR: &str = "2000";
const CENTURY_PREFIX: &str = "20";

static FOUR_DIGIT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)[0-9]{4}(?-u:\b)").unwrap());

/// True when the cell opens a new diagnosis entry: a native date, or text
/// carrying at least two `/` separators. A single `/` never counts.
pub fn is_boundary(cell: &Cell) -> bool {
    match cell {
        Cell::Date(_) => true,
        Cell::Text(text) => text.matches('/').count() >= 2,
        Cell::Empty => false,
    }
}

/// First standalone 4-digit number found in free text. Word boundaries are
/// ASCII-only, so `né1967` and `1967年` still yield 1967.
pub fn year_only(text: &str) -> Option<i32> {
    FOUR_DIGIT_YEAR
        .find(text)
        .and_then(|found| found.as_str().parse().ok())
}

/// A normalized boundary date plus the month token that fell back to January, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    pub date: NaiveDate,
    pub month_fallback: Option<String>,
}

/// Turns boundary cells into calendar dates using a month alias table.
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer<'a> {
    months: &'a MonthTable,
}

impl<'a> DateNormalizer<'a> {
    pub fn new(months: &'a MonthTable) -> Self {
        Self { months }
    }

    pub fn normalize(&self, cell: &Cell) -> Result<NormalizedDate, DateParseError> {
        match cell {
            Cell::Date(date) => Ok(NormalizedDate {
                date: *date,
                month_fallback: None,
            }),
            Cell::Text(text) => self.normalize_text(text),
            Cell::Empty => Err(DateParseError::TokenCount(0)),
        }
    }

    fn normalize_text(&self, text: &str) -> Result<NormalizedDate, DateParseError> {
        let tokens: Vec<&str> = text
            .split('/')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();

        let (day, month, year) = match tokens.as_slice() {
            [day, month] => (*day, *month, None),
            [day, month, year] => (*day, *month, Some(*year)),
            other => return Err(DateParseError::TokenCount(other.len())),
        };

        // Unknown month text silently becomes January; the caller reports it.
        let (month_number, month_fallback) = match self.months.resolve(month) {
            Some(number) => (number, None),
            None => (1, Some(month.to_string())),
        };

        let year = match year {
            Some(raw) => century_year(raw)?,
            None => DEFAULT_YEAR.to_string(),
        };

        let composed = format!("{year}-{month_number:02}-{day:0>2}");
        let date = NaiveDate::parse_from_str(&composed, "%Y-%m-%d")
            .map_err(|_| DateParseError::InvalidDate(composed.clone()))?;

        Ok(NormalizedDate {
            date,
            month_fallback,
        })
    }
}

/// Keeps the last two characters of the year token and places them in the 2000s.
fn century_year(raw: &str) -> Result<String, DateParseError> {
    let tail_start = raw
        .char_indices()
        .rev()
        .nth(1)
        .map_or(0, |(index, _)| index);
    let year = format!("{CENTURY_PREFIX}{}", &raw[tail_start..]);

    if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
        Ok(year)
    } else {
        Err(DateParseError::InvalidYear(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn normalize(text: &str) -> Result<NormalizedDate, DateParseError> {
        let months = MonthTable::default();
        DateNormalizer::new(&months).normalize(&Cell::from(text))
    }

    #[test]
    fn boundary_needs_two_slashes_or_native_date() {
        assert!(!is_boundary(&Cell::from("12/3")));
        assert!(is_boundary(&Cell::from("12/03/24")));
        assert!(is_boundary(&Cell::Date(ymd(2024, 3, 12))));
        assert!(!is_boundary(&Cell::Empty));
        assert!(!is_boundary(&Cell::from("Name")));
    }

    #[test]
    fn day_month_year_tokens() {
        assert_eq!(normalize("01/02/23").unwrap().date, ymd(2023, 2, 1));
        assert_eq!(normalize("5/mars/2024").unwrap().date, ymd(2024, 3, 5));
        assert_eq!(normalize(" 7 / Sept / 19 ").unwrap().date, ymd(2019, 9, 7));
        assert_eq!(normalize("14/DECEMBRE/1998").unwrap().date, ymd(2098, 12, 14));
    }

    #[test]
    fn missing_year_defaults_to_2000() {
        assert_eq!(normalize("3/jun/").unwrap().date, ymd(2000, 6, 3));
        assert_eq!(normalize("//3/jun//").unwrap().date, ymd(2000, 6, 3));
    }

    #[test]
    fn unknown_month_falls_back_to_january() {
        let normalized = normalize("10/xyz/24").unwrap();
        assert_eq!(normalized.date, ymd(2024, 1, 10));
        assert_eq!(normalized.month_fallback.as_deref(), Some("xyz"));
    }

    #[test]
    fn token_count_outside_two_or_three_fails() {
        assert_eq!(normalize("1/2/3/4"), Err(DateParseError::TokenCount(4)));
        assert_eq!(normalize("//2024"), Err(DateParseError::TokenCount(1)));
    }

    #[test]
    fn impossible_dates_fail() {
        assert_eq!(
            normalize("31/04/24"),
            Err(DateParseError::InvalidDate("2024-04-31".to_string()))
        );
        assert!(matches!(
            normalize("ab/04/24"),
            Err(DateParseError::InvalidDate(_))
        ));
        assert_eq!(
            normalize("1/04/5"),
            Err(DateParseError::InvalidYear("5".to_string()))
        );
    }

    #[test]
    fn native_date_passes_through() {
        let months = MonthTable::default();
        let normalized = DateNormalizer::new(&months)
            .normalize(&Cell::Date(ymd(2021, 2, 28)))
            .unwrap();
        assert_eq!(normalized.date, ymd(2021, 2, 28));
        assert_eq!(normalized.month_fallback, None);
    }

    #[test]
    fn year_only_picks_standalone_four_digits() {
        assert_eq!(year_only("born 07/11/1967"), Some(1967));
        assert_eq!(year_only("1985-04-12"), Some(1985));
        assert_eq!(year_only("around 85"), None);
        assert_eq!(year_only("id12345"), None);
        assert_eq!(year_only("né1967"), Some(1967));
        assert_eq!(year_only("1967年"), Some(1967));
        assert_eq!(year_only("x1967"), None);
    }
}
