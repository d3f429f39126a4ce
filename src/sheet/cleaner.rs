use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::sheet::grid::Cell;

/// Text date formats observed across the workbook's history.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Coerces a cell to a float.
///
/// Text values are stripped of thousands separators and surrounding
/// whitespace before parsing; anything unparseable is null.
pub fn clean_numeric(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => {
            let compact: String = s.chars().filter(|c| !c.is_whitespace() && *c != ',').collect();
            if compact.is_empty() {
                return None;
            }
            compact.parse::<f64>().ok()
        }
        Cell::Empty | Cell::Bool(_) | Cell::DateTime(_) => None,
    }
}

/// Coerces a cell to a calendar date.
///
/// Native datetime cells pass through; bare numbers are treated as Excel
/// serial dates; text is tried against the formats the workbook has used.
/// Anything unparseable is null.
pub fn clean_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Number(serial) => excel_serial_to_date(*serial),
        Cell::Text(s) => parse_date_text(s.trim()),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// Excel serial date: days since 1899-12-30 (the offset absorbs the
/// fictitious 1900-02-29 the format inherited from Lotus 1-2-3).
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.trunc() as u64;
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    // ========================================================================
    // Numeric cleaning
    // ========================================================================

    #[test]
    fn test_numeric_passthrough() {
        assert_eq!(clean_numeric(&Cell::Number(-1250.5)), Some(-1250.5));
    }

    #[test]
    fn test_numeric_strips_thousands_separators_and_whitespace() {
        assert_eq!(
            clean_numeric(&Cell::Text(" 12,345.75 ".to_string())),
            Some(12345.75)
        );
        assert_eq!(
            clean_numeric(&Cell::Text("-1,000".to_string())),
            Some(-1000.0)
        );
    }

    #[test]
    fn test_numeric_invalid_is_null() {
        assert_eq!(clean_numeric(&Cell::Text("總計".to_string())), None);
        assert_eq!(clean_numeric(&Cell::Text("".to_string())), None);
        assert_eq!(clean_numeric(&Cell::Empty), None);
        assert_eq!(clean_numeric(&Cell::Bool(true)), None);
    }

    // ========================================================================
    // Date cleaning
    // ========================================================================

    #[test]
    fn test_date_from_native_datetime() {
        let dt = date(2025, 9, 1).and_hms_opt(10, 30, 0).expect("valid time");
        assert_eq!(clean_date(&Cell::DateTime(dt)), Some(date(2025, 9, 1)));
    }

    #[test]
    fn test_date_from_excel_serial() {
        // 45292 = 2024-01-01 in the 1900 date system.
        assert_eq!(
            clean_date(&Cell::Number(45292.0)),
            Some(date(2024, 1, 1))
        );
        // Fractional part (time of day) is ignored.
        assert_eq!(
            clean_date(&Cell::Number(45292.75)),
            Some(date(2024, 1, 1))
        );
    }

    #[test]
    fn test_date_from_text_variants() {
        for raw in ["2025-09-01", "2025/09/01", "2025.09.01", "09/01/2025"] {
            assert_eq!(
                clean_date(&Cell::Text(raw.to_string())),
                Some(date(2025, 9, 1)),
                "Failed to parse '{raw}'"
            );
        }
        assert_eq!(
            clean_date(&Cell::Text("2025-09-01 14:30:00".to_string())),
            Some(date(2025, 9, 1))
        );
    }

    #[test]
    fn test_date_invalid_is_null() {
        assert_eq!(clean_date(&Cell::Text("小計".to_string())), None);
        assert_eq!(clean_date(&Cell::Number(-3.0)), None);
        assert_eq!(clean_date(&Cell::Number(f64::NAN)), None);
        assert_eq!(clean_date(&Cell::Empty), None);
    }
}
