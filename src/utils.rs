use crate::error::{LedgerRollupError, Result};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Monetary outputs are rounded to cents, midpoints to the nearest even digit.
pub const MONEY_DP: u32 = 2;

/// Largest accepted transaction magnitude. Keeps every period and balance sum
/// far inside the range `Decimal` can add without overflowing.
pub const MAX_ABS_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%d-%b-%Y"];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp(MONEY_DP)
}

pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        LedgerRollupError::DateError(format!("Invalid calendar month {:04}-{:02}", year, month))
    })
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    first_day_of_month(next_year, next_month)?
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| {
            LedgerRollupError::DateError(format!(
                "No last day for calendar month {:04}-{:02}",
                year, month
            ))
        })
}

/// Calendar quarter (1-4) containing `month`.
pub fn quarter_of_month(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

pub fn first_month_of_quarter(quarter: u32) -> u32 {
    (quarter - 1) * 3 + 1
}

/// Parses a strict `YYYY-MM-DD` date, as accepted on the command line.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        LedgerRollupError::DateError(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD",
            value
        ))
    })
}

/// Best-effort date parsing for spreadsheet cells. Returns `None` when no
/// supported layout matches.
pub fn parse_date_lenient(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .map(|datetime| datetime.date_naive())
        .ok()
}

/// Best-effort amount parsing. Accepts currency symbols, thousands separators,
/// a leading sign and accounting negatives such as `(12.50)`.
pub fn parse_amount_lenient(value: &str) -> Option<Decimal> {
    let mut text = value.trim();
    if text.is_empty() {
        return None;
    }

    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') {
        negative = true;
        text = &text[1..text.len() - 1];
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' ' | '\u{a0}'))
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return None;
    }

    let parsed = Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .ok()?;

    Some(if negative { -parsed.abs() } else { parsed })
}

pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2023, 2).unwrap(), ymd(2023, 2, 28));
        assert_eq!(last_day_of_month(2024, 2).unwrap(), ymd(2024, 2, 29));
        assert_eq!(last_day_of_month(2023, 4).unwrap(), ymd(2023, 4, 30));
        assert_eq!(last_day_of_month(2023, 12).unwrap(), ymd(2023, 12, 31));
        assert!(last_day_of_month(2023, 13).is_err());
    }

    #[test]
    fn test_quarter_helpers() {
        assert_eq!(quarter_of_month(1), 1);
        assert_eq!(quarter_of_month(3), 1);
        assert_eq!(quarter_of_month(4), 2);
        assert_eq!(quarter_of_month(12), 4);
        assert_eq!(first_month_of_quarter(1), 1);
        assert_eq!(first_month_of_quarter(4), 10);
    }

    #[test]
    fn test_parse_date_lenient_layouts() {
        let expected = ymd(2025, 3, 7);
        assert_eq!(parse_date_lenient("2025-03-07"), Some(expected));
        assert_eq!(parse_date_lenient("2025/03/07"), Some(expected));
        assert_eq!(parse_date_lenient("03/07/2025"), Some(expected));
        assert_eq!(parse_date_lenient("07.03.2025"), Some(expected));
        assert_eq!(parse_date_lenient("2025-03-07 14:30:00"), Some(expected));
        assert_eq!(parse_date_lenient("2025-03-07T14:30:00"), Some(expected));
        assert_eq!(parse_date_lenient("2025-03-07T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_date_lenient(" "), None);
        assert_eq!(parse_date_lenient("not a date"), None);
        assert_eq!(parse_date_lenient("2025-02-30"), None);
    }

    #[test]
    fn test_parse_amount_lenient() {
        assert_eq!(parse_amount_lenient("12.50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_amount_lenient("-7"), Some(Decimal::from(-7)));
        assert_eq!(parse_amount_lenient("+7"), Some(Decimal::from(7)));
        assert_eq!(
            parse_amount_lenient("$1,234.56"),
            Some(Decimal::new(123456, 2))
        );
        assert_eq!(parse_amount_lenient("(12.50)"), Some(Decimal::new(-1250, 2)));
        assert_eq!(parse_amount_lenient("1e3"), Some(Decimal::from(1000)));
        assert_eq!(parse_amount_lenient(""), None);
        assert_eq!(parse_amount_lenient("abc"), None);
        assert_eq!(parse_amount_lenient("NaN"), None);
    }

    #[test]
    fn test_max_abs_amount_is_one_quadrillion() {
        assert_eq!(MAX_ABS_AMOUNT, Decimal::new(1_000_000_000_000_000, 0));
    }

    #[test]
    fn test_round_money_half_even() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1234, 2));
        assert_eq!(round_money(Decimal::new(12355, 3)), Decimal::new(1236, 2));
        assert_eq!(round_money(Decimal::new(-10, 0)), Decimal::from(-10));
    }

    #[test]
    fn test_is_last_day_of_month() {
        assert!(is_last_day_of_month(ymd(2024, 2, 29)));
        assert!(!is_last_day_of_month(ymd(2023, 2, 27)));
        assert!(is_last_day_of_month(ymd(2023, 12, 31)));
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2025-01-31").unwrap(), ymd(2025, 1, 31));
        assert!(parse_iso_date("01/31/2025").is_err());
    }
}
