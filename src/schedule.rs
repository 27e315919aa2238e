//! Report calendar for a daily trigger.
//!
//! A run on the first day of a month closes out the previous month; on the
//! first day of a quarter it also closes the previous quarter, and on January
//! 1st the previous year.

use crate::error::{LedgerRollupError, Result};
use crate::schema::Granularity;
use crate::statements::PeriodKey;
use chrono::{Datelike, NaiveDate};

pub use crate::utils::is_last_day_of_month;

pub fn is_last_day_of_quarter(date: NaiveDate) -> bool {
    is_last_day_of_month(date) && date.month() % 3 == 0
}

pub fn is_last_day_of_year(date: NaiveDate) -> bool {
    is_last_day_of_month(date) && date.month() == 12
}

/// Granularities whose period closed the day before `run_date`, smallest first.
pub fn due_reports(run_date: NaiveDate) -> Vec<Granularity> {
    let Some(previous_day) = run_date.pred_opt() else {
        return Vec::new();
    };

    let mut due = Vec::new();
    if is_last_day_of_month(previous_day) {
        due.push(Granularity::Monthly);
    }
    if is_last_day_of_quarter(previous_day) {
        due.push(Granularity::Quarterly);
    }
    if is_last_day_of_year(previous_day) {
        due.push(Granularity::Annual);
    }
    due
}

/// Inclusive bounds of the last complete `granularity` period before the one
/// containing `run_date`.
pub fn previous_period_window(
    run_date: NaiveDate,
    granularity: Granularity,
) -> Result<(NaiveDate, NaiveDate)> {
    let current_start = PeriodKey::for_date(run_date, granularity).start_date()?;
    let previous_end = current_start.pred_opt().ok_or_else(|| {
        LedgerRollupError::DateError(format!("No period precedes {}", current_start))
    })?;
    let previous = PeriodKey::for_date(previous_end, granularity);

    Ok((previous.start_date()?, previous.end_date()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_end_predicates() {
        assert!(is_last_day_of_quarter(ymd(2025, 3, 31)));
        assert!(is_last_day_of_quarter(ymd(2025, 9, 30)));
        assert!(!is_last_day_of_quarter(ymd(2025, 5, 31)));
        assert!(!is_last_day_of_quarter(ymd(2025, 3, 30)));
        assert!(is_last_day_of_year(ymd(2025, 12, 31)));
        assert!(!is_last_day_of_year(ymd(2025, 6, 30)));
    }

    #[test]
    fn test_due_reports() {
        assert!(due_reports(ymd(2025, 5, 14)).is_empty());
        assert_eq!(due_reports(ymd(2025, 5, 1)), vec![Granularity::Monthly]);
        assert_eq!(
            due_reports(ymd(2025, 7, 1)),
            vec![Granularity::Monthly, Granularity::Quarterly]
        );
        assert_eq!(
            due_reports(ymd(2026, 1, 1)),
            vec![Granularity::Monthly, Granularity::Quarterly, Granularity::Annual]
        );
    }

    #[test]
    fn test_previous_period_window() {
        let run = ymd(2025, 1, 1);
        assert_eq!(
            previous_period_window(run, Granularity::Monthly).unwrap(),
            (ymd(2024, 12, 1), ymd(2024, 12, 31))
        );
        assert_eq!(
            previous_period_window(run, Granularity::Quarterly).unwrap(),
            (ymd(2024, 10, 1), ymd(2024, 12, 31))
        );
        assert_eq!(
            previous_period_window(run, Granularity::Annual).unwrap(),
            (ymd(2024, 1, 1), ymd(2024, 12, 31))
        );
        assert_eq!(
            previous_period_window(ymd(2024, 3, 15), Granularity::Monthly).unwrap(),
            (ymd(2024, 2, 1), ymd(2024, 2, 29))
        );
    }
}
