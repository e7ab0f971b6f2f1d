use chrono::{Datelike, Months, NaiveDate};

use crate::errors::{Result, SuiteError};
use crate::types::Frequency;

/// number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    next.pred_opt().map(|last| last.day())
}

/// `due_day` in the month of `date`, clamped to the month's last day
pub fn clamp_to_due_day(date: NaiveDate, due_day: u32) -> Result<NaiveDate> {
    let overflow = || SuiteError::CalendarOverflow { from: date };
    let last = days_in_month(date.year(), date.month()).ok_or_else(overflow)?;
    date.with_day(due_day.min(last)).ok_or_else(overflow)
}

/// next occurrence after `current`
///
/// The month moves by the frequency, the day is re-derived from `due_day`
/// so a short month does not permanently pull the schedule back
/// (31 jan -> 29 feb -> 31 mar).
pub fn advance(current: NaiveDate, frequency: Frequency, due_day: u32) -> Result<NaiveDate> {
    let target = current
        .with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(frequency.months())))
        .ok_or(SuiteError::CalendarOverflow { from: current })?;
    clamp_to_due_day(target, due_day)
}
