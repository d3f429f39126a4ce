use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DataError, WarroomResult},
    report::daily_ledger::DailyLedger,
};

/// One cell of the calendar: a day of the month and its recorded P&L, if
/// the ledger has a row for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day: u32,
    pub pnl: Option<f64>,
}

/// One Sunday-first week row with its summary card.
///
/// A day counts as "active" when it carries a non-zero P&L; the week P&L
/// sums exactly those days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarWeek {
    pub days: [Option<CalendarDay>; 7],
    pub pnl: f64,
    pub active_days: usize,
}

/// Month-level stats shown above the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    /// Net P&L over the month.
    pub net_pnl: f64,
    /// Days with positive P&L over all recorded days.
    pub day_win_rate: f64,
    /// Best single day, 0 when the month has no winning day.
    pub best_day: f64,
    /// Worst single day, 0 when the month has no losing day.
    pub worst_day: f64,
    /// Number of recorded days.
    pub trading_days: usize,
}

/// A month of the trading calendar heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<CalendarWeek>,
    pub stats: MonthlyStats,
}

/// Builds the calendar for one month out of the ledger.
pub fn calendar_month(
    ledger: &DailyLedger,
    year: i32,
    month: u32,
) -> WarroomResult<CalendarMonth> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(DataError::InvalidCalendarMonth { year, month })?;

    let pnl_by_day: BTreeMap<u32, f64> = ledger
        .records()?
        .into_iter()
        .filter(|r| r.date.year() == year && r.date.month() == month)
        .map(|r| (r.date.day(), r.pnl))
        .collect();

    let stats = month_stats(&pnl_by_day);
    let weeks = build_weeks(first, &pnl_by_day);

    Ok(CalendarMonth {
        year,
        month,
        weeks,
        stats,
    })
}

fn month_stats(pnl_by_day: &BTreeMap<u32, f64>) -> MonthlyStats {
    let trading_days = pnl_by_day.len();
    let net_pnl: f64 = pnl_by_day.values().sum();
    let win_days = pnl_by_day.values().filter(|pnl| **pnl > 0.0).count();

    let day_win_rate = if trading_days > 0 {
        win_days as f64 / trading_days as f64
    } else {
        0.0
    };

    let best_day = pnl_by_day
        .values()
        .copied()
        .filter(|pnl| *pnl > 0.0)
        .fold(0.0, f64::max);
    let worst_day = pnl_by_day
        .values()
        .copied()
        .filter(|pnl| *pnl < 0.0)
        .fold(0.0, f64::min);

    MonthlyStats {
        net_pnl,
        day_win_rate,
        best_day,
        worst_day,
        trading_days,
    }
}

fn build_weeks(first: NaiveDate, pnl_by_day: &BTreeMap<u32, f64>) -> Vec<CalendarWeek> {
    let days_in_month = days_in_month(first);
    let leading_blanks = first.weekday().num_days_from_sunday() as usize;

    let mut weeks = Vec::new();
    let mut current: [Option<CalendarDay>; 7] = [None; 7];
    let mut slot = leading_blanks;

    for day in 1..=days_in_month {
        current[slot] = Some(CalendarDay {
            day,
            pnl: pnl_by_day.get(&day).copied(),
        });
        slot += 1;
        if slot == 7 {
            weeks.push(close_week(current));
            current = [None; 7];
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(close_week(current));
    }

    weeks
}

fn close_week(days: [Option<CalendarDay>; 7]) -> CalendarWeek {
    let mut pnl = 0.0;
    let mut active_days = 0;
    for day in days.iter().flatten() {
        if let Some(day_pnl) = day.pnl
            && day_pnl != 0.0
        {
            pnl += day_pnl;
            active_days += 1;
        }
    }
    CalendarWeek {
        days,
        pnl,
        active_days,
    }
}

fn days_in_month(first: NaiveDate) -> u32 {
    let (next_year, next_month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|next| next.signed_duration_since(first).num_days() as u32)
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::daily::DailyRecord;

    fn record(y: i32, m: u32, d: u32, pnl: f64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).expect("valid test date"),
            pnl,
        }
    }

    fn september_ledger() -> DailyLedger {
        DailyLedger::try_from(vec![
            record(2025, 9, 1, 1000.0),
            record(2025, 9, 2, -400.0),
            record(2025, 9, 8, 250.0),
            // Another month: must not leak into September.
            record(2025, 10, 1, 9999.0),
        ])
        .expect("ledger builds")
    }

    // ========================================================================
    // Layout
    // ========================================================================

    #[test]
    fn test_sunday_first_layout() {
        // September 2025 starts on a Monday: slot 1 of the first week.
        let cal = calendar_month(&september_ledger(), 2025, 9).expect("calendar builds");

        let first_week = &cal.weeks[0];
        assert!(first_week.days[0].is_none(), "Sunday slot is blank");
        assert_eq!(first_week.days[1].expect("monday cell").day, 1);

        // 30 days starting Monday: 5 week rows.
        assert_eq!(cal.weeks.len(), 5);
        let last_week = cal.weeks.last().expect("weeks non-empty");
        assert_eq!(last_week.days[1].expect("last monday").day, 29);
        assert!(last_week.days[3].is_none(), "October does not bleed in");
    }

    #[test]
    fn test_day_cells_carry_ledger_pnl() {
        let cal = calendar_month(&september_ledger(), 2025, 9).expect("calendar builds");

        let day1 = cal.weeks[0].days[1].expect("day 1 cell");
        assert_eq!(day1.pnl, Some(1000.0));

        let day3 = cal.weeks[0].days[3].expect("day 3 cell");
        assert_eq!(day3.pnl, None, "Unrecorded days carry no P&L");
    }

    // ========================================================================
    // Week summaries
    // ========================================================================

    #[test]
    fn test_week_summary_counts_active_days() {
        let cal = calendar_month(&september_ledger(), 2025, 9).expect("calendar builds");

        let first_week = &cal.weeks[0];
        assert_eq!(first_week.active_days, 2);
        assert!((first_week.pnl - 600.0).abs() < 1e-9);

        let second_week = &cal.weeks[1];
        assert_eq!(second_week.active_days, 1);
        assert!((second_week.pnl - 250.0).abs() < 1e-9);
    }

    // ========================================================================
    // Month stats
    // ========================================================================

    #[test]
    fn test_month_stats() {
        let cal = calendar_month(&september_ledger(), 2025, 9).expect("calendar builds");

        assert_eq!(cal.stats.trading_days, 3);
        assert!((cal.stats.net_pnl - 850.0).abs() < 1e-9);
        assert!((cal.stats.day_win_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(cal.stats.best_day, 1000.0);
        assert_eq!(cal.stats.worst_day, -400.0);
    }

    #[test]
    fn test_month_without_records_has_zeroed_stats() {
        let cal = calendar_month(&september_ledger(), 2025, 2).expect("calendar builds");
        assert_eq!(cal.stats.trading_days, 0);
        assert_eq!(cal.stats.day_win_rate, 0.0);
        assert_eq!(cal.stats.best_day, 0.0);
        assert_eq!(cal.stats.worst_day, 0.0);
    }

    #[test]
    fn test_invalid_month_is_an_error() {
        let result = calendar_month(&september_ledger(), 2025, 13);
        assert!(result.is_err());
    }
}
