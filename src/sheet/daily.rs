use chrono::NaiveDate;
use tracing::debug;

use crate::{
    config::LocatorConfig,
    sheet::{
        EmptyReason, MalformedReason, SheetOutcome,
        cleaner::{clean_date, clean_numeric},
        grid::Grid,
        locator::{LocateStrategy, PnlColumnLocation, locate_pnl_column},
    },
};

/// One trading day from a monthly daily-report tab.
///
/// Uniqueness per date is not enforced here; the ledger sums duplicates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub pnl: f64,
}

/// Parses a monthly daily-report grid into daily records.
///
/// Column 0 is always the date; the P&L column comes from the locator
/// chain. A keyword hit that yields no usable rows falls through to the
/// fixed-offset layout, mirroring how the workbook's older tabs put the
/// keyword in a decorative banner above a fixed table.
pub fn read_daily_pnl(grid: &Grid, cfg: &LocatorConfig) -> SheetOutcome<Vec<DailyRecord>> {
    let Some(location) = locate_pnl_column(grid, cfg) else {
        return SheetOutcome::Malformed(MalformedReason::HeaderNotFound);
    };

    let records = extract(grid, &location);
    if !records.is_empty() {
        debug!(
            strategy = %location.strategy,
            rows = records.len(),
            "Daily tab parsed"
        );
        return SheetOutcome::Parsed(records);
    }

    // Keyword hit but nothing survived: retry on the fixed layout before
    // declaring the tab empty.
    if location.strategy == LocateStrategy::KeywordScan {
        let (row, col) = cfg.fallback();
        if grid.height() > row && grid.width() > col {
            let fallback = PnlColumnLocation {
                header_row: row,
                pnl_col: col,
                strategy: LocateStrategy::FixedOffset,
            };
            let records = extract(grid, &fallback);
            if !records.is_empty() {
                debug!(rows = records.len(), "Daily tab parsed via fixed offset");
                return SheetOutcome::Parsed(records);
            }
        }
    }

    if location.first_data_row() >= grid.height() {
        SheetOutcome::Empty(EmptyReason::NoDataRows)
    } else {
        SheetOutcome::Empty(EmptyReason::NoRowsSurvived)
    }
}

fn extract(grid: &Grid, location: &PnlColumnLocation) -> Vec<DailyRecord> {
    (location.first_data_row()..grid.height())
        .filter_map(|row| {
            let date = clean_date(grid.cell(row, 0))?;
            let pnl = clean_numeric(grid.cell(row, location.pnl_col))?;
            Some(DailyRecord { date, pnl })
        })
        .collect()
}
