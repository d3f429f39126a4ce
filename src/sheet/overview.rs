use tracing::debug;

use crate::sheet::{
    EmptyReason, MalformedReason, SheetOutcome, cleaner::clean_numeric, grid::Grid,
};

/// Rows scanned for the cumulative-P&L header in the running-total tab.
const HEADER_SCAN_ROWS: usize = 10;

/// The historical equity series from the running-total tab.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningTotal {
    series: Vec<f64>,
}

impl RunningTotal {
    pub fn series(&self) -> &[f64] {
        &self.series
    }

    /// The headline metric: latest cumulative equity.
    pub fn latest(&self) -> f64 {
        *self.series.last().unwrap_or(&0.0)
    }
}

/// Parses the running-total tab: finds the column whose header contains the
/// cumulative marker within the first few rows, then numeric-cleans
/// everything below it into the equity series.
pub fn read_running_total(grid: &Grid, marker: &str) -> SheetOutcome<RunningTotal> {
    let located = (0..grid.height().min(HEADER_SCAN_ROWS)).find_map(|row| {
        grid.row(row).iter().enumerate().find_map(|(col, cell)| {
            cell.compact_text()
                .filter(|text| text.contains(marker))
                .map(|_| (row, col))
        })
    });

    let Some((header_row, col)) = located else {
        return SheetOutcome::Malformed(MalformedReason::MarkerNotFound {
            marker: marker.to_string(),
        });
    };

    if header_row + 1 >= grid.height() {
        return SheetOutcome::Empty(EmptyReason::NoDataRows);
    }

    let series: Vec<f64> = (header_row + 1..grid.height())
        .filter_map(|row| clean_numeric(grid.cell(row, col)))
        .collect();

    if series.is_empty() {
        return SheetOutcome::Empty(EmptyReason::NoRowsSurvived);
    }

    debug!(header_row, col, points = series.len(), "Running total parsed");
    SheetOutcome::Parsed(RunningTotal { series })
}
