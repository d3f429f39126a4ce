use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{config::LocatorConfig, sheet::grid::Grid};

/// Which step of the locator chain produced a hit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum LocateStrategy {
    /// A keyword substring matched a header cell.
    KeywordScan,
    /// No keyword matched; the configured fixed coordinates were used.
    FixedOffset,
}

/// Location of the P&L column within a daily-report sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlColumnLocation {
    pub header_row: usize,
    pub pnl_col: usize,
    pub strategy: LocateStrategy,
}

impl PnlColumnLocation {
    /// First row holding data.
    ///
    /// A keyword hit marks a header row, so data starts one row below it.
    /// The fixed-offset fallback points directly at the first data row (the
    /// workbook's fixed layout has no reliable header above it).
    pub fn first_data_row(&self) -> usize {
        match self.strategy {
            LocateStrategy::KeywordScan => self.header_row + 1,
            LocateStrategy::FixedOffset => self.header_row,
        }
    }
}

/// Locates the P&L column via the strategy chain: keyword scan, then fixed
/// offset. Returns `None` when neither strategy applies; the caller reports
/// the sheet malformed.
pub fn locate_pnl_column(grid: &Grid, cfg: &LocatorConfig) -> Option<PnlColumnLocation> {
    if let Some((header_row, pnl_col)) = keyword_scan(grid, cfg) {
        return Some(PnlColumnLocation {
            header_row,
            pnl_col,
            strategy: LocateStrategy::KeywordScan,
        });
    }

    fixed_offset(grid, cfg)
}

/// Scans rows top-to-bottom and columns left-to-right for the first cell
/// whose whitespace-stripped text contains a configured keyword.
fn keyword_scan(grid: &Grid, cfg: &LocatorConfig) -> Option<(usize, usize)> {
    let window = grid.height().min(cfg.scan_rows());
    for row in 0..window {
        for (col, cell) in grid.row(row).iter().enumerate() {
            let Some(text) = cell.compact_text() else {
                continue;
            };
            if cfg.keywords().iter().any(|k| text.contains(k.as_str())) {
                return Some((row, col));
            }
        }
    }
    None
}

/// The fixed-coordinate fallback applies only when the grid actually extends
/// past the configured cell in both dimensions.
fn fixed_offset(grid: &Grid, cfg: &LocatorConfig) -> Option<PnlColumnLocation> {
    let (row, col) = cfg.fallback();
    if grid.height() > row && grid.width() > col {
        Some(PnlColumnLocation {
            header_row: row,
            pnl_col: col,
            strategy: LocateStrategy::FixedOffset,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::grid::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn blank_grid(rows: usize, cols: usize) -> Vec<Vec<Cell>> {
        vec![vec![Cell::Empty; cols]; rows]
    }

    fn cfg() -> LocatorConfig {
        LocatorConfig::default()
    }

    // ========================================================================
    // Keyword scan
    // ========================================================================

    #[test]
    fn test_keyword_cell_fixes_header_row_and_column() {
        let mut rows = blank_grid(10, 10);
        rows[3][5] = text("日總計");
        let grid = Grid::new(rows);

        let loc = locate_pnl_column(&grid, &cfg()).expect("keyword must be found");
        assert_eq!((loc.header_row, loc.pnl_col), (3, 5));
        assert_eq!(loc.strategy, LocateStrategy::KeywordScan);
        assert_eq!(loc.first_data_row(), 4);
    }

    #[test]
    fn test_keyword_matches_with_embedded_whitespace() {
        let mut rows = blank_grid(10, 10);
        rows[2][4] = text("日 總 計");
        let grid = Grid::new(rows);

        let loc = locate_pnl_column(&grid, &cfg()).expect("keyword must be found");
        assert_eq!((loc.header_row, loc.pnl_col), (2, 4));
    }

    #[test]
    fn test_first_match_wins_scan_order() {
        // Two keyword cells; the scan is rows top-to-bottom, then columns
        // left-to-right, so (1, 2) must win over (1, 6) and (4, 0).
        let mut rows = blank_grid(10, 10);
        rows[1][6] = text("總計");
        rows[1][2] = text("損益");
        rows[4][0] = text("累計損益");
        let grid = Grid::new(rows);

        let loc = locate_pnl_column(&grid, &cfg()).expect("keyword must be found");
        assert_eq!((loc.header_row, loc.pnl_col), (1, 2));
    }

    #[test]
    fn test_keyword_outside_scan_window_is_ignored() {
        let narrow = LocatorConfig::new(vec!["總計".to_string()], 5, (6, 7)).expect("valid cfg");
        let mut rows = blank_grid(12, 10);
        rows[8][3] = text("總計");
        let grid = Grid::new(rows);

        let loc = locate_pnl_column(&grid, &narrow).expect("fallback applies");
        assert_eq!(loc.strategy, LocateStrategy::FixedOffset);
    }

    // ========================================================================
    // Fixed-offset fallback
    // ========================================================================

    #[test]
    fn test_no_keyword_falls_back_to_fixed_cell() {
        let grid = Grid::new(blank_grid(7, 8));
        let loc = locate_pnl_column(&grid, &cfg()).expect("fallback must apply");
        assert_eq!((loc.header_row, loc.pnl_col), (6, 7));
        assert_eq!(loc.strategy, LocateStrategy::FixedOffset);
        // Row 6 is the first data row in the fixed layout.
        assert_eq!(loc.first_data_row(), 6);
    }

    #[test]
    fn test_grid_too_small_for_fallback_fails() {
        // 6 rows: the fallback cell (6, 7) does not exist.
        let grid = Grid::new(blank_grid(6, 8));
        assert!(locate_pnl_column(&grid, &cfg()).is_none());

        // 7 columns: same, one short.
        let grid = Grid::new(blank_grid(7, 7));
        assert!(locate_pnl_column(&grid, &cfg()).is_none());
    }
}
