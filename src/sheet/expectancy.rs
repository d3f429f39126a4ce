use chrono::NaiveDate;
use tracing::debug;

use crate::{
    config::ExpectancyConfig,
    sheet::{
        EmptyReason, MalformedReason, SheetOutcome,
        cleaner::{clean_date, clean_numeric},
        grid::{Cell, Grid},
    },
};

/// Header labels of the trade-log tab. The R column's full label carries a
/// parenthesized suffix that has changed over time, so it is matched by
/// prefix; the rest are matched exactly (several other headers *contain*
/// `損益`, e.g. the running cumulative column).
const DATE_HEADER: &str = "日期";
const PNL_HEADER: &str = "損益";
const R_HEADER_PREFIX: &str = "標準R";
const SYMBOL_HEADER: &str = "標的";
const STRATEGY_HEADER: &str = "策略";
const RISK_HEADER_PREFIX: &str = "風險";

/// Values used when the optional classification columns are absent,
/// matching the labels the workbook itself uses for unclassified trades.
pub const UNCATEGORIZED_STRATEGY: &str = "未分類";
pub const UNKNOWN_SYMBOL: &str = "未知標的";

/// One logged trade from the "expectancy" tab.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub strategy: String,
    pub symbol: String,
    pub risk_amount: Option<f64>,
    pub pnl: f64,
    pub r_multiple: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnMap {
    date: Option<usize>,
    pnl: Option<usize>,
    r_multiple: Option<usize>,
    symbol: Option<usize>,
    strategy: Option<usize>,
    risk: Option<usize>,
}

impl ColumnMap {
    fn from_row(cells: &[Cell]) -> Self {
        let mut map = Self::default();
        for (col, cell) in cells.iter().enumerate() {
            let Some(text) = cell.compact_text() else {
                continue;
            };
            if text == DATE_HEADER {
                map.date.get_or_insert(col);
            } else if text == PNL_HEADER {
                map.pnl.get_or_insert(col);
            } else if text.starts_with(R_HEADER_PREFIX) {
                map.r_multiple.get_or_insert(col);
            } else if text == SYMBOL_HEADER {
                map.symbol.get_or_insert(col);
            } else if text == STRATEGY_HEADER {
                map.strategy.get_or_insert(col);
            } else if text.starts_with(RISK_HEADER_PREFIX) {
                map.risk.get_or_insert(col);
            }
        }
        map
    }

    fn is_usable(&self) -> bool {
        self.date.is_some() && self.pnl.is_some()
    }
}

/// Parses the trade-log grid into trade records.
///
/// The header row is searched for within the scan window (a row mapping
/// both the date and P&L headers); if the search fails, the workbook's
/// historical fixed header row is tried before giving up. Zero-P&L rows
/// are scratch entries in the workbook and are dropped.
pub fn read_trade_log(grid: &Grid, cfg: &ExpectancyConfig) -> SheetOutcome<Vec<TradeRecord>> {
    let located = locate_header(grid, cfg);

    let Some((header_row, map)) = located else {
        return SheetOutcome::Malformed(MalformedReason::ColumnMappingFailed {
            missing: format!("{DATE_HEADER}/{PNL_HEADER}"),
        });
    };

    if header_row + 1 >= grid.height() {
        return SheetOutcome::Empty(EmptyReason::NoDataRows);
    }

    let records = extract(grid, header_row, &map);
    if records.is_empty() {
        return SheetOutcome::Empty(EmptyReason::NoRowsSurvived);
    }

    debug!(header_row, rows = records.len(), "Trade log parsed");
    SheetOutcome::Parsed(records)
}

fn locate_header(grid: &Grid, cfg: &ExpectancyConfig) -> Option<(usize, ColumnMap)> {
    let window = grid.height().min(cfg.scan_rows());
    for row in 0..window {
        let map = ColumnMap::from_row(grid.row(row));
        if map.is_usable() {
            return Some((row, map));
        }
    }

    let fallback_row = cfg.fallback_header_row();
    if fallback_row < grid.height() {
        let map = ColumnMap::from_row(grid.row(fallback_row));
        if map.is_usable() {
            return Some((fallback_row, map));
        }
    }

    None
}

fn extract(grid: &Grid, header_row: usize, map: &ColumnMap) -> Vec<TradeRecord> {
    let date_col = map.date.unwrap_or(0);
    let pnl_col = map.pnl.unwrap_or(1);

    (header_row + 1..grid.height())
        .filter_map(|row| {
            let date = clean_date(grid.cell(row, date_col))?;
            let pnl = clean_numeric(grid.cell(row, pnl_col))?;
            if pnl == 0.0 {
                return None;
            }

            let text_at = |col: Option<usize>| -> Option<String> {
                let cell = grid.cell(row, col?);
                match cell.compact_text() {
                    Some(t) if !t.is_empty() => Some(t),
                    _ => None,
                }
            };

            Some(TradeRecord {
                date,
                strategy: text_at(map.strategy)
                    .unwrap_or_else(|| UNCATEGORIZED_STRATEGY.to_string()),
                symbol: text_at(map.symbol).unwrap_or_else(|| UNKNOWN_SYMBOL.to_string()),
                risk_amount: map.risk.and_then(|c| clean_numeric(grid.cell(row, c))),
                pnl,
                r_multiple: map.r_multiple.and_then(|c| clean_numeric(grid.cell(row, c))),
            })
        })
        .collect()
}
