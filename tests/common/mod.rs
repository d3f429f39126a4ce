use warroom::{
    error::{SheetError, WarroomResult},
    sheet::grid::{Cell, Grid},
    workbook::SheetSource,
};

/// An in-memory sheet source standing in for a downloaded workbook.
pub struct FakeWorkbook {
    sheets: Vec<(String, Grid)>,
}

impl FakeWorkbook {
    pub fn new() -> Self {
        Self { sheets: Vec::new() }
    }

    pub fn with_sheet(mut self, name: &str, grid: Grid) -> Self {
        self.sheets.push((name.to_string(), grid));
        self
    }
}

impl SheetSource for FakeWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn grid(&self, sheet: &str) -> WarroomResult<Grid> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, grid)| grid.clone())
            .ok_or_else(|| SheetError::SheetNotFound(sheet.to_string()).into())
    }
}

pub fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

pub fn num(v: f64) -> Cell {
    Cell::Number(v)
}

/// A monthly daily-report tab in the keyword layout: a banner, a header
/// row with `日總計`, then `(date, pnl)` rows.
pub fn monthly_tab(rows: &[(&str, f64)]) -> Grid {
    let mut grid = vec![vec![Cell::Empty; 6]; 2 + rows.len()];
    grid[0][0] = text("戰情日報");
    grid[1][0] = text("日期");
    grid[1][4] = text("日總計");
    for (idx, (date, pnl)) in rows.iter().enumerate() {
        grid[2 + idx][0] = text(date);
        grid[2 + idx][4] = num(*pnl);
    }
    Grid::new(grid)
}

/// A monthly tab in the legacy fixed layout: no keyword anywhere, dates in
/// column 0 and P&L in column 7 starting at row 6.
pub fn legacy_monthly_tab(rows: &[(&str, f64)]) -> Grid {
    let mut grid = vec![vec![Cell::Empty; 9]; 6 + rows.len()];
    for (idx, (date, pnl)) in rows.iter().enumerate() {
        grid[6 + idx][0] = text(date);
        grid[6 + idx][7] = num(*pnl);
    }
    Grid::new(grid)
}

/// The trade-log tab: decorative rows above a header at the workbook's
/// historical row 14, then trade rows.
pub fn trade_log_tab(rows: &[(&str, &str, &str, f64, f64, f64)]) -> Grid {
    let mut grid = vec![vec![Cell::Empty; 7]; 15 + rows.len()];
    grid[0][0] = text("期望值紀錄");
    grid[14] = vec![
        text("日期"),
        text("策略"),
        text("標的"),
        text("風險金額"),
        text("損益"),
        text("標準R(盈虧比)"),
        Cell::Empty,
    ];
    for (idx, (date, strategy, symbol, risk, pnl, r)) in rows.iter().enumerate() {
        grid[15 + idx] = vec![
            text(date),
            text(strategy),
            text(symbol),
            num(*risk),
            num(*pnl),
            num(*r),
            Cell::Empty,
        ];
    }
    Grid::new(grid)
}

/// The running-total tab: the cumulative header in row 1, one value per
/// row below it.
pub fn running_total_tab(series: &[f64]) -> Grid {
    let mut grid = vec![vec![Cell::Empty; 3]; 2 + series.len()];
    grid[1][1] = text("累積損益");
    for (idx, value) in series.iter().enumerate() {
        grid[2 + idx][1] = num(*value);
    }
    Grid::new(grid)
}
