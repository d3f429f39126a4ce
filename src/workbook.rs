use std::io::Cursor;

use calamine::{Data, Range, Reader, Xlsx};

use crate::{
    error::{SheetError, WarroomResult},
    sheet::grid::{Cell, Grid},
};

pub mod cache;
pub mod fetcher;

/// The seam between sheet access and everything downstream.
///
/// Parsing and aggregation only ever see sheet names and cell grids, so
/// tests drive the full pipeline with in-memory fakes instead of xlsx
/// fixtures.
pub trait SheetSource {
    fn sheet_names(&self) -> Vec<String>;

    /// The full cell grid of one sheet, at absolute coordinates (leading
    /// empty rows/columns preserved, so fixed-offset locations line up).
    fn grid(&self, sheet: &str) -> WarroomResult<Grid>;
}

/// An xlsx workbook, fully materialized in memory.
///
/// The export is a few hundred kilobytes at most, so every sheet range is
/// read eagerly at open time; downstream access is then immutable and
/// infallible except for unknown sheet names.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<(String, Range<Data>)>,
}

impl Workbook {
    pub fn open(bytes: Vec<u8>) -> WarroomResult<Self> {
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| SheetError::InvalidWorkbook(e.to_string()))?;

        let names = xlsx.sheet_names().to_owned();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = xlsx
                .worksheet_range(&name)
                .map_err(|e| SheetError::ReadFailed {
                    sheet: name.clone(),
                    msg: e.to_string(),
                })?;
            sheets.push((name, range));
        }

        Ok(Self { sheets })
    }
}

impl SheetSource for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn grid(&self, sheet: &str) -> WarroomResult<Grid> {
        let range = self
            .sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, range)| range)
            .ok_or_else(|| SheetError::SheetNotFound(sheet.to_string()))?;

        Ok(range_to_grid(range))
    }
}

/// Converts a calamine range into an absolute-coordinate grid.
///
/// Calamine ranges are anchored at their top-left used cell; the grid pads
/// the leading rows and columns back in so that cell `(r, c)` means the
/// same thing here as in the spreadsheet UI.
fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((start_row, start_col)) = range.start() else {
        return Grid::default();
    };

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(start_row as usize + range.height());
    rows.resize(start_row as usize, Vec::new());

    for row in range.rows() {
        let mut cells = Vec::with_capacity(start_col as usize + row.len());
        cells.resize(start_col as usize, Cell::Empty);
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }

    Grid::new(rows)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) | Data::DurationIso(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or(Cell::Empty),
        // Some exporters write dates as ISO text; the cleaner handles it.
        Data::DateTimeIso(s) => Cell::Text(s.clone()),
    }
}
