use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use polars::{
    frame::DataFrame,
    prelude::{
        Column, DataType, Field, IntoLazy, PlSmallStr, Schema, SchemaRef, SortMultipleOptions, col,
        lit,
    },
};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::{WarroomError, WarroomResult},
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::{column_dates, column_f64, date_column, polars_to_warroom_error},
    },
    sheet::daily::DailyRecord,
};

/// The per-day P&L ledger assembled from the monthly daily-report tabs.
///
/// Construction is where the ledger's two invariants are enforced: rows are
/// sorted by date, and duplicate dates (the same day re-read from
/// overlapping tabs) are summed into one row.
#[derive(Debug, Clone)]
pub struct DailyLedger {
    df: DataFrame,
}

impl Default for DailyLedger {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&Self::to_schema());
        Self { df }
    }
}

impl ReportName for DailyLedger {
    fn base_name(&self) -> String {
        "daily_ledger".to_string()
    }
}

impl Report for DailyLedger {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl ToSchema for DailyLedger {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = DailyLedgerCol::iter()
            .map(|col| {
                let dtype = match col {
                    DailyLedgerCol::Date => DataType::Date,
                    DailyLedgerCol::DailyPnl => DataType::Float64,
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl TryFrom<Vec<DailyRecord>> for DailyLedger {
    type Error = WarroomError;

    fn try_from(records: Vec<DailyRecord>) -> WarroomResult<Self> {
        if records.is_empty() {
            return Ok(Self::default());
        }

        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        let pnls: Vec<f64> = records.iter().map(|r| r.pnl).collect();

        let df = DataFrame::new(vec![
            date_column(DailyLedgerCol::Date.as_str(), &dates)?,
            Column::new(DailyLedgerCol::DailyPnl.name(), pnls),
        ])
        .map_err(convert_err)?
        .lazy()
        .group_by_stable([col(DailyLedgerCol::Date)])
        .agg([col(DailyLedgerCol::DailyPnl).sum()])
        .sort(
            [DailyLedgerCol::Date.as_str()],
            SortMultipleOptions::default(),
        )
        .collect()
        .map_err(convert_err)?;

        Ok(Self { df })
    }
}

impl DailyLedger {
    pub fn is_empty(&self) -> bool {
        self.df.is_empty()
    }

    /// Restricts the ledger to one calendar year.
    ///
    /// Future-dated rows are dropped only when the target year is the
    /// current one; past years keep every row as recorded.
    pub fn for_year(&self, year: i32, today: NaiveDate) -> WarroomResult<Self> {
        let mut lf = self
            .df
            .clone()
            .lazy()
            .filter(col(DailyLedgerCol::Date).dt().year().eq(lit(year)));

        if year == today.year() {
            lf = lf.filter(col(DailyLedgerCol::Date).lt_eq(lit(today)));
        }

        let df = lf.collect().map_err(convert_err)?;
        Ok(Self { df })
    }

    /// Materializes the ledger back into plain records (calendar building
    /// and chart preparation work on these).
    pub fn records(&self) -> WarroomResult<Vec<DailyRecord>> {
        let dates = column_dates(&self.df, DailyLedgerCol::Date.as_str())?;
        let pnls = column_f64(&self.df, DailyLedgerCol::DailyPnl.as_str())?;

        Ok(dates
            .into_iter()
            .zip(pnls)
            .filter_map(|(date, pnl)| pnl.map(|pnl| DailyRecord { date, pnl }))
            .collect())
    }
}

fn convert_err(e: polars::error::PolarsError) -> WarroomError {
    polars_to_warroom_error("daily ledger", e)
}

/// Columns of the daily ledger.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    PartialOrd,
    Ord,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum DailyLedgerCol {
    /// Trading day.
    Date,
    /// Net P&L realized on that day.
    DailyPnl,
}

impl From<DailyLedgerCol> for PlSmallStr {
    fn from(value: DailyLedgerCol) -> Self {
        value.as_str().into()
    }
}

impl DailyLedgerCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}
