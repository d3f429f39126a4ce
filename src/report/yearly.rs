use std::sync::Arc;

use polars::{
    frame::DataFrame,
    prelude::{DataType, Expr, Field, IntoLazy, PlSmallStr, Schema, SchemaRef, col},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::{DataError, WarroomError, WarroomResult},
    report::{
        daily_ledger::{DailyLedger, DailyLedgerCol},
        equity_curve::{cumulative_pnl_expr, peak_expr},
        io::{Report, ReportName, ToSchema},
        polars_ext::polars_to_warroom_error,
    },
};

/// Headline KPIs of one trading year, as a single-row report.
#[derive(Debug, Clone)]
pub struct YearlySummary {
    df: DataFrame,
}

impl Default for YearlySummary {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&Self::to_schema());
        Self { df }
    }
}

impl ReportName for YearlySummary {
    fn base_name(&self) -> String {
        "yearly_summary".to_string()
    }
}

impl Report for YearlySummary {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl ToSchema for YearlySummary {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = YearlySummaryCol::iter()
            .map(|col| {
                let dtype = match col {
                    YearlySummaryCol::NetPnl
                    | YearlySummaryCol::PeakPnl
                    | YearlySummaryCol::TroughPnl
                    | YearlySummaryCol::MaxDrawdown => DataType::Float64,
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl TryFrom<&DailyLedger> for YearlySummary {
    type Error = WarroomError;

    fn try_from(ledger: &DailyLedger) -> WarroomResult<Self> {
        if ledger.as_df().is_empty() {
            return Ok(Self::default());
        }

        let df = ledger
            .as_df()
            .clone()
            .lazy()
            .select([
                net_pnl_expr()
                    .alias(YearlySummaryCol::NetPnl)
                    .cast(DataType::Float64),
                peak_pnl_expr()
                    .alias(YearlySummaryCol::PeakPnl)
                    .cast(DataType::Float64),
                trough_pnl_expr()
                    .alias(YearlySummaryCol::TroughPnl)
                    .cast(DataType::Float64),
                max_drawdown_expr()
                    .alias(YearlySummaryCol::MaxDrawdown)
                    .cast(DataType::Float64),
            ])
            .collect()
            .map_err(convert_err)?;

        Ok(Self { df })
    }
}

pub struct YearlySummaryAccessor<'a> {
    df: &'a DataFrame,
}

impl YearlySummary {
    /// Creates a safe accessor for scalar value extraction.
    ///
    /// # Errors
    /// Returns an error if the report is empty; a yearly summary is always
    /// one row once data exists.
    pub fn accessor(&self) -> WarroomResult<YearlySummaryAccessor<'_>> {
        match self.df.height() {
            1 => Ok(YearlySummaryAccessor { df: &self.df }),
            0 => Err(DataError::DataFrame("Yearly summary is empty".to_string()).into()),
            n => Err(DataError::DataFrame(format!(
                "Yearly summary must be a single row (rows={n})"
            ))
            .into()),
        }
    }

    /// The summary as plain serializable values, `None` for an empty year.
    pub fn kpis(&self) -> WarroomResult<Option<YearlyKpis>> {
        if self.df.is_empty() {
            return Ok(None);
        }

        let accessor = self.accessor()?;
        let get = |metric: YearlySummaryCol| -> WarroomResult<f64> {
            accessor.get(metric).ok_or_else(|| {
                DataError::DataFrame(format!("Metric '{metric}' is null in yearly summary")).into()
            })
        };

        Ok(Some(YearlyKpis {
            net_pnl: get(YearlySummaryCol::NetPnl)?,
            peak_pnl: get(YearlySummaryCol::PeakPnl)?,
            trough_pnl: get(YearlySummaryCol::TroughPnl)?,
            max_drawdown: get(YearlySummaryCol::MaxDrawdown)?,
        }))
    }
}

impl<'a> YearlySummaryAccessor<'a> {
    /// Extracts a metric value from the single-row report.
    ///
    /// Returns `None` if the value is null.
    pub fn get(&self, metric: YearlySummaryCol) -> Option<f64> {
        self.df.column(metric.as_str()).ok()?.f64().ok()?.get(0)
    }
}

/// Plain-value form of the yearly summary for snapshot serialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyKpis {
    pub net_pnl: f64,
    pub peak_pnl: f64,
    pub trough_pnl: f64,
    pub max_drawdown: f64,
}

// ================================================================================================
// === KPI Expressions ===
// ================================================================================================

fn net_pnl_expr() -> Expr {
    col(DailyLedgerCol::DailyPnl).sum()
}

fn peak_pnl_expr() -> Expr {
    cumulative_pnl_expr().max()
}

fn trough_pnl_expr() -> Expr {
    cumulative_pnl_expr().min()
}

/// Minimum of (cumulative - running peak): the deepest peak-to-trough
/// decline, reported as a value <= 0.
fn max_drawdown_expr() -> Expr {
    (cumulative_pnl_expr() - peak_expr()).min()
}

fn convert_err(e: polars::error::PolarsError) -> WarroomError {
    polars_to_warroom_error("yearly summary", e)
}

/// Columns of the yearly summary.
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
pub enum YearlySummaryCol {
    /// Net P&L over the year (last point of the cumulative curve).
    NetPnl,
    /// Highest point of the cumulative curve.
    PeakPnl,
    /// Lowest point of the cumulative curve.
    TroughPnl,
    /// Deepest peak-to-trough decline, <= 0.
    MaxDrawdown,
}

impl From<YearlySummaryCol> for PlSmallStr {
    fn from(value: YearlySummaryCol) -> Self {
        value.as_str().into()
    }
}

impl YearlySummaryCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

// ================================================================================================
// Monthly totals
// ================================================================================================

/// Per-calendar-month P&L sums; months without any record are `None` and
/// render as a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthlyTotals([Option<f64>; 12]);

impl MonthlyTotals {
    /// Total for a 1-based calendar month.
    pub fn get(&self, month: u32) -> Option<f64> {
        self.0.get(month as usize - 1).copied().flatten()
    }

    /// 1-based months that have data, ascending.
    pub fn months_present(&self) -> Vec<u32> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(idx, total)| total.map(|_| idx as u32 + 1))
            .collect()
    }
}

impl TryFrom<&DailyLedger> for MonthlyTotals {
    type Error = WarroomError;

    fn try_from(ledger: &DailyLedger) -> WarroomResult<Self> {
        let mut totals = [None; 12];
        if ledger.as_df().is_empty() {
            return Ok(Self(totals));
        }

        let grouped = ledger
            .as_df()
            .clone()
            .lazy()
            .group_by([col(DailyLedgerCol::Date)
                .dt()
                .month()
                .cast(DataType::Int32)
                .alias("month")])
            .agg([col(DailyLedgerCol::DailyPnl).sum().alias("total")])
            .collect()
            .map_err(|e| polars_to_warroom_error("monthly totals", e))?;

        let months = grouped
            .column("month")
            .map_err(|e| DataError::DataFrame(e.to_string()))?
            .i32()
            .map_err(|e| DataError::DataFrame(e.to_string()))?;
        let sums = grouped
            .column("total")
            .map_err(|e| DataError::DataFrame(e.to_string()))?
            .f64()
            .map_err(|e| DataError::DataFrame(e.to_string()))?;

        for (month, total) in months.into_iter().zip(sums) {
            if let (Some(month @ 1..=12), Some(total)) = (month, total) {
                totals[month as usize - 1] = Some(total);
            }
        }

        Ok(Self(totals))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::sheet::daily::DailyRecord;

    fn record(y: i32, m: u32, d: u32, pnl: f64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).expect("valid test date"),
            pnl,
        }
    }

    fn reference_ledger() -> DailyLedger {
        // Daily P&L [100, -50, 200, -300, 50]:
        // cumulative [100, 50, 250, -50, 0], peak 250 at step 3,
        // trough -50 at step 4, max drawdown -300.
        DailyLedger::try_from(vec![
            record(2025, 9, 1, 100.0),
            record(2025, 9, 2, -50.0),
            record(2025, 9, 3, 200.0),
            record(2025, 9, 4, -300.0),
            record(2025, 9, 5, 50.0),
        ])
        .expect("ledger builds")
    }

    // ========================================================================
    // Yearly KPIs
    // ========================================================================

    #[test]
    fn test_reference_sequence_kpis() {
        let summary = YearlySummary::try_from(&reference_ledger()).expect("summary builds");
        let kpis = summary
            .kpis()
            .expect("kpis extract")
            .expect("summary is non-empty");

        assert_eq!(kpis.net_pnl, 0.0);
        assert_eq!(kpis.peak_pnl, 250.0);
        assert_eq!(kpis.trough_pnl, -50.0);
        assert_eq!(kpis.max_drawdown, -300.0, "Peak-to-trough: -50 - 250");
    }

    #[test]
    fn test_max_drawdown_is_never_positive() {
        let rising = DailyLedger::try_from(vec![
            record(2025, 1, 2, 10.0),
            record(2025, 1, 3, 20.0),
        ])
        .expect("ledger builds");

        let summary = YearlySummary::try_from(&rising).expect("summary builds");
        let kpis = summary.kpis().expect("kpis").expect("non-empty");
        assert_eq!(
            kpis.max_drawdown, 0.0,
            "A monotonically rising curve has zero drawdown"
        );
    }

    #[test]
    fn test_empty_ledger_has_no_kpis() {
        let summary =
            YearlySummary::try_from(&DailyLedger::default()).expect("summary builds");
        assert!(summary.kpis().expect("kpis").is_none());
        assert!(summary.accessor().is_err());
    }

    // ========================================================================
    // Monthly totals
    // ========================================================================

    #[test]
    fn test_monthly_totals_with_placeholders() {
        let ledger = DailyLedger::try_from(vec![
            record(2025, 1, 10, 100.0),
            record(2025, 1, 20, -30.0),
            record(2025, 3, 5, 50.0),
        ])
        .expect("ledger builds");

        let totals = MonthlyTotals::try_from(&ledger).expect("totals build");
        assert_eq!(totals.get(1), Some(70.0));
        assert_eq!(totals.get(2), None, "February has no data: placeholder");
        assert_eq!(totals.get(3), Some(50.0));
        assert_eq!(totals.months_present(), vec![1, 3]);
    }

    #[test]
    fn test_monthly_totals_of_empty_ledger() {
        let totals = MonthlyTotals::try_from(&DailyLedger::default()).expect("totals build");
        assert!(totals.months_present().is_empty());
    }
}
