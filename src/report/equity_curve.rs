use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
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
        io::{Report, ReportName, ToSchema},
        polars_ext::{column_dates, column_f64, polars_to_warroom_error},
    },
};

/// The cumulative P&L curve over a ledger, with running peak and drawdown.
///
/// Drawdown is cumulative minus running peak, so it is zero at fresh highs
/// and negative below them; its minimum is the max drawdown.
#[derive(Debug, Clone)]
pub struct EquityCurve {
    df: DataFrame,
}

impl Default for EquityCurve {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&Self::to_schema());
        Self { df }
    }
}

impl ReportName for EquityCurve {
    fn base_name(&self) -> String {
        "equity_curve".to_string()
    }
}

impl Report for EquityCurve {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl ToSchema for EquityCurve {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = EquityCurveCol::iter()
            .map(|col| {
                let dtype = match col {
                    EquityCurveCol::Date => DataType::Date,
                    EquityCurveCol::DailyPnl
                    | EquityCurveCol::CumulativePnl
                    | EquityCurveCol::Peak
                    | EquityCurveCol::Drawdown => DataType::Float64,
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl TryFrom<&DailyLedger> for EquityCurve {
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
                col(DailyLedgerCol::Date).alias(EquityCurveCol::Date),
                col(DailyLedgerCol::DailyPnl)
                    .alias(EquityCurveCol::DailyPnl)
                    .cast(DataType::Float64),
                cumulative_pnl_expr()
                    .alias(EquityCurveCol::CumulativePnl)
                    .cast(DataType::Float64),
                peak_expr().alias(EquityCurveCol::Peak).cast(DataType::Float64),
                drawdown_expr()
                    .alias(EquityCurveCol::Drawdown)
                    .cast(DataType::Float64),
            ])
            .collect()
            .map_err(convert_err)?;

        Ok(Self { df })
    }
}

impl EquityCurve {
    /// Chart-ready point series with interpolated zero crossings.
    ///
    /// Wherever the cumulative series changes sign between two days, a
    /// point with cumulative = 0 is inserted at the linearly interpolated
    /// timestamp, so an area chart can be split into profit and loss
    /// segments that meet exactly on the axis.
    pub fn zero_crossing_points(&self) -> WarroomResult<Vec<CurvePoint>> {
        let dates = column_dates(&self.df, EquityCurveCol::Date.as_str())?;
        let cumulative = column_f64(&self.df, EquityCurveCol::CumulativePnl.as_str())?;

        let mut points: Vec<CurvePoint> = dates
            .iter()
            .zip(&cumulative)
            .filter_map(|(date, cum)| {
                cum.map(|cumulative| CurvePoint {
                    timestamp: date.and_hms_opt(0, 0, 0).unwrap_or_default(),
                    cumulative,
                })
            })
            .collect();

        let mut crossings = Vec::new();
        for pair in points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if (a.cumulative > 0.0 && b.cumulative < 0.0)
                || (a.cumulative < 0.0 && b.cumulative > 0.0)
            {
                let t1 = a.timestamp.and_utc().timestamp_millis() as f64;
                let t2 = b.timestamp.and_utc().timestamp_millis() as f64;
                let zero_t = t1 + (0.0 - a.cumulative) * (t2 - t1) / (b.cumulative - a.cumulative);
                let timestamp = DateTime::from_timestamp_millis(zero_t as i64)
                    .ok_or_else(|| {
                        DataError::DateConversion(format!(
                            "interpolated crossing out of range: {zero_t}"
                        ))
                    })?
                    .naive_utc();
                crossings.push(CurvePoint {
                    timestamp,
                    cumulative: 0.0,
                });
            }
        }

        points.extend(crossings);
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

// ================================================================================================
// === Curve Expressions ===
// ================================================================================================

pub(super) fn cumulative_pnl_expr() -> Expr {
    col(DailyLedgerCol::DailyPnl).cum_sum(false)
}

pub(super) fn peak_expr() -> Expr {
    cumulative_pnl_expr().cum_max(false)
}

fn drawdown_expr() -> Expr {
    cumulative_pnl_expr() - peak_expr()
}

fn convert_err(e: polars::error::PolarsError) -> WarroomError {
    polars_to_warroom_error("equity curve", e)
}

/// One point of the rendered curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub timestamp: NaiveDateTime,
    pub cumulative: f64,
}

/// Columns of the equity curve.
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
pub enum EquityCurveCol {
    /// Trading day.
    Date,
    /// That day's P&L.
    DailyPnl,
    /// Running cumulative P&L.
    CumulativePnl,
    /// Running maximum of the cumulative series (high-water mark).
    Peak,
    /// Cumulative minus peak; zero at fresh highs, negative below them.
    Drawdown,
}

impl From<EquityCurveCol> for PlSmallStr {
    fn from(value: EquityCurveCol) -> Self {
        value.as_str().into()
    }
}

impl EquityCurveCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}
