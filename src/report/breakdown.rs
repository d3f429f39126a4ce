use std::sync::Arc;

use polars::{
    frame::DataFrame,
    prelude::{
        DataType, Expr, Field, IntoLazy, LazyGroupBy, PlSmallStr, Schema, SchemaRef,
        SortMultipleOptions, UnionArgs, col, len, lit,
    },
};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::{DataError, WarroomError, WarroomResult},
    report::{
        io::{Report, ReportName, ToSchema, generate_dynamic_base_name},
        polars_ext::polars_to_warroom_error,
        trade_log::{TradeLog, TradeLogCol},
    },
};

/// A trade log in a "grouped" state; reports computed from it return one
/// row per group.
pub struct GroupedTradeLog<'a> {
    log: &'a TradeLog,
    group_keys: Vec<GroupCol>,
}

impl TradeLog {
    pub fn grouped_by(&self, keys: impl IntoIterator<Item = GroupCol>) -> GroupedTradeLog<'_> {
        GroupedTradeLog {
            log: self,
            group_keys: keys.into_iter().collect(),
        }
    }
}

impl<'a> GroupedTradeLog<'a> {
    /// Access raw Polars lazy API for custom queries.
    pub fn lazy(&self) -> LazyGroupBy {
        let group_cols: Vec<Expr> = self.group_keys.iter().map(GroupCol::as_expr).collect();
        self.log.as_df().clone().lazy().group_by(group_cols)
    }

    pub fn breakdown(&self) -> WarroomResult<Breakdown> {
        self.try_into()
    }

    pub fn source(&self) -> &TradeLog {
        self.log
    }

    pub fn group_criteria(&self) -> &[GroupCol] {
        &self.group_keys
    }

    /// Materializes virtual group columns and partitions the DataFrame.
    fn to_partitions(&self) -> WarroomResult<(Vec<DataFrame>, Vec<GroupCol>)> {
        let group_exprs = self
            .group_keys
            .iter()
            .map(GroupCol::as_expr)
            .collect::<Vec<_>>();

        let df_enriched = self
            .log
            .as_df()
            .clone()
            .lazy()
            .with_columns(group_exprs)
            .collect()
            .map_err(|e| DataError::DataFrame(format!("Failed to materialize group cols: {e}")))?;

        let key_names: Vec<PlSmallStr> = self
            .group_keys
            .iter()
            .map(|k| PlSmallStr::from(k.as_str()))
            .collect();

        let partitions = df_enriched
            .partition_by_stable(key_names, true)
            .map_err(|e| DataError::DataFrame(format!("Partitioning failed: {e}")))?;

        Ok((partitions, self.group_keys.clone()))
    }
}

/// Per-group trade statistics: count, net P&L, R totals, win rate.
#[derive(Debug, Clone)]
pub struct Breakdown {
    df: DataFrame,
}

impl Default for Breakdown {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&Self::to_schema());
        Self { df }
    }
}

impl ReportName for Breakdown {
    fn base_name(&self) -> String {
        generate_dynamic_base_name(&self.df, "breakdown")
    }
}

impl Report for Breakdown {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl ToSchema for Breakdown {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = BreakdownCol::iter()
            .map(|col| {
                let dtype = match col {
                    BreakdownCol::TradeCount => DataType::UInt32,
                    BreakdownCol::NetPnl
                    | BreakdownCol::TotalR
                    | BreakdownCol::AvgRMultiple
                    | BreakdownCol::WinRate => DataType::Float64,
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl TryFrom<&GroupedTradeLog<'_>> for Breakdown {
    type Error = WarroomError;

    fn try_from(grouped: &GroupedTradeLog) -> WarroomResult<Self> {
        if grouped.source().as_df().is_empty() {
            return Ok(Self::default());
        }

        let (partitions, keys) = grouped.to_partitions()?;
        let lazy_computations = partitions
            .into_par_iter()
            .map(|df| {
                let mut selection = Vec::with_capacity(keys.len() + BreakdownCol::COUNT);
                for k in &keys {
                    selection.push(col(k.as_str()).first());
                }
                selection.extend(exprs());

                let lf = df
                    .lazy()
                    .sort(
                        [TradeLogCol::RowId.as_str()],
                        SortMultipleOptions::default(),
                    )
                    .select(selection);
                Ok(lf)
            })
            .collect::<Result<Vec<_>, WarroomError>>();

        let merged = polars::prelude::concat(
            lazy_computations?,
            UnionArgs {
                parallel: true,
                rechunk: true,
                ..Default::default()
            },
        )
        .map_err(|e| DataError::DataFrame(format!("Merge plan failed: {e}")))?
        .collect()
        .map_err(|e| DataError::DataFrame(format!("Execution failed: {e}")))?;

        Ok(Self { df: merged })
    }
}

impl Breakdown {
    /// Rows of a single-key breakdown as plain serializable values, in
    /// first-appearance (date) order.
    pub fn rows(&self) -> WarroomResult<Vec<BreakdownRow>> {
        let key_col = self
            .df
            .get_column_names()
            .into_iter()
            .find(|name| name.starts_with("__"))
            .cloned();

        let Some(key_col) = key_col else {
            return Ok(Vec::new());
        };

        let keys = self
            .df
            .column(key_col.as_str())
            .map_err(|e| DataError::DataFrame(e.to_string()))?
            .cast(&DataType::String)
            .map_err(|e| DataError::DataFrame(e.to_string()))?;
        let keys = keys.str().map_err(|e| DataError::DataFrame(e.to_string()))?;

        let get_f64 = |name: BreakdownCol| -> WarroomResult<Vec<Option<f64>>> {
            Ok(self
                .df
                .column(name.as_str())
                .map_err(|e| DataError::DataFrame(e.to_string()))?
                .f64()
                .map_err(|e| DataError::DataFrame(e.to_string()))?
                .into_iter()
                .collect())
        };
        let counts: Vec<Option<u32>> = self
            .df
            .column(BreakdownCol::TradeCount.as_str())
            .map_err(|e| DataError::DataFrame(e.to_string()))?
            .u32()
            .map_err(|e| DataError::DataFrame(e.to_string()))?
            .into_iter()
            .collect();

        let net = get_f64(BreakdownCol::NetPnl)?;
        let total_r = get_f64(BreakdownCol::TotalR)?;
        let avg_r = get_f64(BreakdownCol::AvgRMultiple)?;
        let win_rate = get_f64(BreakdownCol::WinRate)?;

        let mut rows = Vec::with_capacity(self.df.height());
        for idx in 0..self.df.height() {
            rows.push(BreakdownRow {
                key: keys.get(idx).unwrap_or_default().to_string(),
                trade_count: counts[idx].unwrap_or(0),
                net_pnl: net[idx].unwrap_or(0.0),
                total_r: total_r[idx].unwrap_or(0.0),
                avg_r_multiple: avg_r[idx].unwrap_or(0.0),
                win_rate: win_rate[idx].unwrap_or(0.0),
            });
        }
        Ok(rows)
    }
}

fn exprs() -> Vec<Expr> {
    vec![
        len().alias(BreakdownCol::TradeCount).cast(DataType::UInt32),
        col(TradeLogCol::Pnl)
            .sum()
            .alias(BreakdownCol::NetPnl)
            .cast(DataType::Float64),
        col(TradeLogCol::RMultiple)
            .sum()
            .alias(BreakdownCol::TotalR)
            .cast(DataType::Float64),
        col(TradeLogCol::RMultiple)
            .mean()
            .fill_null(lit(0.0))
            .alias(BreakdownCol::AvgRMultiple)
            .cast(DataType::Float64),
        col(TradeLogCol::Pnl)
            .gt(lit(0.0))
            .mean()
            .fill_null(lit(0.0))
            .alias(BreakdownCol::WinRate)
            .cast(DataType::Float64),
    ]
}

/// Columns of the per-group breakdown.
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
    EnumCount,
)]
#[strum(serialize_all = "snake_case")]
pub enum BreakdownCol {
    /// Trades in the group.
    TradeCount,
    /// Summed P&L of the group.
    NetPnl,
    /// Summed R-multiples of the group.
    TotalR,
    /// Mean R-multiple of the group.
    AvgRMultiple,
    /// Winning trades over total within the group.
    WinRate,
}

impl From<BreakdownCol> for PlSmallStr {
    fn from(value: BreakdownCol) -> Self {
        value.as_str().into()
    }
}

impl BreakdownCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// One row of a single-key breakdown, for snapshot serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub key: String,
    pub trade_count: u32,
    pub net_pnl: f64,
    pub total_r: f64,
    pub avg_r_multiple: f64,
    pub win_rate: f64,
}

/// The subset of columns valid for grouping.
///
/// Strictly enforcing this keeps continuous columns (P&L, R) and the row
/// id out of group-by clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case", prefix = "__")]
pub enum GroupCol {
    /// Strategy label.
    Strategy,
    /// Traded instrument.
    Symbol,
    /// Weekday of the trade date.
    Weekday,
    /// Win or loss.
    Outcome,
    /// Calendar month (1-12) of the trade date.
    Month,
}

impl GroupCol {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Expression materializing the (possibly virtual) group column under
    /// its prefixed name.
    pub fn as_expr(&self) -> Expr {
        match self {
            GroupCol::Strategy => col(TradeLogCol::Strategy).alias(self.as_str()),
            GroupCol::Symbol => col(TradeLogCol::Symbol).alias(self.as_str()),
            GroupCol::Weekday => col(TradeLogCol::Weekday).alias(self.as_str()),
            GroupCol::Outcome => col(TradeLogCol::Outcome).alias(self.as_str()),
            GroupCol::Month => col(TradeLogCol::Date)
                .dt()
                .month()
                .cast(DataType::Int32)
                .alias(self.as_str()),
        }
    }
}
