use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use polars::{
    frame::DataFrame,
    prelude::{Column, DataType, Field, PlSmallStr, Schema, SchemaRef},
};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    config::ExpectancyPolicy,
    error::{WarroomError, WarroomResult},
    report::{
        io::{Report, ReportName, ToSchema, generate_dynamic_base_name},
        polars_ext::{date_column, polars_to_warroom_error},
    },
    sheet::expectancy::TradeRecord,
};

/// Outcome classification of a logged trade. Zero-P&L rows never reach the
/// log (the reader drops them), so the split is exhaustive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl TradeOutcome {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// The trade journal built from the workbook's "expectancy" tab.
///
/// Rows are sorted by date and numbered; the grouping columns (weekday,
/// outcome) are derived once at construction so every downstream report
/// reads them instead of re-deriving.
#[derive(Debug, Clone)]
pub struct TradeLog {
    df: DataFrame,
    policy: ExpectancyPolicy,
}

impl ReportName for TradeLog {
    fn base_name(&self) -> String {
        generate_dynamic_base_name(&self.df, "trade_log")
    }
}

impl Report for TradeLog {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl ToSchema for TradeLog {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = TradeLogCol::iter()
            .map(|col| {
                let dtype = match col {
                    TradeLogCol::RowId => DataType::UInt32,
                    TradeLogCol::Date => DataType::Date,
                    TradeLogCol::Strategy
                    | TradeLogCol::Symbol
                    | TradeLogCol::Weekday
                    | TradeLogCol::Outcome => DataType::String,
                    TradeLogCol::RiskAmount | TradeLogCol::Pnl | TradeLogCol::RMultiple => {
                        DataType::Float64
                    }
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl TradeLog {
    pub fn new(records: Vec<TradeRecord>, policy: ExpectancyPolicy) -> WarroomResult<Self> {
        if records.is_empty() {
            let df = DataFrame::empty_with_schema(&Self::to_schema());
            return Ok(Self { df, policy });
        }

        let mut records = records;
        records.sort_by_key(|r| r.date);

        let row_ids: Vec<u32> = (1..=records.len() as u32).collect();
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        let strategies: Vec<&str> = records.iter().map(|r| r.strategy.as_str()).collect();
        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        let risks: Vec<Option<f64>> = records.iter().map(|r| r.risk_amount).collect();
        let pnls: Vec<f64> = records.iter().map(|r| r.pnl).collect();
        let r_multiples: Vec<Option<f64>> = records.iter().map(|r| r.r_multiple).collect();
        let weekdays: Vec<&str> = records
            .iter()
            .map(|r| weekday_name(r.date.weekday()))
            .collect();
        let outcomes: Vec<&str> = records
            .iter()
            .map(|r| {
                if r.pnl > 0.0 {
                    TradeOutcome::Win.as_str()
                } else {
                    TradeOutcome::Loss.as_str()
                }
            })
            .collect();

        let df = DataFrame::new(vec![
            Column::new(TradeLogCol::RowId.name(), row_ids),
            date_column(TradeLogCol::Date.as_str(), &dates)?,
            Column::new(TradeLogCol::Strategy.name(), strategies),
            Column::new(TradeLogCol::Symbol.name(), symbols),
            Column::new(TradeLogCol::RiskAmount.name(), risks),
            Column::new(TradeLogCol::Pnl.name(), pnls),
            Column::new(TradeLogCol::RMultiple.name(), r_multiples),
            Column::new(TradeLogCol::Weekday.name(), weekdays),
            Column::new(TradeLogCol::Outcome.name(), outcomes),
        ])
        .map_err(|e| polars_to_warroom_error("trade log", e))?;

        Ok(Self { df, policy })
    }

    pub fn policy(&self) -> ExpectancyPolicy {
        self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.df.is_empty()
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Columns of the trade journal.
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
pub enum TradeLogCol {
    /// Row identifier, 1-based, in date order. Doubles as the trade index
    /// for curve-stability fitting.
    RowId,
    /// Trade date.
    Date,
    /// Strategy label; unclassified trades carry the workbook's marker.
    Strategy,
    /// Traded instrument.
    Symbol,
    /// Amount risked on the trade, when logged.
    RiskAmount,
    /// Realized P&L. Never zero (scratch rows are dropped at parse time).
    Pnl,
    /// The trade's R-multiple, when logged.
    RMultiple,
    /// Weekday of the trade date, lowercase English.
    Weekday,
    /// `win` or `loss`.
    Outcome,
}

impl From<TradeLogCol> for PlSmallStr {
    fn from(value: TradeLogCol) -> Self {
        value.as_str().into()
    }
}

impl TradeLogCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn trade(y: i32, m: u32, d: u32, pnl: f64, r: f64) -> TradeRecord {
        TradeRecord {
            date: date(y, m, d),
            strategy: "突破".to_string(),
            symbol: "NQ".to_string(),
            risk_amount: Some(1000.0),
            pnl,
            r_multiple: Some(r),
        }
    }

    #[test]
    fn test_rows_are_date_ordered_and_numbered() {
        let log = TradeLog::new(
            vec![
                trade(2025, 9, 3, 100.0, 1.0),
                trade(2025, 9, 1, -50.0, -0.5),
            ],
            ExpectancyPolicy::default(),
        )
        .expect("log builds");

        let row_ids: Vec<Option<u32>> = log
            .as_df()
            .column(TradeLogCol::RowId.as_str())
            .expect("row_id column")
            .u32()
            .expect("u32")
            .into_iter()
            .collect();
        assert_eq!(row_ids, vec![Some(1), Some(2)]);

        let first_outcome = log
            .as_df()
            .column(TradeLogCol::Outcome.as_str())
            .expect("outcome column")
            .str()
            .expect("str")
            .get(0);
        assert_eq!(
            first_outcome,
            Some("loss"),
            "The earlier trade (a loss) must come first"
        );
    }

    #[test]
    fn test_weekday_derivation() {
        // 2025-09-01 is a Monday.
        let log = TradeLog::new(
            vec![trade(2025, 9, 1, 100.0, 1.0)],
            ExpectancyPolicy::default(),
        )
        .expect("log builds");

        let weekday = log
            .as_df()
            .column(TradeLogCol::Weekday.as_str())
            .expect("weekday column")
            .str()
            .expect("str")
            .get(0);
        assert_eq!(weekday, Some("monday"));
    }

    #[test]
    fn test_empty_log_keeps_schema() {
        let log =
            TradeLog::new(Vec::new(), ExpectancyPolicy::default()).expect("empty log builds");
        assert!(log.is_empty());
        assert_eq!(
            log.as_df().schema().len(),
            TradeLogCol::iter().count(),
            "Empty log must still expose the canonical schema"
        );
    }
}
