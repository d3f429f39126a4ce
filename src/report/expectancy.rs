use std::sync::Arc;

use polars::{
    frame::DataFrame,
    prelude::{
        DataType, Expr, Field, IntoLazy, PlSmallStr, Schema, SchemaRef, col, len, lit, when,
    },
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    config::ExpectancyPolicy,
    error::{DataError, WarroomError, WarroomResult},
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::{ExprExt, polars_to_warroom_error},
        trade_log::{TradeLog, TradeLogCol},
    },
};

/// Position-sizing and edge statistics over the trade journal, as a
/// single-row report.
#[derive(Debug, Clone)]
pub struct ExpectancyReport {
    df: DataFrame,
}

impl Default for ExpectancyReport {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&Self::to_schema());
        Self { df }
    }
}

impl ReportName for ExpectancyReport {
    fn base_name(&self) -> String {
        "expectancy".to_string()
    }
}

impl Report for ExpectancyReport {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl ToSchema for ExpectancyReport {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = ExpectancyCol::iter()
            .map(|col| {
                let dtype = match col {
                    ExpectancyCol::TotalTrades
                    | ExpectancyCol::WinningTrades
                    | ExpectancyCol::LosingTrades
                    | ExpectancyCol::MaxConsecutiveWins
                    | ExpectancyCol::MaxConsecutiveLosses => DataType::UInt32,

                    ExpectancyCol::WinRate
                    | ExpectancyCol::PayoffRatio
                    | ExpectancyCol::ProfitFactor
                    | ExpectancyCol::Expectancy
                    | ExpectancyCol::KellyFraction
                    | ExpectancyCol::RSquared => DataType::Float64,
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl TryFrom<&TradeLog> for ExpectancyReport {
    type Error = WarroomError;

    fn try_from(log: &TradeLog) -> WarroomResult<Self> {
        if log.as_df().is_empty() {
            return Ok(Self::default());
        }

        let df = log
            .as_df()
            .clone()
            .lazy()
            .select(exprs(log.policy()))
            .collect()
            .map_err(convert_err)?;

        Ok(Self { df })
    }
}

impl ExpectancyReport {
    /// The report as plain serializable values, `None` for an empty log.
    pub fn kpis(&self) -> WarroomResult<Option<ExpectancyKpis>> {
        if self.df.is_empty() {
            return Ok(None);
        }

        let get_u32 = |metric: ExpectancyCol| -> WarroomResult<u32> {
            self.df
                .column(metric.as_str())
                .map_err(|e| DataError::DataFrame(e.to_string()))?
                .u32()
                .map_err(|e| DataError::DataFrame(e.to_string()))?
                .get(0)
                .ok_or_else(|| {
                    DataError::DataFrame(format!("Metric '{metric}' is null")).into()
                })
        };
        let get_f64 = |metric: ExpectancyCol| -> WarroomResult<f64> {
            self.df
                .column(metric.as_str())
                .map_err(|e| DataError::DataFrame(e.to_string()))?
                .f64()
                .map_err(|e| DataError::DataFrame(e.to_string()))?
                .get(0)
                .ok_or_else(|| {
                    DataError::DataFrame(format!("Metric '{metric}' is null")).into()
                })
        };

        Ok(Some(ExpectancyKpis {
            total_trades: get_u32(ExpectancyCol::TotalTrades)?,
            winning_trades: get_u32(ExpectancyCol::WinningTrades)?,
            losing_trades: get_u32(ExpectancyCol::LosingTrades)?,
            win_rate: get_f64(ExpectancyCol::WinRate)?,
            payoff_ratio: get_f64(ExpectancyCol::PayoffRatio)?,
            profit_factor: get_f64(ExpectancyCol::ProfitFactor)?,
            expectancy: get_f64(ExpectancyCol::Expectancy)?,
            kelly_fraction: get_f64(ExpectancyCol::KellyFraction)?,
            r_squared: get_f64(ExpectancyCol::RSquared)?,
            max_consecutive_wins: get_u32(ExpectancyCol::MaxConsecutiveWins)?,
            max_consecutive_losses: get_u32(ExpectancyCol::MaxConsecutiveLosses)?,
        }))
    }
}

/// Plain-value form of the expectancy report for snapshot serialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectancyKpis {
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64,
    pub payoff_ratio: f64,
    pub profit_factor: f64,
    pub expectancy: f64,
    pub kelly_fraction: f64,
    pub r_squared: f64,
    pub max_consecutive_wins: u32,
    pub max_consecutive_losses: u32,
}

fn exprs(policy: ExpectancyPolicy) -> Vec<Expr> {
    vec![
        // === Trade counts ===
        len().alias(ExpectancyCol::TotalTrades).cast(DataType::UInt32),
        winning_trade_count_expr()
            .alias(ExpectancyCol::WinningTrades)
            .cast(DataType::UInt32),
        losing_trade_count_expr()
            .alias(ExpectancyCol::LosingTrades)
            .cast(DataType::UInt32),
        // === Edge ===
        win_rate_expr()
            .alias(ExpectancyCol::WinRate)
            .cast(DataType::Float64),
        payoff_ratio_expr()
            .alias(ExpectancyCol::PayoffRatio)
            .cast(DataType::Float64),
        profit_factor_expr()
            .alias(ExpectancyCol::ProfitFactor)
            .cast(DataType::Float64),
        expectancy_expr(policy)
            .alias(ExpectancyCol::Expectancy)
            .cast(DataType::Float64),
        // === Position sizing ===
        kelly_fraction_expr()
            .alias(ExpectancyCol::KellyFraction)
            .cast(DataType::Float64),
        // === Curve stability ===
        r_squared_expr()
            .alias(ExpectancyCol::RSquared)
            .cast(DataType::Float64),
        // === Streaks ===
        max_consecutive_wins_expr()
            .alias(ExpectancyCol::MaxConsecutiveWins)
            .cast(DataType::UInt32),
        max_consecutive_losses_expr()
            .alias(ExpectancyCol::MaxConsecutiveLosses)
            .cast(DataType::UInt32),
    ]
}

// ================================================================================================
// === Trade counts ===
// ================================================================================================
fn win_predicate() -> Expr {
    col(TradeLogCol::Pnl).gt(lit(0.0))
}

fn loss_predicate() -> Expr {
    col(TradeLogCol::Pnl).lt(lit(0.0))
}

fn winning_trade_count_expr() -> Expr {
    win_predicate().cast(DataType::UInt32).sum()
}

fn losing_trade_count_expr() -> Expr {
    loss_predicate().cast(DataType::UInt32).sum()
}

// ================================================================================================
// === Edge ===
// ================================================================================================
fn win_rate_expr() -> Expr {
    win_predicate().mean().fill_null(lit(0.0))
}

fn avg_win_r_expr() -> Expr {
    col(TradeLogCol::RMultiple)
        .filter(win_predicate())
        .mean()
        .fill_null(lit(0.0))
}

fn avg_loss_r_abs_expr() -> Expr {
    col(TradeLogCol::RMultiple)
        .filter(loss_predicate())
        .mean()
        .abs()
        .fill_null(lit(0.0))
}

/// Mean winning R over the absolute mean losing R. Infinite when the log
/// has no losers yet.
fn payoff_ratio_expr() -> Expr {
    avg_win_r_expr().safe_div(avg_loss_r_abs_expr(), None)
}

fn profit_factor_expr() -> Expr {
    let total_win = col(TradeLogCol::Pnl).filter(win_predicate()).sum();
    let total_loss_abs = col(TradeLogCol::Pnl).filter(loss_predicate()).sum().abs();
    total_win.safe_div(total_loss_abs, None)
}

fn expectancy_expr(policy: ExpectancyPolicy) -> Expr {
    match policy {
        ExpectancyPolicy::RiskNormalized => col(TradeLogCol::Pnl)
            .sum()
            .safe_div(col(TradeLogCol::RiskAmount).sum(), Some(0.0)),
        ExpectancyPolicy::Probabilistic => {
            let w = win_rate_expr();
            w.clone() * avg_win_r_expr() - (lit(1.0) - w) * avg_loss_r_abs_expr()
        }
    }
}

// ================================================================================================
// === Position sizing ===
// ================================================================================================
/// Kelly fraction `w - (1 - w) / payoff`, clamped to >= 0. A payoff ratio
/// of zero (no winners yet) sizes to zero outright.
fn kelly_fraction_expr() -> Expr {
    let w = win_rate_expr();
    let payoff = payoff_ratio_expr();
    let raw = w.clone() - (lit(1.0) - w).safe_div(payoff.clone(), None);

    when(payoff.lt_eq(lit(0.0)))
        .then(lit(0.0))
        .when(raw.clone().lt(lit(0.0)))
        .then(lit(0.0))
        .otherwise(raw)
}

// ================================================================================================
// === Curve stability ===
// ================================================================================================
/// Squared Pearson correlation between cumulative R and the trade index: a
/// proxy for how linear the equity growth has been, not a regression
/// diagnostic.
fn r_squared_expr() -> Expr {
    let x = col(TradeLogCol::RowId).cast(DataType::Float64);
    let y = col(TradeLogCol::RMultiple)
        .fill_null(lit(0.0))
        .cum_sum(false);

    let cov = (x.clone() * y.clone()).mean() - x.clone().mean() * y.clone().mean();
    let var_x = (x.clone() * x.clone()).mean() - x.clone().mean() * x.mean();
    let var_y = (y.clone() * y.clone()).mean() - y.clone().mean() * y.mean();

    cov.pow(2.0).safe_div(var_x * var_y, Some(0.0))
}

// ================================================================================================
// === Streaks ===
// ================================================================================================
fn max_consecutive_wins_expr() -> Expr {
    max_consecutive_streak_expr(win_predicate())
}

fn max_consecutive_losses_expr() -> Expr {
    max_consecutive_streak_expr(loss_predicate())
}

/// Maximum length of consecutive `true` values in a boolean predicate
/// expression.
///
/// Reference: https://stackoverflow.com/a/75405310
fn max_consecutive_streak_expr(predicate: Expr) -> Expr {
    let rle = predicate.clone().rle_id();
    let streak_len = len().over([rle]);

    when(predicate).then(streak_len).otherwise(lit(0)).max()
}

fn convert_err(e: polars::error::PolarsError) -> WarroomError {
    polars_to_warroom_error("expectancy report", e)
}

/// Columns of the expectancy report.
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
pub enum ExpectancyCol {
    // === Trade counts ===
    /// Total number of logged trades.
    TotalTrades,
    /// Trades with positive P&L.
    WinningTrades,
    /// Trades with negative P&L.
    LosingTrades,

    // === Edge ===
    /// Winning trades over total.
    WinRate,
    /// Mean winning R over absolute mean losing R.
    PayoffRatio,
    /// Gross wins over absolute gross losses.
    ProfitFactor,
    /// Average return per unit of risk; definition selected by policy.
    Expectancy,

    // === Position sizing ===
    /// Kelly criterion fraction, clamped to >= 0.
    KellyFraction,

    // === Curve stability ===
    /// Squared Pearson correlation of cumulative R against trade index.
    RSquared,

    // === Streaks ===
    MaxConsecutiveWins,
    MaxConsecutiveLosses,
}

impl From<ExpectancyCol> for PlSmallStr {
    fn from(value: ExpectancyCol) -> Self {
        value.as_str().into()
    }
}

impl ExpectancyCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::sheet::expectancy::TradeRecord;

    fn trade(day: u32, pnl: f64, r: f64, risk: f64) -> TradeRecord {
        TradeRecord {
            date: NaiveDate::from_ymd_opt(2025, 9, day).expect("valid test date"),
            strategy: "突破".to_string(),
            symbol: "NQ".to_string(),
            risk_amount: Some(risk),
            pnl,
            r_multiple: Some(r),
        }
    }

    fn log(records: Vec<TradeRecord>, policy: ExpectancyPolicy) -> TradeLog {
        TradeLog::new(records, policy).expect("log builds")
    }

    fn kpis(records: Vec<TradeRecord>, policy: ExpectancyPolicy) -> ExpectancyKpis {
        ExpectancyReport::try_from(&log(records, policy))
            .expect("report builds")
            .kpis()
            .expect("kpis extract")
            .expect("log is non-empty")
    }

    /// Two wins (R +2, +1), two losses (R -1, -0.5); risk 1000 per trade.
    fn mixed_records() -> Vec<TradeRecord> {
        vec![
            trade(1, 2000.0, 2.0, 1000.0),
            trade(2, -1000.0, -1.0, 1000.0),
            trade(3, 1000.0, 1.0, 1000.0),
            trade(4, -500.0, -0.5, 1000.0),
        ]
    }

    // ========================================================================
    // Counts and win rate
    // ========================================================================

    #[test]
    fn test_counts_and_win_rate() {
        let k = kpis(mixed_records(), ExpectancyPolicy::RiskNormalized);
        assert_eq!(k.total_trades, 4);
        assert_eq!(k.winning_trades, 2);
        assert_eq!(k.losing_trades, 2);
        assert!((k.win_rate - 0.5).abs() < 1e-12);
    }

    // ========================================================================
    // Payoff ratio and profit factor
    // ========================================================================

    #[test]
    fn test_payoff_ratio_from_r_multiples() {
        let k = kpis(mixed_records(), ExpectancyPolicy::RiskNormalized);
        // avg win R = 1.5, avg |loss R| = 0.75.
        assert!((k.payoff_ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_profit_factor_from_pnl() {
        let k = kpis(mixed_records(), ExpectancyPolicy::RiskNormalized);
        // Gross wins 3000, gross losses 1500.
        assert!((k.profit_factor - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_winners_has_infinite_payoff() {
        let k = kpis(
            vec![trade(1, 500.0, 1.0, 500.0), trade(2, 250.0, 0.5, 500.0)],
            ExpectancyPolicy::RiskNormalized,
        );
        assert!(k.payoff_ratio.is_infinite());
        assert!(k.profit_factor.is_infinite());
        // Kelly degrades to the win rate: (1 - w) / inf = 0.
        assert!((k.kelly_fraction - 1.0).abs() < 1e-12);
    }

    // ========================================================================
    // Expectancy policies
    // ========================================================================

    #[test]
    fn test_risk_normalized_expectancy() {
        let k = kpis(mixed_records(), ExpectancyPolicy::RiskNormalized);
        // Total P&L 1500 over total risk 4000.
        assert!((k.expectancy - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_probabilistic_expectancy() {
        let k = kpis(mixed_records(), ExpectancyPolicy::Probabilistic);
        // 0.5 * 1.5 - 0.5 * 0.75 = 0.375 (coincidentally equal here).
        assert!((k.expectancy - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_risk_normalized_with_no_risk_logged_is_zero() {
        let mut records = mixed_records();
        for r in &mut records {
            r.risk_amount = None;
        }
        let k = kpis(records, ExpectancyPolicy::RiskNormalized);
        assert_eq!(k.expectancy, 0.0, "No risk data: expectancy reads zero");
    }

    // ========================================================================
    // Kelly clamping
    // ========================================================================

    #[test]
    fn test_kelly_positive_edge() {
        let k = kpis(mixed_records(), ExpectancyPolicy::RiskNormalized);
        // w = 0.5, payoff = 2: kelly = 0.5 - 0.5 / 2 = 0.25.
        assert!((k.kelly_fraction - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_kelly_clamped_on_negative_edge() {
        // One small win, three losses: negative edge.
        let k = kpis(
            vec![
                trade(1, 100.0, 0.1, 1000.0),
                trade(2, -1000.0, -1.0, 1000.0),
                trade(3, -1000.0, -1.0, 1000.0),
                trade(4, -1000.0, -1.0, 1000.0),
            ],
            ExpectancyPolicy::RiskNormalized,
        );
        assert_eq!(k.kelly_fraction, 0.0, "Negative edge must clamp to zero");
    }

    #[test]
    fn test_kelly_zero_when_payoff_is_zero() {
        // Only losers: payoff ratio 0.
        let k = kpis(
            vec![trade(1, -100.0, -1.0, 100.0), trade(2, -50.0, -0.5, 100.0)],
            ExpectancyPolicy::RiskNormalized,
        );
        assert_eq!(k.payoff_ratio, 0.0);
        assert_eq!(k.kelly_fraction, 0.0);
    }

    // ========================================================================
    // Curve stability
    // ========================================================================

    #[test]
    fn test_r_squared_is_one_for_perfectly_linear_growth() {
        // Constant R per trade: cumulative R is exactly linear in the index.
        let records = (1..=5).map(|d| trade(d, 500.0, 1.0, 500.0)).collect();
        let k = kpis(records, ExpectancyPolicy::RiskNormalized);
        assert!(
            (k.r_squared - 1.0).abs() < 1e-9,
            "Linear curve must fit with R^2 = 1, got {}",
            k.r_squared
        );
    }

    #[test]
    fn test_r_squared_bounded() {
        let k = kpis(mixed_records(), ExpectancyPolicy::RiskNormalized);
        assert!(
            (0.0..=1.0).contains(&k.r_squared),
            "Squared correlation must be within [0, 1], got {}",
            k.r_squared
        );
    }

    #[test]
    fn test_r_squared_degenerate_single_trade_is_zero() {
        let k = kpis(
            vec![trade(1, 100.0, 1.0, 100.0)],
            ExpectancyPolicy::RiskNormalized,
        );
        assert_eq!(k.r_squared, 0.0, "Zero variance falls back to zero");
    }

    // ========================================================================
    // Streaks
    // ========================================================================

    #[test]
    fn test_max_consecutive_streaks() {
        // Sequence by date: L L W W W L.
        let records = vec![
            trade(1, -100.0, -1.0, 100.0),
            trade(2, -100.0, -1.0, 100.0),
            trade(3, 100.0, 1.0, 100.0),
            trade(4, 100.0, 1.0, 100.0),
            trade(5, 100.0, 1.0, 100.0),
            trade(6, -100.0, -1.0, 100.0),
        ];
        let k = kpis(records, ExpectancyPolicy::RiskNormalized);
        assert_eq!(k.max_consecutive_wins, 3);
        assert_eq!(k.max_consecutive_losses, 2);
    }

    // ========================================================================
    // Empty log
    // ========================================================================

    #[test]
    fn test_empty_log_yields_no_kpis() {
        let report = ExpectancyReport::try_from(&log(Vec::new(), ExpectancyPolicy::default()))
            .expect("report builds");
        assert!(report.as_df().is_empty());
        assert!(report.kpis().expect("kpis").is_none());
    }
}
