pub mod breakdown;
pub mod calendar;
pub mod daily_ledger;
pub mod equity_curve;
pub mod expectancy;
pub mod io;
pub mod polars_ext;
pub mod trade_log;
pub mod yearly;
