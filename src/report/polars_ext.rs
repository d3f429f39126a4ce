use chrono::{Days, NaiveDate};
use polars::prelude::{
    Column, DataFrame, DataType, Expr, JsonFormat, JsonWriter, SerWriter, lit, when,
};
use serde_json::Value;

use crate::error::{DataError, IoError, WarroomError, WarroomResult};

pub(super) fn polars_to_warroom_error(report: &str, e: polars::error::PolarsError) -> WarroomError {
    WarroomError::Data(DataError::DataFrame(format!(
        "Error while building {report}: {e}"
    )))
}

pub trait ExprExt {
    /// Safely divides two expressions, protecting against division-by-zero.
    ///
    /// If the denominator is zero, returns `fallback`
    /// (default: `f64::INFINITY`).
    fn safe_div(self, other: Expr, fallback: Option<f64>) -> Expr;
}

impl ExprExt for Expr {
    fn safe_div(self, other: Expr, fallback: Option<f64>) -> Expr {
        let fallback_val = fallback.unwrap_or(f64::INFINITY);
        when(other.clone().eq(lit(0.0)))
            .then(lit(fallback_val))
            .otherwise(self / other)
    }
}

pub trait DataFrameExt {
    fn to_json_rows(&self) -> WarroomResult<Vec<serde_json::Map<String, Value>>>;
}

impl DataFrameExt for DataFrame {
    fn to_json_rows(&self) -> WarroomResult<Vec<serde_json::Map<String, Value>>> {
        let height = self.height();
        if height == 0 {
            return Ok(Vec::new());
        }

        let estimated_row_size = self.width() * (1 << 6);
        let mut buf = Vec::with_capacity(height * estimated_row_size);

        JsonWriter::new(&mut buf)
            .with_json_format(JsonFormat::Json)
            .finish(&mut self.clone())
            .map_err(|e| DataError::DataFrame(e.to_string()))?;

        let json_val: Value = serde_json::from_slice(&buf).map_err(IoError::Json)?;

        match json_val {
            Value::Array(rows) => {
                let mut out_vec = Vec::with_capacity(rows.len());
                for v in rows {
                    if let Value::Object(map) = v {
                        out_vec.push(map);
                    }
                }
                Ok(out_vec)
            }
            _ => {
                Err(DataError::DataFrame("Polars JSON output was not an array".to_string()).into())
            }
        }
    }
}

// ================================================================================================
// Date column helpers
// ================================================================================================

/// Days since the Unix epoch, the physical representation of a Date column.
/// `NaiveDate::default()` is the epoch itself.
pub(crate) fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

/// Builds a `Date`-typed column from chrono dates.
pub(crate) fn date_column(name: &str, dates: &[NaiveDate]) -> WarroomResult<Column> {
    let days: Vec<i32> = dates.iter().copied().map(days_since_epoch).collect();
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(|e| DataError::DataFrame(format!("Date column build failed: {e}")).into())
}

/// Reads a `Date`-typed column back into chrono dates.
pub(crate) fn column_dates(df: &DataFrame, name: &str) -> WarroomResult<Vec<NaiveDate>> {
    let epoch = NaiveDate::default();

    let ca = df
        .column(name)
        .map_err(|e| DataError::DataFrame(e.to_string()))?
        .date()
        .map_err(|e| DataError::DataFrame(e.to_string()))?;

    ca.physical()
        .into_iter()
        .map(|opt_days| {
            let days = opt_days
                .ok_or_else(|| DataError::DateConversion(format!("null date in '{name}'")))?;
            let date = if days >= 0 {
                epoch.checked_add_days(Days::new(days as u64))
            } else {
                epoch.checked_sub_days(Days::new(days.unsigned_abs() as u64))
            };
            date.ok_or_else(|| {
                DataError::DateConversion(format!("date out of range in '{name}': {days}")).into()
            })
        })
        .collect()
}

/// Reads a Float64 column into a plain vector, nulls as `None`.
pub(crate) fn column_f64(df: &DataFrame, name: &str) -> WarroomResult<Vec<Option<f64>>> {
    Ok(df
        .column(name)
        .map_err(|e| DataError::DataFrame(e.to_string()))?
        .f64()
        .map_err(|e| DataError::DataFrame(e.to_string()))?
        .into_iter()
        .collect())
}
