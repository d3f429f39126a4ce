use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::DashboardConfig,
    error::WarroomResult,
    report::{
        breakdown::{BreakdownRow, GroupCol},
        calendar::{CalendarMonth, calendar_month},
        daily_ledger::DailyLedger,
        equity_curve::{CurvePoint, EquityCurve},
        expectancy::{ExpectancyKpis, ExpectancyReport},
        trade_log::TradeLog,
        yearly::{MonthlyTotals, YearlyKpis, YearlySummary},
    },
    sheet::{
        SheetOutcome,
        daily::{DailyRecord, read_daily_pnl},
        expectancy::read_trade_log,
        overview::read_running_total,
        resolver::{detect_years, resolve_marked_sheet, resolve_monthly_sheet},
    },
    workbook::SheetSource,
};

/// One full render pass over a workbook.
///
/// Everything in the snapshot is recomputed from the sheet source on every
/// call; nothing is persisted between renders.
pub struct Dashboard<'a, S: SheetSource> {
    source: &'a S,
    config: &'a DashboardConfig,
}

/// The complete, serializable result of one render pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub generated_on: NaiveDate,
    /// Running-total overview, when the workbook carries that tab.
    pub equity: Option<EquityOverview>,
    /// Per-year sections, newest first.
    pub years: Vec<YearOverview>,
    /// Expectancy lab, when the workbook carries a trade-log tab.
    pub expectancy: Option<ExpectancyOverview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityOverview {
    /// Latest cumulative equity (the headline metric).
    pub latest: f64,
    /// Full historical equity series.
    pub curve: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearOverview {
    pub year: i32,
    pub kpis: YearlyKpis,
    pub monthly: MonthlyTotals,
    /// Chart-ready cumulative curve with interpolated zero crossings.
    pub curve: Vec<CurvePoint>,
    /// Calendar heatmap months, one per month with data.
    pub calendar: Vec<CalendarMonth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectancyOverview {
    pub kpis: ExpectancyKpis,
    pub by_strategy: Vec<BreakdownRow>,
    pub by_symbol: Vec<BreakdownRow>,
    pub by_weekday: Vec<BreakdownRow>,
}

impl<'a, S: SheetSource> Dashboard<'a, S> {
    pub fn new(source: &'a S, config: &'a DashboardConfig) -> Self {
        Self { source, config }
    }

    /// Builds the full snapshot. `today` anchors the future-date filter;
    /// callers pass the wall clock, tests pass a fixed date.
    #[tracing::instrument(skip(self), fields(today = %today))]
    pub fn snapshot(&self, today: NaiveDate) -> WarroomResult<DashboardSnapshot> {
        let sheet_names = self.source.sheet_names();
        debug!(sheets = sheet_names.len(), "Render pass started");

        let equity = self.equity_overview(&sheet_names)?;

        let years = detect_years(&sheet_names, self.config.labels().daily_report())?;
        let mut year_overviews = Vec::with_capacity(years.len());
        for year in years {
            if let Some(overview) = self.year_overview(&sheet_names, year, today)? {
                year_overviews.push(overview);
            }
        }

        let expectancy = self.expectancy_overview(&sheet_names)?;

        info!(
            years = year_overviews.len(),
            has_equity = equity.is_some(),
            has_expectancy = expectancy.is_some(),
            "Render pass finished"
        );

        Ok(DashboardSnapshot {
            generated_on: today,
            equity,
            years: year_overviews,
            expectancy,
        })
    }

    fn equity_overview(&self, sheet_names: &[String]) -> WarroomResult<Option<EquityOverview>> {
        let tab = self.config.labels().running_total();
        if !sheet_names.iter().any(|name| name == tab) {
            return Ok(None);
        }

        let grid = self.source.grid(tab)?;
        match read_running_total(&grid, self.config.labels().cumulative_marker()) {
            SheetOutcome::Parsed(total) => Ok(Some(EquityOverview {
                latest: total.latest(),
                curve: total.series().to_vec(),
            })),
            SheetOutcome::Empty(reason) => {
                debug!(sheet = tab, %reason, "Running-total tab empty");
                Ok(None)
            }
            SheetOutcome::Malformed(reason) => {
                warn!(sheet = tab, %reason, "Running-total tab malformed, skipping");
                Ok(None)
            }
        }
    }

    /// Assembles one year from its monthly tabs. Returns `None` when no
    /// month contributed any usable row.
    fn year_overview(
        &self,
        sheet_names: &[String],
        year: i32,
        today: NaiveDate,
    ) -> WarroomResult<Option<YearOverview>> {
        let label = self.config.labels().daily_report();

        let mut records: Vec<DailyRecord> = Vec::new();
        for month in 1..=12u32 {
            let Some(tab) = resolve_monthly_sheet(sheet_names, label, year, month) else {
                continue;
            };
            let grid = self.source.grid(tab)?;
            match read_daily_pnl(&grid, self.config.locator()) {
                SheetOutcome::Parsed(rows) => records.extend(rows),
                SheetOutcome::Empty(reason) => {
                    debug!(sheet = tab, %reason, "Monthly tab empty");
                }
                SheetOutcome::Malformed(reason) => {
                    warn!(sheet = tab, %reason, "Monthly tab malformed, skipping");
                }
            }
        }

        if records.is_empty() {
            debug!(year, "No usable monthly data");
            return Ok(None);
        }

        let ledger = DailyLedger::try_from(records)?.for_year(year, today)?;
        if ledger.is_empty() {
            return Ok(None);
        }

        let summary = YearlySummary::try_from(&ledger)?;
        let Some(kpis) = summary.kpis()? else {
            return Ok(None);
        };

        let monthly = MonthlyTotals::try_from(&ledger)?;
        let curve = EquityCurve::try_from(&ledger)?.zero_crossing_points()?;

        let mut calendar = Vec::new();
        for month in monthly.months_present() {
            calendar.push(calendar_month(&ledger, year, month)?);
        }

        Ok(Some(YearOverview {
            year,
            kpis,
            monthly,
            curve,
            calendar,
        }))
    }

    fn expectancy_overview(
        &self,
        sheet_names: &[String],
    ) -> WarroomResult<Option<ExpectancyOverview>> {
        let marker = self.config.labels().expectancy_marker();
        let Some(tab) = resolve_marked_sheet(sheet_names, marker) else {
            debug!(marker, "No trade-log tab");
            return Ok(None);
        };

        let grid = self.source.grid(tab)?;
        let records = match read_trade_log(&grid, self.config.expectancy()) {
            SheetOutcome::Parsed(records) => records,
            SheetOutcome::Empty(reason) => {
                debug!(sheet = tab, %reason, "Trade-log tab empty");
                return Ok(None);
            }
            SheetOutcome::Malformed(reason) => {
                warn!(sheet = tab, %reason, "Trade-log tab malformed, skipping");
                return Ok(None);
            }
        };

        let log = TradeLog::new(records, self.config.expectancy().policy())?;
        let Some(kpis) = ExpectancyReport::try_from(&log)?.kpis()? else {
            return Ok(None);
        };

        Ok(Some(ExpectancyOverview {
            kpis,
            by_strategy: log.grouped_by([GroupCol::Strategy]).breakdown()?.rows()?,
            by_symbol: log.grouped_by([GroupCol::Symbol]).breakdown()?.rows()?,
            by_weekday: log.grouped_by([GroupCol::Weekday]).breakdown()?.rows()?,
        }))
    }
}
