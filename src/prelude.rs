// 1. Traits
pub use crate::report::io::{Report, ReportName, ToCsv, ToJson, ToSchema};
pub use crate::workbook::SheetSource;
pub use crate::workbook::fetcher::FetchWorkbook;

// 2. The Core "Render" Types
pub use crate::dashboard::{
    Dashboard, DashboardSnapshot, EquityOverview, ExpectancyOverview, YearOverview,
};

// 3. Financial Domain Types
pub use crate::report::{
    breakdown::{Breakdown, BreakdownRow, GroupCol},
    calendar::{CalendarDay, CalendarMonth, CalendarWeek, MonthlyStats},
    daily_ledger::DailyLedger,
    equity_curve::{CurvePoint, EquityCurve},
    expectancy::{ExpectancyKpis, ExpectancyReport},
    trade_log::{TradeLog, TradeOutcome},
    yearly::{MonthlyTotals, YearlyKpis, YearlySummary},
};
pub use crate::sheet::{
    SheetOutcome,
    daily::DailyRecord,
    expectancy::TradeRecord,
    locator::{LocateStrategy, PnlColumnLocation},
};

// 4. Configuration
pub use crate::config::{
    DashboardConfig, ExpectancyConfig, ExpectancyPolicy, LocatorConfig, SheetId, SheetLabels,
};

// 5. Errors
pub use crate::error::{
    ConfigError, DataError, FetchError, IoError, SheetError, WarroomError, WarroomResult,
};

// 6. Workbook access
pub use crate::workbook::{Workbook, cache::CachedWorkbook, fetcher::WorkbookFetcher};
