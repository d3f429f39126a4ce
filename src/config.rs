use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ConfigError, WarroomResult};

/// Opaque identifier of the Google Sheets document backing the dashboard.
///
/// This is a secret: it is read from the environment (or injected directly)
/// and never logged in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetId(String);

impl SheetId {
    pub const ENV_VAR: &'static str = "WARROOM_SHEET_ID";

    pub fn new(id: impl Into<String>) -> WarroomResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigError::MissingSheetId(
                "Sheet id must be non-empty".to_string(),
            )
            .into());
        }
        Ok(Self(id))
    }

    /// Reads the sheet id from [`SheetId::ENV_VAR`].
    pub fn from_env() -> WarroomResult<Self> {
        let id = std::env::var(Self::ENV_VAR).map_err(|_| {
            ConfigError::MissingSheetId(format!("Environment variable {} not set", Self::ENV_VAR))
        })?;
        Self::new(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short redacted form for log output (first 4 chars only).
    pub fn redacted(&self) -> String {
        let head: String = self.0.chars().take(4).collect();
        format!("{head}…")
    }
}

/// Tab-name and header markers used to find the workbook's sheets.
///
/// Defaults match the workbook this dashboard was built around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLabels {
    /// Prefix of the monthly daily-report tabs (followed by year and month).
    daily_report: String,
    /// Marker contained in the trade-log ("expectancy") tab name.
    expectancy_marker: String,
    /// Exact name of the running-total overview tab.
    running_total: String,
    /// Header marker of the cumulative-P&L column in the overview tab.
    cumulative_marker: String,
}

impl Default for SheetLabels {
    fn default() -> Self {
        Self {
            daily_report: "日報表".to_string(),
            expectancy_marker: "期望值".to_string(),
            running_total: "累積總表".to_string(),
            cumulative_marker: "累積損益".to_string(),
        }
    }
}

impl SheetLabels {
    pub fn new(
        daily_report: impl Into<String>,
        expectancy_marker: impl Into<String>,
        running_total: impl Into<String>,
        cumulative_marker: impl Into<String>,
    ) -> WarroomResult<Self> {
        let labels = Self {
            daily_report: daily_report.into(),
            expectancy_marker: expectancy_marker.into(),
            running_total: running_total.into(),
            cumulative_marker: cumulative_marker.into(),
        };
        if labels.daily_report.is_empty() || labels.expectancy_marker.is_empty() {
            return Err(ConfigError::InvalidSheetLabel(
                "Daily-report and expectancy markers must be non-empty".to_string(),
            )
            .into());
        }
        Ok(labels)
    }

    pub fn daily_report(&self) -> &str {
        &self.daily_report
    }

    pub fn expectancy_marker(&self) -> &str {
        &self.expectancy_marker
    }

    pub fn running_total(&self) -> &str {
        &self.running_total
    }

    pub fn cumulative_marker(&self) -> &str {
        &self.cumulative_marker
    }
}

/// Configuration of the header/column locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Keyword substrings that identify the P&L header cell. Matched against
    /// cell text with embedded whitespace stripped, in declaration order.
    keywords: Vec<String>,
    /// Number of leading rows loaded into the scan window.
    scan_rows: usize,
    /// Fallback coordinates `(row, col)` when no keyword is found. The
    /// fallback row is the first *data* row, not a header row.
    fallback: (usize, usize),
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            keywords: ["日總計", "總計", "累計損益", "損益"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            scan_rows: 50,
            // Column H, row 7 in spreadsheet terms.
            fallback: (6, 7),
        }
    }
}

impl LocatorConfig {
    pub fn new(
        keywords: Vec<String>,
        scan_rows: usize,
        fallback: (usize, usize),
    ) -> WarroomResult<Self> {
        if keywords.is_empty() {
            return Err(ConfigError::InvalidLocatorConfig(
                "Keyword set must be non-empty".to_string(),
            )
            .into());
        }
        if scan_rows == 0 {
            return Err(ConfigError::InvalidLocatorConfig(
                "Scan window must cover at least one row".to_string(),
            )
            .into());
        }
        Ok(Self {
            keywords,
            scan_rows,
            fallback,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn scan_rows(&self) -> usize {
        self.scan_rows
    }

    pub fn fallback(&self) -> (usize, usize) {
        self.fallback
    }
}

/// Which definition of "expectancy" the KPI report publishes.
///
/// The workbook's author oscillated between the two over the dashboard's
/// history, so the definition is a policy rather than a constant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ExpectancyPolicy {
    /// Total P&L divided by total risked amount (the workbook's definition).
    #[default]
    RiskNormalized,
    /// Probability-weighted R expectancy:
    /// `win_rate * avg(win R) - (1 - win_rate) * |avg(loss R)|`.
    Probabilistic,
}

/// Configuration of the trade-log ("expectancy") tab reader and KPI report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectancyConfig {
    policy: ExpectancyPolicy,
    /// Number of leading rows scanned for the header row.
    scan_rows: usize,
    /// Header row used when the keyword scan fails. Matches the fixed
    /// `header=14` layout of the workbook's trade-log tab.
    fallback_header_row: usize,
}

impl Default for ExpectancyConfig {
    fn default() -> Self {
        Self {
            policy: ExpectancyPolicy::default(),
            scan_rows: 10,
            fallback_header_row: 14,
        }
    }
}

impl ExpectancyConfig {
    pub fn new(policy: ExpectancyPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> ExpectancyPolicy {
        self.policy
    }

    pub fn scan_rows(&self) -> usize {
        self.scan_rows
    }

    pub fn fallback_header_row(&self) -> usize {
        self.fallback_header_row
    }
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    labels: SheetLabels,
    locator: LocatorConfig,
    expectancy: ExpectancyConfig,
    /// Workbook cache TTL in seconds. Renders within the window reuse the
    /// in-memory workbook instead of re-downloading it.
    #[serde(default = "default_cache_ttl_secs")]
    cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    60
}

impl DashboardConfig {
    pub fn builder() -> DashboardConfigBuilder {
        DashboardConfigBuilder::default()
    }

    pub fn labels(&self) -> &SheetLabels {
        &self.labels
    }

    pub fn locator(&self) -> &LocatorConfig {
        &self.locator
    }

    pub fn expectancy(&self) -> &ExpectancyConfig {
        &self.expectancy
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(if self.cache_ttl_secs == 0 {
            default_cache_ttl_secs()
        } else {
            self.cache_ttl_secs
        })
    }
}

#[derive(Debug, Default)]
pub struct DashboardConfigBuilder {
    labels: Option<SheetLabels>,
    locator: Option<LocatorConfig>,
    expectancy: Option<ExpectancyConfig>,
    cache_ttl: Option<Duration>,
}

impl DashboardConfigBuilder {
    pub fn with_labels(mut self, labels: SheetLabels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn with_expectancy(mut self, expectancy: ExpectancyConfig) -> Self {
        self.expectancy = Some(expectancy);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> WarroomResult<DashboardConfig> {
        if let Some(ttl) = self.cache_ttl
            && ttl.is_zero()
        {
            return Err(ConfigError::InvalidCacheTtl(
                "Cache TTL must be positive".to_string(),
            )
            .into());
        }

        Ok(DashboardConfig {
            labels: self.labels.unwrap_or_default(),
            locator: self.locator.unwrap_or_default(),
            expectancy: self.expectancy.unwrap_or_default(),
            cache_ttl_secs: self
                .cache_ttl
                .map(|ttl| ttl.as_secs().max(1))
                .unwrap_or_else(default_cache_ttl_secs),
        })
    }
}
