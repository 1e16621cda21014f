//! Economic report identifiers and their persisted metadata.
//!
//! [`ReportType`] names one economic series. Each variant maps to exactly one
//! storage table, one metadata slug, and one display string; the mapping is
//! fixed at compile time so table names never originate from user input.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::scheduler::MIN_INITIAL_DELAY;

/// Treasury yield maturity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    /// Three-month bill.
    ThreeMonth,
    /// Two-year note.
    TwoYear,
    /// Five-year note.
    FiveYear,
    /// Seven-year note.
    SevenYear,
    /// Ten-year note.
    TenYear,
    /// Thirty-year bond.
    ThirtyYear,
}

impl Maturity {
    /// Every maturity, shortest first.
    pub const ALL: [Self; 6] = [
        Self::ThreeMonth,
        Self::TwoYear,
        Self::FiveYear,
        Self::SevenYear,
        Self::TenYear,
        Self::ThirtyYear,
    ];

    /// Parse the short form used in request paths (`3m`, `2y`, ... `30y`).
    ///
    /// # Examples
    /// ```
    /// use pulse_backend::domain::Maturity;
    ///
    /// assert_eq!(Maturity::from_path_segment("10y"), Some(Maturity::TenYear));
    /// assert_eq!(Maturity::from_path_segment("1y"), None);
    /// ```
    #[must_use]
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|maturity| maturity.path_segment() == segment)
    }

    /// Short form used in request paths.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::ThreeMonth => "3m",
            Self::TwoYear => "2y",
            Self::FiveYear => "5y",
            Self::SevenYear => "7y",
            Self::TenYear => "10y",
            Self::ThirtyYear => "30y",
        }
    }
}

/// Sampling interval requested from the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    /// One observation per trading day.
    Daily,
    /// One observation per week.
    Weekly,
    /// One observation per month.
    Monthly,
    /// One observation per quarter.
    Quarterly,
    /// One observation per year.
    Annual,
}

/// One economic series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
    /// Consumer price index.
    Cpi,
    /// University of Michigan consumer sentiment.
    ConsumerSentiment,
    /// Advance retail sales.
    RetailSales,
    /// Treasury yield at a fixed maturity.
    TreasuryYield(Maturity),
    /// Real gross domestic product.
    RealGdp,
    /// Real GDP per capita.
    RealGdpPerCapita,
    /// Unemployment rate.
    Unemployment,
    /// Total nonfarm payroll.
    NonfarmPayroll,
    /// Durable goods orders.
    DurableGoodsOrders,
    /// Effective federal funds rate.
    FederalFundsRate,
    /// Annual inflation rate.
    Inflation,
    /// Median expected inflation.
    InflationExpectation,
}

impl ReportType {
    /// Report types kept in sync with the provider by the scheduler.
    #[must_use]
    pub fn synced() -> Vec<Self> {
        let mut reports = vec![Self::Cpi, Self::ConsumerSentiment];
        reports.extend(Maturity::ALL.map(Self::TreasuryYield));
        reports.push(Self::RetailSales);
        reports
    }

    /// Every report type served by the query endpoints.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut reports = Self::synced();
        reports.extend([
            Self::RealGdp,
            Self::RealGdpPerCapita,
            Self::Unemployment,
            Self::NonfarmPayroll,
            Self::DurableGoodsOrders,
            Self::FederalFundsRate,
            Self::Inflation,
            Self::InflationExpectation,
        ]);
        reports
    }

    /// Storage table holding this report's points.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Cpi => "cpi",
            Self::ConsumerSentiment => "consumer_sentiment",
            Self::RetailSales => "retail_sales",
            Self::TreasuryYield(Maturity::ThreeMonth) => "treasury_yield_three_month",
            Self::TreasuryYield(Maturity::TwoYear) => "treasury_yield_two_year",
            Self::TreasuryYield(Maturity::FiveYear) => "treasury_yield_five_year",
            Self::TreasuryYield(Maturity::SevenYear) => "treasury_yield_seven_year",
            Self::TreasuryYield(Maturity::TenYear) => "treasury_yield_ten_year",
            Self::TreasuryYield(Maturity::ThirtyYear) => "treasury_yield_thirty_year",
            Self::RealGdp => "real_gdp",
            Self::RealGdpPerCapita => "real_gdp_per_capita",
            Self::Unemployment => "unemployment",
            Self::NonfarmPayroll => "nonfarm_payroll",
            Self::DurableGoodsOrders => "durable_goods_orders",
            Self::FederalFundsRate => "federal_funds_rate",
            Self::Inflation => "inflation",
            Self::InflationExpectation => "inflation_expectation",
        }
    }

    /// Key of this report's metadata row. Matches the table name.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        self.table_name()
    }

    /// Upper-case name used in logs and responses.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Cpi => "CPI",
            Self::ConsumerSentiment => "CONSUMER_SENTIMENT",
            Self::RetailSales => "RETAIL_SALES",
            Self::TreasuryYield(Maturity::ThreeMonth) => "TREASURY_YIELD_THREE_MONTH",
            Self::TreasuryYield(Maturity::TwoYear) => "TREASURY_YIELD_TWO_YEAR",
            Self::TreasuryYield(Maturity::FiveYear) => "TREASURY_YIELD_FIVE_YEAR",
            Self::TreasuryYield(Maturity::SevenYear) => "TREASURY_YIELD_SEVEN_YEAR",
            Self::TreasuryYield(Maturity::TenYear) => "TREASURY_YIELD_TEN_YEAR",
            Self::TreasuryYield(Maturity::ThirtyYear) => "TREASURY_YIELD_THIRTY_YEAR",
            Self::RealGdp => "REAL_GDP",
            Self::RealGdpPerCapita => "REAL_GDP_PER_CAPITA",
            Self::Unemployment => "UNEMPLOYMENT",
            Self::NonfarmPayroll => "NONFARM_PAYROLL",
            Self::DurableGoodsOrders => "DURABLE_GOODS_ORDERS",
            Self::FederalFundsRate => "FEDERAL_FUNDS_RATE",
            Self::Inflation => "INFLATION",
            Self::InflationExpectation => "INFLATION_EXPECTATION",
        }
    }

    /// Resolve a metadata slug back to its report type.
    ///
    /// # Examples
    /// ```
    /// use pulse_backend::domain::{Maturity, ReportType};
    ///
    /// assert_eq!(
    ///     ReportType::from_slug("treasury_yield_ten_year"),
    ///     Some(ReportType::TreasuryYield(Maturity::TenYear))
    /// );
    /// ```
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::all().into_iter().find(|report| report.slug() == slug)
    }

    /// Maturity for treasury yields; `None` for every other report.
    #[must_use]
    pub const fn maturity(self) -> Option<Maturity> {
        match self {
            Self::TreasuryYield(maturity) => Some(maturity),
            _ => None,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Persisted metadata for one report.
///
/// Exactly one row exists per report type. Only reconciliation mutates it, by
/// advancing `last_pull_date` after a successful provider fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Key matching [`ReportType::slug`].
    pub slug: String,
    /// Human-facing report name.
    pub display_name: String,
    /// Free-text description.
    pub description: String,
    /// Image reference shown next to the report.
    pub image: String,
    /// When the provider was last fetched successfully.
    pub last_pull_date: DateTime<Utc>,
    /// Minutes to wait before the first sync after start-up; zero means unset.
    pub initial_sync_delay_minutes: u32,
    /// Free-form presentation hints.
    pub extras: Value,
}

impl ReportMetadata {
    /// Delay before the first scheduled sync.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use pulse_backend::domain::ReportMetadata;
    ///
    /// let mut metadata = ReportMetadata::placeholder("cpi");
    /// assert_eq!(metadata.initial_delay(), Duration::from_secs(5));
    /// metadata.initial_sync_delay_minutes = 3;
    /// assert_eq!(metadata.initial_delay(), Duration::from_secs(180));
    /// ```
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        match self.initial_sync_delay_minutes {
            0 => MIN_INITIAL_DELAY,
            minutes => Duration::from_secs(u64::from(minutes) * 60),
        }
    }

    /// True when the last pull happened less than `window` before `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        now.signed_duration_since(self.last_pull_date) < window
    }

    /// Metadata for a report that has never been pulled.
    #[must_use]
    pub fn placeholder(slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            display_name: slug.to_uppercase(),
            slug,
            description: String::new(),
            image: String::new(),
            last_pull_date: DateTime::<Utc>::default(),
            initial_sync_delay_minutes: 0,
            extras: Value::Null,
        }
    }
}
