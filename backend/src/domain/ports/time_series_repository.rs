//! Driven port for reading and appending report series.
//!
//! Every operation is read or append only. Duplicate dates are prevented by
//! callers, never by this contract.

use async_trait::async_trait;
use pagination::{PageRequest, Paginated};

use super::define_port_error;
use crate::domain::{EconomicPoint, EconomicPointWithChange, ReportType, StatsBucket};

/// Default lookback window, in years.
pub const DEFAULT_YEARS: u32 = 10;
/// Default statistics bucket width, in days.
pub const DEFAULT_BUCKET_DAYS: u32 = 365;

/// Parameters for a bucketed statistics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsQuery {
    /// Lookback window in years; always positive.
    pub years: u32,
    /// Bucket width in days; always positive.
    pub bucket_days: u32,
    /// Page of buckets to return.
    pub page: PageRequest,
}

impl Default for StatsQuery {
    fn default() -> Self {
        Self {
            years: DEFAULT_YEARS,
            bucket_days: DEFAULT_BUCKET_DAYS,
            page: PageRequest::default(),
        }
    }
}

define_port_error! {
    /// Errors raised by time-series persistence adapters.
    pub enum TimeSeriesRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "time series repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "time series repository query failed: {message}",
    }
}

/// Port for a report's stored points and derived views.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeSeriesRepository: Send + Sync {
    /// Every stored point for `report`, newest first.
    async fn get_all(
        &self,
        report: ReportType,
    ) -> Result<Vec<EconomicPoint>, TimeSeriesRepositoryError>;

    /// Append one point.
    async fn insert(
        &self,
        report: ReportType,
        point: &EconomicPoint,
    ) -> Result<(), TimeSeriesRepositoryError>;

    /// Append a batch of points. An empty batch is a no-op.
    async fn insert_many(
        &self,
        report: ReportType,
        points: &[EconomicPoint],
    ) -> Result<(), TimeSeriesRepositoryError>;

    /// Points newer than `years` years ago, newest first, each annotated with
    /// its change against the next-older point in the filtered window.
    ///
    /// Metadata counts the whole filtered window, not only the page.
    async fn interval_with_change(
        &self,
        report: ReportType,
        years: u32,
        page: PageRequest,
    ) -> Result<Paginated<EconomicPointWithChange>, TimeSeriesRepositoryError>;

    /// Fixed-width bucket statistics within the lookback window, newest
    /// bucket first.
    async fn stats(
        &self,
        report: ReportType,
        query: StatsQuery,
    ) -> Result<Paginated<StatsBucket>, TimeSeriesRepositoryError>;

    /// The most recent point and its change against the second most recent.
    async fn latest_with_change(
        &self,
        report: ReportType,
    ) -> Result<Option<EconomicPointWithChange>, TimeSeriesRepositoryError>;
}

/// Fixture implementation that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureTimeSeriesRepository;

#[async_trait]
impl TimeSeriesRepository for FixtureTimeSeriesRepository {
    async fn get_all(
        &self,
        _report: ReportType,
    ) -> Result<Vec<EconomicPoint>, TimeSeriesRepositoryError> {
        Ok(Vec::new())
    }

    async fn insert(
        &self,
        _report: ReportType,
        _point: &EconomicPoint,
    ) -> Result<(), TimeSeriesRepositoryError> {
        Ok(())
    }

    async fn insert_many(
        &self,
        _report: ReportType,
        _points: &[EconomicPoint],
    ) -> Result<(), TimeSeriesRepositoryError> {
        Ok(())
    }

    async fn interval_with_change(
        &self,
        _report: ReportType,
        _years: u32,
        _page: PageRequest,
    ) -> Result<Paginated<EconomicPointWithChange>, TimeSeriesRepositoryError> {
        Ok(Paginated::empty())
    }

    async fn stats(
        &self,
        _report: ReportType,
        _query: StatsQuery,
    ) -> Result<Paginated<StatsBucket>, TimeSeriesRepositoryError> {
        Ok(Paginated::empty())
    }

    async fn latest_with_change(
        &self,
        _report: ReportType,
    ) -> Result<Option<EconomicPointWithChange>, TimeSeriesRepositoryError> {
        Ok(None)
    }
}
