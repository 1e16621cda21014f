//! Concurrent composition of a report's points and bucket statistics.
//!
//! Both queries run together under one deadline. The first failure wins and
//! the sibling future is dropped, which cancels it; nothing is detached.

use std::sync::Arc;
use std::time::Duration;

use pagination::{PageMetadata, PageRequest, Paginated, PaginationError};
use serde::Serialize;
use tokio::time::timeout;

use crate::domain::ports::{
    DEFAULT_BUCKET_DAYS, DEFAULT_YEARS, StatsQuery, TimeSeriesRepository,
    TimeSeriesRepositoryError,
};
use crate::domain::{EconomicPointWithChange, ReportType, StatsBucket};

/// Default bound on one composed query.
pub const DEFAULT_QUERY_DEADLINE: Duration = Duration::from_secs(10);

/// Longest lookback window a query may ask for, in years.
pub const MAX_YEARS: u32 = 100;
/// Widest statistics bucket, in days: the longest lookback window.
pub const MAX_BUCKET_DAYS: u32 = MAX_YEARS * 366;

/// Validation failures for [`SeriesQuery`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeriesQueryError {
    /// `years` is zero or beyond [`MAX_YEARS`].
    #[error("years must be between 1 and {max}", max = MAX_YEARS)]
    YearsOutOfRange,
    /// `timeBucketDays` is zero or beyond [`MAX_BUCKET_DAYS`].
    #[error("timeBucketDays must be between 1 and {max}", max = MAX_BUCKET_DAYS)]
    BucketDaysOutOfRange,
    /// The page or page size is invalid.
    #[error(transparent)]
    Page(#[from] PaginationError),
}

impl SeriesQueryError {
    /// Query parameter the failure refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::YearsOutOfRange => "years",
            Self::BucketDaysOutOfRange => "timeBucketDays",
            Self::Page(PaginationError::PageOutOfRange { .. }) => "page",
            Self::Page(PaginationError::PageSizeOutOfRange { .. }) => "pageSize",
        }
    }
}

/// Validated series query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesQuery {
    years: u32,
    bucket_days: u32,
    page: PageRequest,
}

impl SeriesQuery {
    /// Validate raw parameters. Every check runs so all failures are reported.
    ///
    /// # Errors
    ///
    /// Returns every failed check, in parameter order.
    ///
    /// # Examples
    /// ```
    /// use pulse_backend::domain::SeriesQuery;
    ///
    /// let query = SeriesQuery::new(5, 2, 10, 30).expect("valid query");
    /// assert_eq!(query.years(), 5);
    /// assert!(SeriesQuery::new(0, 1, 12, 0).is_err());
    /// ```
    pub fn new(
        years: u32,
        page: u32,
        page_size: u32,
        bucket_days: u32,
    ) -> Result<Self, Vec<SeriesQueryError>> {
        let mut errors = Vec::new();
        if !(1..=MAX_YEARS).contains(&years) {
            errors.push(SeriesQueryError::YearsOutOfRange);
        }
        let page = match PageRequest::new(page, page_size) {
            Ok(page) => Some(page),
            Err(error) => {
                errors.push(error.into());
                None
            }
        };
        if !(1..=MAX_BUCKET_DAYS).contains(&bucket_days) {
            errors.push(SeriesQueryError::BucketDaysOutOfRange);
        }
        match page {
            Some(page) if errors.is_empty() => Ok(Self {
                years,
                bucket_days,
                page,
            }),
            _ => Err(errors),
        }
    }

    /// Lookback window in years.
    #[must_use]
    pub const fn years(&self) -> u32 {
        self.years
    }

    /// Statistics bucket width in days.
    #[must_use]
    pub const fn bucket_days(&self) -> u32 {
        self.bucket_days
    }

    /// Requested page of points and buckets.
    #[must_use]
    pub const fn page(&self) -> PageRequest {
        self.page
    }

    const fn stats_query(&self) -> StatsQuery {
        StatsQuery {
            years: self.years,
            bucket_days: self.bucket_days,
            page: self.page,
        }
    }
}

impl Default for SeriesQuery {
    fn default() -> Self {
        Self {
            years: DEFAULT_YEARS,
            bucket_days: DEFAULT_BUCKET_DAYS,
            page: PageRequest::default(),
        }
    }
}

/// Points, their page metadata, and bucket statistics for one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedSeries {
    /// Requested page of points, newest first.
    pub data: Vec<EconomicPointWithChange>,
    /// Pagination metadata for `data`.
    pub meta: PageMetadata,
    /// First page of bucket statistics.
    pub stats: Vec<StatsBucket>,
}

/// Failures surfaced by [`QueryComposer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A repository call failed.
    #[error("series query failed: {0}")]
    Repository(#[from] TimeSeriesRepositoryError),
    /// The deadline elapsed before both queries finished.
    #[error("series query exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

/// Runs series queries against the repository under a deadline.
#[derive(Clone)]
pub struct QueryComposer {
    repository: Arc<dyn TimeSeriesRepository>,
    deadline: Duration,
}

impl QueryComposer {
    /// Compose queries against `repository`, each bounded by `deadline`.
    #[must_use]
    pub fn new(repository: Arc<dyn TimeSeriesRepository>, deadline: Duration) -> Self {
        Self {
            repository,
            deadline,
        }
    }

    /// Points with change annotations plus bucket statistics.
    ///
    /// # Errors
    ///
    /// Returns the first repository failure, or
    /// [`QueryError::DeadlineExceeded`] when the deadline elapses first.
    pub async fn compose(
        &self,
        report: ReportType,
        query: SeriesQuery,
    ) -> Result<ComposedSeries, QueryError> {
        let points = self
            .repository
            .interval_with_change(report, query.years, query.page);
        let stats = self.repository.stats(report, query.stats_query());

        let (points, stats) = timeout(self.deadline, async { tokio::try_join!(points, stats) })
            .await
            .map_err(|_| QueryError::DeadlineExceeded(self.deadline))??;

        Ok(ComposedSeries {
            data: points.data,
            meta: points.meta,
            stats: stats.data,
        })
    }

    /// Bucket statistics alone, under the same deadline.
    ///
    /// # Errors
    ///
    /// As for [`QueryComposer::compose`].
    pub async fn compose_stats(
        &self,
        report: ReportType,
        query: SeriesQuery,
    ) -> Result<Paginated<StatsBucket>, QueryError> {
        timeout(self.deadline, self.repository.stats(report, query.stats_query()))
            .await
            .map_err(|_| QueryError::DeadlineExceeded(self.deadline))?
            .map_err(QueryError::from)
    }
}
