//! Provider-to-store reconciliation for one report at a time.
//!
//! A cycle loads the report's metadata, skips when the last pull is fresh,
//! then fetches the full provider series under the shared rate limiter and
//! writes whatever the store is missing. An empty store takes the whole batch
//! in one write; otherwise points are inserted one at a time, keyed by date,
//! and a failed insert is logged and counted without stopping the cycle.
//!
//! Provider failures never touch stored points or the last pull date. Every
//! port call is bounded by [`ReconciliationConfig::operation_timeout`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    EconomicDataSource, EconomicDataSourceError, FetchOptions, ReportMetadataRepository,
    TimeSeriesRepository, TimeSeriesRepositoryError,
};
use crate::domain::rate_limiter::RateLimiter;
use crate::domain::{EconomicPoint, ReportMetadata, ReportType};

mod outcome;
mod transform;

pub use outcome::{ReconcileError, ReconcileOutcome, ReconcileStats, SkipReason};
pub use transform::{TransformedBatch, transform_records};

/// Timing knobs for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// A pull younger than this skips the cycle.
    pub freshness_window: TimeDelta,
    /// Upper bound on each port call.
    pub operation_timeout: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            freshness_window: TimeDelta::hours(24),
            operation_timeout: Duration::from_secs(10),
        }
    }
}

/// Port bundle required by the engine.
#[derive(Clone)]
pub struct ReconciliationPorts {
    /// Stored series.
    pub time_series: Arc<dyn TimeSeriesRepository>,
    /// Per-report metadata rows.
    pub reports: Arc<dyn ReportMetadataRepository>,
    /// External data provider.
    pub source: Arc<dyn EconomicDataSource>,
    /// Limiter shared by every report.
    pub limiter: Arc<RateLimiter>,
}

/// One reconciliation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    /// Report to reconcile.
    pub report: ReportType,
    /// Provider parameters for the fetch.
    pub options: FetchOptions,
}

impl SyncRequest {
    /// Request using the report's default fetch options.
    #[must_use]
    pub const fn for_report(report: ReportType) -> Self {
        Self {
            report,
            options: FetchOptions::for_report(report),
        }
    }
}

/// Domain-owned reconciliation service.
pub struct ReconciliationEngine {
    time_series: Arc<dyn TimeSeriesRepository>,
    reports: Arc<dyn ReportMetadataRepository>,
    source: Arc<dyn EconomicDataSource>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    config: ReconciliationConfig,
}

impl ReconciliationEngine {
    /// Wire the engine to its ports, clock and tuning.
    #[must_use]
    pub fn new(
        ports: ReconciliationPorts,
        clock: Arc<dyn Clock>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            time_series: ports.time_series,
            reports: ports.reports,
            source: ports.source,
            limiter: ports.limiter,
            clock,
            config,
        }
    }

    /// Run one cycle for `request`.
    ///
    /// Safe to call repeatedly: a second run against unchanged provider data
    /// inserts nothing.
    pub async fn reconcile(&self, request: &SyncRequest) -> ReconcileOutcome {
        let report = request.report;
        match self.run_cycle(request).await {
            Ok(outcome) => {
                if let ReconcileOutcome::Completed(stats) = &outcome {
                    info!(
                        report = %report,
                        fetched = stats.fetched,
                        dropped = stats.dropped,
                        inserted = stats.inserted,
                        failed_inserts = stats.failed_inserts,
                        bulk = stats.bulk,
                        "reconciliation completed"
                    );
                }
                outcome
            }
            Err(error) => {
                warn!(report = %report, kind = error.kind(), error = %error, "reconciliation failed");
                ReconcileOutcome::Failed(error)
            }
        }
    }

    async fn run_cycle(&self, request: &SyncRequest) -> Result<ReconcileOutcome, ReconcileError> {
        let report = request.report;
        let metadata = self.load_metadata(report).await?;

        let now = self.clock.utc();
        if metadata.is_fresh(now, self.config.freshness_window) {
            debug!(report = %report, last_pull = %metadata.last_pull_date, "report is fresh, skipping");
            return Ok(ReconcileOutcome::Skipped(SkipReason::Fresh {
                last_pull_date: metadata.last_pull_date,
            }));
        }

        info!(report = %report, "reconciliation started");
        let stored = self
            .bounded(self.time_series.get_all(report))
            .await
            .unwrap_or_else(|| Err(self.repository_timeout("get_all")))
            .map_err(ReconcileError::RepositoryRead)?;

        self.limiter
            .try_acquire()
            .map_err(ReconcileError::RateLimited)?;

        let payload = self
            .bounded(self.source.fetch_report(report, &request.options))
            .await
            .unwrap_or_else(|| {
                Err(EconomicDataSourceError::timeout(format!(
                    "provider call exceeded {:?}",
                    self.config.operation_timeout
                )))
            })
            .map_err(ReconcileError::Provider)?;

        let fetched = payload.data.len();
        let batch = transform_records(&payload.data);
        if batch.points.is_empty() {
            return Err(ReconcileError::EmptyPayload);
        }

        self.advance_last_pull(report).await;

        let mut stats = ReconcileStats {
            fetched,
            dropped: batch.dropped,
            ..ReconcileStats::default()
        };
        if stored.is_empty() {
            self.insert_all(report, &batch.points).await?;
            stats.inserted = batch.points.len();
            stats.bulk = true;
        } else {
            self.insert_missing(report, &stored, batch.points, &mut stats)
                .await;
        }
        Ok(ReconcileOutcome::Completed(stats))
    }

    async fn load_metadata(&self, report: ReportType) -> Result<ReportMetadata, ReconcileError> {
        let slug = report.slug();
        let unavailable = |message: String| ReconcileError::MetadataUnavailable {
            slug: slug.to_owned(),
            message,
        };
        match self.bounded(self.reports.find_by_slug(slug)).await {
            Some(Ok(Some(metadata))) => Ok(metadata),
            Some(Ok(None)) => Err(unavailable("no metadata row".to_owned())),
            Some(Err(error)) => Err(unavailable(error.to_string())),
            None => Err(unavailable("metadata lookup timed out".to_owned())),
        }
    }

    async fn advance_last_pull(&self, report: ReportType) {
        let result = self
            .bounded(self.reports.touch_last_pull(report.slug()))
            .await;
        match result {
            Some(Ok(())) => {}
            Some(Err(error)) => {
                warn!(report = %report, error = %error, "failed to advance last pull date");
            }
            None => warn!(report = %report, "advancing last pull date timed out"),
        }
    }

    async fn insert_all(
        &self,
        report: ReportType,
        points: &[EconomicPoint],
    ) -> Result<(), ReconcileError> {
        self.bounded(self.time_series.insert_many(report, points))
            .await
            .unwrap_or_else(|| Err(self.repository_timeout("insert_many")))
            .map_err(ReconcileError::RepositoryWrite)
    }

    async fn insert_missing(
        &self,
        report: ReportType,
        stored: &[EconomicPoint],
        fetched: Vec<EconomicPoint>,
        stats: &mut ReconcileStats,
    ) {
        let known: HashSet<_> = stored.iter().map(|point| point.date).collect();
        for point in fetched.into_iter().filter(|point| !known.contains(&point.date)) {
            let result = self
                .bounded(self.time_series.insert(report, &point))
                .await
                .unwrap_or_else(|| Err(self.repository_timeout("insert")));
            match result {
                Ok(()) => stats.inserted += 1,
                Err(error) => {
                    warn!(report = %report, date = %point.date, error = %error, "point insert failed");
                    stats.failed_inserts += 1;
                }
            }
        }
    }

    async fn bounded<T>(&self, operation: impl Future<Output = T>) -> Option<T> {
        tokio::time::timeout(self.config.operation_timeout, operation)
            .await
            .ok()
    }

    fn repository_timeout(&self, operation: &str) -> TimeSeriesRepositoryError {
        TimeSeriesRepositoryError::connection(format!(
            "{operation} exceeded {:?}",
            self.config.operation_timeout
        ))
    }
}

#[cfg(test)]
mod tests;
