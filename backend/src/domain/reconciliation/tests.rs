//! Behaviour tests for reconciliation cycles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use rstest::{fixture, rstest};
use rust_decimal_macros::dec;

use super::*;
use crate::domain::ports::{MockEconomicDataSource, ProviderReport, RawObservation};
use crate::domain::rate_limiter::{RateLimitExceeded, RateLimiterConfig};
use crate::domain::Maturity;
use crate::test_support::{
    InMemoryReportMetadataRepository, InMemoryTimeSeriesRepository, MutableClock,
    ScriptedDataSource,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 26, 12, 0, 0)
        .single()
        .expect("valid start time")
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn cpi_payload(rows: &[(&str, &str)]) -> ProviderReport {
    ProviderReport {
        name: "Consumer Price Index for all Urban Consumers".to_owned(),
        interval: "monthly".to_owned(),
        unit: "index 1982-1984=100".to_owned(),
        data: rows
            .iter()
            .map(|(date, value)| RawObservation::new(*date, *value))
            .collect(),
    }
}

struct Harness {
    clock: Arc<MutableClock>,
    series: Arc<InMemoryTimeSeriesRepository>,
    reports: Arc<InMemoryReportMetadataRepository>,
    source: Arc<ScriptedDataSource>,
    engine: ReconciliationEngine,
}

impl Harness {
    fn new(limits: RateLimiterConfig) -> Self {
        let clock = Arc::new(MutableClock::new(start()));
        let series = Arc::new(InMemoryTimeSeriesRepository::new(clock.clone()));
        let reports = Arc::new(InMemoryReportMetadataRepository::new(clock.clone()));
        reports.seed_all();
        let source = Arc::new(ScriptedDataSource::new());
        let limiter = Arc::new(RateLimiter::new(limits, clock.clone()));
        let engine = ReconciliationEngine::new(
            ReconciliationPorts {
                time_series: series.clone(),
                reports: reports.clone(),
                source: source.clone(),
                limiter,
            },
            clock.clone(),
            ReconciliationConfig::default(),
        );
        Self {
            clock,
            series,
            reports,
            source,
            engine,
        }
    }

    fn last_pull(&self, report: ReportType) -> DateTime<Utc> {
        self.reports
            .get(report.slug())
            .expect("metadata row")
            .last_pull_date
    }

    fn mark_pulled_at(&self, report: ReportType, at: DateTime<Utc>) {
        let mut row = self.reports.get(report.slug()).expect("metadata row");
        row.last_pull_date = at;
        self.reports.upsert(row);
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new(RateLimiterConfig::default())
}

const CPI: SyncRequest = SyncRequest::for_report(ReportType::Cpi);

#[rstest]
#[tokio::test]
async fn fresh_report_is_skipped_without_provider_call(harness: Harness) {
    let pulled = start() - TimeDelta::hours(23);
    harness.mark_pulled_at(ReportType::Cpi, pulled);

    let outcome = harness.engine.reconcile(&CPI).await;

    assert_eq!(
        outcome,
        ReconcileOutcome::Skipped(SkipReason::Fresh {
            last_pull_date: pulled
        })
    );
    assert!(harness.source.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn stale_report_at_exactly_the_window_is_reconciled(harness: Harness) {
    harness.mark_pulled_at(ReportType::Cpi, start() - TimeDelta::hours(24));
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[("2024-01-01", "308.417")])),
    );

    let outcome = harness.engine.reconcile(&CPI).await;

    assert!(outcome.stats().is_some(), "unexpected outcome {outcome:?}");
}

#[rstest]
#[tokio::test]
async fn empty_store_takes_the_bulk_path(harness: Harness) {
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[
            ("2024-02-01", "310.326"),
            ("2024-01-01", "308.417"),
            ("2023-12-01", "."),
        ])),
    );

    let outcome = harness.engine.reconcile(&CPI).await;

    assert_eq!(
        outcome,
        ReconcileOutcome::Completed(ReconcileStats {
            fetched: 3,
            dropped: 1,
            inserted: 2,
            failed_inserts: 0,
            bulk: true,
        })
    );
    assert_eq!(harness.series.insert_many_calls(), 1);
    assert_eq!(harness.series.insert_calls(), 0);
    assert_eq!(
        harness.series.points(ReportType::Cpi),
        vec![
            EconomicPoint::new(day(2024, 2, 1), dec!(310.326)),
            EconomicPoint::new(day(2024, 1, 1), dec!(308.417)),
        ]
    );
    assert_eq!(harness.last_pull(ReportType::Cpi), start());
}

#[rstest]
#[tokio::test]
async fn second_run_against_unchanged_data_inserts_nothing(harness: Harness) {
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[("2024-02-01", "310.326"), ("2024-01-01", "308.417")])),
    );
    harness.engine.reconcile(&CPI).await;
    harness.clock.advance(Duration::from_secs(25 * 60 * 60));

    let outcome = harness.engine.reconcile(&CPI).await;

    let stats = outcome.stats().copied().expect("completed");
    assert_eq!(stats.inserted, 0);
    assert!(!stats.bulk);
    assert_eq!(harness.series.points(ReportType::Cpi).len(), 2);
    assert_eq!(harness.source.calls().len(), 2);
}

#[rstest]
#[tokio::test]
async fn non_empty_store_inserts_only_missing_dates(harness: Harness) {
    harness.series.seed(
        ReportType::Cpi,
        vec![EconomicPoint::new(day(2024, 1, 1), dec!(1))],
    );
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[
            ("2024-03-01", "312.230"),
            ("2024-02-01", "310.326"),
            ("2024-01-01", "308.417"),
        ])),
    );

    let outcome = harness.engine.reconcile(&CPI).await;

    let stats = outcome.stats().copied().expect("completed");
    assert_eq!(stats.inserted, 2);
    assert!(!stats.bulk);
    assert_eq!(harness.series.insert_calls(), 2);
    assert_eq!(harness.series.insert_many_calls(), 0);
    let stored = harness.series.points(ReportType::Cpi);
    assert_eq!(stored.len(), 3);
    assert_eq!(
        stored.last(),
        Some(&EconomicPoint::new(day(2024, 1, 1), dec!(1))),
        "existing values are never rewritten"
    );
}

#[rstest]
#[tokio::test]
async fn failed_single_insert_is_counted_and_the_loop_continues(harness: Harness) {
    harness.series.seed(
        ReportType::Cpi,
        vec![EconomicPoint::new(day(2024, 1, 1), dec!(308.417))],
    );
    harness.series.fail_insert_on(day(2024, 2, 1));
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[
            ("2024-03-01", "312.230"),
            ("2024-02-01", "310.326"),
            ("2024-01-01", "308.417"),
        ])),
    );

    let outcome = harness.engine.reconcile(&CPI).await;

    let stats = outcome.stats().copied().expect("completed");
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.failed_inserts, 1);
    let dates: Vec<_> = harness
        .series
        .points(ReportType::Cpi)
        .into_iter()
        .map(|point| point.date)
        .collect();
    assert_eq!(dates, vec![day(2024, 3, 1), day(2024, 1, 1)]);
}

#[rstest]
#[tokio::test]
async fn provider_failure_leaves_points_and_last_pull_untouched(harness: Harness) {
    harness.source.respond_with(
        ReportType::Cpi,
        Err(EconomicDataSourceError::transport("connection reset")),
    );

    let outcome = harness.engine.reconcile(&CPI).await;

    assert_eq!(
        outcome.error(),
        Some(&ReconcileError::Provider(EconomicDataSourceError::transport(
            "connection reset"
        )))
    );
    assert!(harness.series.points(ReportType::Cpi).is_empty());
    assert!(harness.reports.touches().is_empty());
    assert_eq!(harness.last_pull(ReportType::Cpi), DateTime::<Utc>::default());
}

#[rstest]
#[tokio::test]
async fn payload_without_usable_values_is_a_failure(harness: Harness) {
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[("2024-01-01", "."), ("2023-12-01", ".")])),
    );

    let outcome = harness.engine.reconcile(&CPI).await;

    assert_eq!(outcome.error(), Some(&ReconcileError::EmptyPayload));
    assert!(harness.reports.touches().is_empty());
    assert_eq!(harness.series.insert_many_calls(), 0);
}

#[rstest]
#[tokio::test]
async fn exhausted_limiter_stops_before_the_provider() {
    let harness = Harness::new(RateLimiterConfig {
        minute_capacity: 1,
        ..RateLimiterConfig::default()
    });
    let ten_year = SyncRequest::for_report(ReportType::TreasuryYield(Maturity::TenYear));
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[("2024-01-01", "308.417")])),
    );

    harness.engine.reconcile(&CPI).await;
    let outcome = harness.engine.reconcile(&ten_year).await;

    assert_eq!(
        outcome.error(),
        Some(&ReconcileError::RateLimited(RateLimitExceeded::Minute))
    );
    assert_eq!(harness.source.calls().len(), 1);
}

#[rstest]
#[tokio::test]
async fn treasury_requests_carry_their_maturity(harness: Harness) {
    let report = ReportType::TreasuryYield(Maturity::ThirtyYear);
    harness.source.respond_with(
        report,
        Ok(cpi_payload(&[("2024-01-02", "4.08")])),
    );

    harness.engine.reconcile(&SyncRequest::for_report(report)).await;

    let calls = harness.source.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.maturity, Some(Maturity::ThirtyYear));
    assert_eq!(harness.series.points(report).len(), 1);
}

#[rstest]
#[tokio::test]
async fn missing_metadata_row_is_reported(harness: Harness) {
    let clock = harness.clock.clone();
    let reports = Arc::new(InMemoryReportMetadataRepository::new(clock.clone()));
    let engine = ReconciliationEngine::new(
        ReconciliationPorts {
            time_series: harness.series.clone(),
            reports,
            source: harness.source.clone(),
            limiter: Arc::new(RateLimiter::new(RateLimiterConfig::default(), clock.clone())),
        },
        clock,
        ReconciliationConfig::default(),
    );

    let outcome = engine.reconcile(&CPI).await;

    assert!(matches!(
        outcome.error(),
        Some(ReconcileError::MetadataUnavailable { slug, .. }) if slug == "cpi"
    ));
    assert!(harness.source.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn unreadable_store_aborts_before_the_provider(harness: Harness) {
    harness.series.fail_reads();

    let outcome = harness.engine.reconcile(&CPI).await;

    assert!(matches!(outcome.error(), Some(ReconcileError::RepositoryRead(_))));
    assert!(harness.source.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn bulk_write_failure_is_reported(harness: Harness) {
    harness.series.fail_writes();
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[("2024-01-01", "308.417")])),
    );

    let outcome = harness.engine.reconcile(&CPI).await;

    assert!(matches!(outcome.error(), Some(ReconcileError::RepositoryWrite(_))));
    assert_eq!(harness.reports.touches(), vec!["cpi".to_owned()]);
}

#[rstest]
#[tokio::test]
async fn failing_to_advance_last_pull_does_not_abort(harness: Harness) {
    harness.reports.fail_touch();
    harness.source.respond_with(
        ReportType::Cpi,
        Ok(cpi_payload(&[("2024-01-01", "308.417")])),
    );

    let outcome = harness.engine.reconcile(&CPI).await;

    assert_eq!(outcome.stats().map(|stats| stats.inserted), Some(1));
}

struct StalledSource;

#[async_trait]
impl EconomicDataSource for StalledSource {
    async fn fetch_report(
        &self,
        _report: ReportType,
        _options: &FetchOptions,
    ) -> Result<ProviderReport, EconomicDataSourceError> {
        std::future::pending().await
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_provider_times_out(harness: Harness) {
    let engine = ReconciliationEngine::new(
        ReconciliationPorts {
            time_series: harness.series.clone(),
            reports: harness.reports.clone(),
            source: Arc::new(StalledSource),
            limiter: Arc::new(RateLimiter::new(
                RateLimiterConfig::default(),
                harness.clock.clone(),
            )),
        },
        harness.clock.clone(),
        ReconciliationConfig::default(),
    );

    let outcome = engine.reconcile(&CPI).await;

    assert!(matches!(
        outcome.error(),
        Some(ReconcileError::Provider(EconomicDataSourceError::Timeout { .. }))
    ));
    assert!(harness.reports.touches().is_empty());
}

#[rstest]
#[tokio::test]
async fn fresh_report_never_reaches_a_mocked_provider(harness: Harness) {
    harness.mark_pulled_at(ReportType::Cpi, start());
    let mut source = MockEconomicDataSource::new();
    source.expect_fetch_report().times(0);
    let engine = ReconciliationEngine::new(
        ReconciliationPorts {
            time_series: harness.series.clone(),
            reports: harness.reports.clone(),
            source: Arc::new(source),
            limiter: Arc::new(RateLimiter::new(
                RateLimiterConfig::default(),
                harness.clock.clone(),
            )),
        },
        harness.clock.clone(),
        ReconciliationConfig::default(),
    );

    let outcome = engine.reconcile(&CPI).await;

    assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
}
