//! Start-up wiring of one reconciliation scheduler per synced report.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::TraceId;
use crate::domain::ports::ReportMetadataRepository;
use crate::domain::reconciliation::{ReconciliationEngine, SyncRequest};
use crate::domain::scheduler::{
    MIN_INITIAL_DELAY, STEADY_INTERVAL, ScheduledJob, ScheduledTask, ShutdownSignal,
    TaskScheduler,
};
use crate::domain::{ReportMetadata, ReportType};

/// Spawns and owns the sync schedulers.
pub struct SyncJobs {
    engine: Arc<ReconciliationEngine>,
    reports: Arc<dyn ReportMetadataRepository>,
    interval: Duration,
}

impl SyncJobs {
    /// Jobs driving `engine` on the daily steady interval.
    #[must_use]
    pub fn new(engine: Arc<ReconciliationEngine>, reports: Arc<dyn ReportMetadataRepository>) -> Self {
        Self {
            engine,
            reports,
            interval: STEADY_INTERVAL,
        }
    }

    /// Override the recurring interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn a scheduler for every [`ReportType::synced`] report.
    ///
    /// Initial delays come from the metadata rows read here; each firing
    /// re-reads its row, so the freshness check always sees the latest pull.
    /// When no metadata can be read, the failure is logged and nothing is
    /// scheduled.
    pub async fn start(&self, shutdown: &ShutdownSignal) -> Vec<JoinHandle<()>> {
        let rows = match self.reports.list_reports().await {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => {
                error!("no report metadata found, sync jobs not started");
                return Vec::new();
            }
            Err(error) => {
                error!(error = %error, "failed to load report metadata, sync jobs not started");
                return Vec::new();
            }
        };
        let by_slug: HashMap<&str, &ReportMetadata> =
            rows.iter().map(|row| (row.slug.as_str(), row)).collect();

        let handles: Vec<_> = ReportType::synced()
            .into_iter()
            .map(|report| {
                let initial_delay = by_slug
                    .get(report.slug())
                    .map_or(MIN_INITIAL_DELAY, |row| row.initial_delay());
                let task = ScheduledTask::new(report.slug(), initial_delay, self.interval);
                TaskScheduler::spawn(task, shutdown.clone(), self.job_for(report))
            })
            .collect();
        info!(schedulers = handles.len(), "sync jobs started");
        handles
    }

    fn job_for(&self, report: ReportType) -> ScheduledJob {
        let engine = Arc::clone(&self.engine);
        let request = SyncRequest::for_report(report);
        Arc::new(move || {
            let engine = Arc::clone(&engine);
            Box::pin(async move {
                TraceId::scope(TraceId::generate(), async move {
                    engine.reconcile(&request).await;
                })
                .await;
            })
        })
    }
}
