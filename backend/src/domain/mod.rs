//! Domain primitives, ports, and services.
//!
//! Purpose: Define the strongly typed report model, the ports adapters
//! implement, and the services that keep stored series in step with the
//! provider and answer queries over them. Types are immutable once built;
//! serialisation contracts (serde) are documented on each type.
//!
//! Public surface:
//! - Error: API error response payload.
//! - ReportType / ReportMetadata: series identity and per-report state.
//! - RateLimiter, TaskScheduler, ReconciliationEngine: the sync pipeline.
//! - QueryComposer, DashboardService: the read side.

pub mod dashboard;
pub mod error;
pub mod ports;
pub mod query_composer;
pub mod rate_limiter;
pub mod reconciliation;
pub mod report;
pub mod scheduler;
pub mod series;
pub mod sync_jobs;
pub mod trace_id;

pub use self::dashboard::{DashboardService, Summary, SummaryHeader};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::query_composer::{
    ComposedSeries, DEFAULT_QUERY_DEADLINE, MAX_BUCKET_DAYS, MAX_YEARS, QueryComposer, QueryError,
    SeriesQuery, SeriesQueryError,
};
pub use self::rate_limiter::{RateLimitExceeded, RateLimiter, RateLimiterConfig};
pub use self::reconciliation::{
    ReconcileError, ReconcileOutcome, ReconcileStats, ReconciliationConfig,
    ReconciliationEngine, ReconciliationPorts, SyncRequest,
};
pub use self::report::{Interval, Maturity, ReportMetadata, ReportType};
pub use self::scheduler::{
    MIN_INITIAL_DELAY, ShutdownSignal, ShutdownTrigger, TaskScheduler, shutdown_on_os_signal,
};
pub use self::series::{EconomicPoint, EconomicPointWithChange, StatsBucket, percentage_change};
pub use self::sync_jobs::SyncJobs;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
