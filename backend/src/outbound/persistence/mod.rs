//! PostgreSQL persistence adapters using Diesel.
//!
//! Concrete implementations of the time-series and report metadata ports,
//! backed by PostgreSQL through `diesel-async` and `bb8` connection pooling.
//!
//! - **Thin adapters**: repositories only translate between SQL rows and
//!   domain types. No business logic resides here.
//! - **Closed table set**: per-report table names come from
//!   [`crate::domain::ReportType::table_name`], never from requests.
//! - **Strongly typed errors**: database failures map onto the port error
//!   enums as `connection` or `query`.
//!
//! # Example
//!
//! ```ignore
//! use pulse_backend::outbound::persistence::{
//!     DieselTimeSeriesRepository, PoolConfig, RetryPolicy, connect_with_retry,
//! };
//!
//! let pool = connect_with_retry(PoolConfig::new(url), RetryPolicy::default()).await?;
//! let series = DieselTimeSeriesRepository::new(pool);
//! ```

pub(crate) mod diesel_helpers;
mod diesel_report_metadata_repository;
mod diesel_time_series_repository;
mod migrations;
mod pool;

pub use diesel_report_metadata_repository::DieselReportMetadataRepository;
pub use diesel_time_series_repository::DieselTimeSeriesRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_migrations};
pub use pool::{
    DbPool, PoolConfig, PoolError, RetryPolicy, connect_with_retry, retry_with_backoff,
};
