//! Driven port for per-report metadata rows.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::ReportMetadata;

define_port_error! {
    /// Errors raised by report metadata persistence adapters.
    pub enum ReportMetadataRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "report metadata repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "report metadata repository query failed: {message}",
    }
}

/// Port for reading report metadata and recording successful pulls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportMetadataRepository: Send + Sync {
    /// Every metadata row.
    async fn list_reports(&self) -> Result<Vec<ReportMetadata>, ReportMetadataRepositoryError>;

    /// The metadata row for `slug`, if one exists.
    async fn find_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ReportMetadata>, ReportMetadataRepositoryError>;

    /// Set the row's last pull date to the store's current time.
    async fn touch_last_pull(&self, slug: &str) -> Result<(), ReportMetadataRepositoryError>;
}

/// Fixture implementation with no rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureReportMetadataRepository;

#[async_trait]
impl ReportMetadataRepository for FixtureReportMetadataRepository {
    async fn list_reports(&self) -> Result<Vec<ReportMetadata>, ReportMetadataRepositoryError> {
        Ok(Vec::new())
    }

    async fn find_by_slug(
        &self,
        _slug: &str,
    ) -> Result<Option<ReportMetadata>, ReportMetadataRepositoryError> {
        Ok(None)
    }

    async fn touch_last_pull(&self, _slug: &str) -> Result<(), ReportMetadataRepositoryError> {
        Ok(())
    }
}
