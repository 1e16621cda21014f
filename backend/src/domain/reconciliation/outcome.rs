//! Result types for one reconciliation cycle.

use chrono::{DateTime, Utc};

use crate::domain::ports::{EconomicDataSourceError, TimeSeriesRepositoryError};
use crate::domain::rate_limiter::RateLimitExceeded;

/// Why a cycle ended before calling the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The report was pulled within the freshness window.
    Fresh { last_pull_date: DateTime<Utc> },
}

/// Counters for a cycle that reached the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Observations returned by the provider.
    pub fetched: usize,
    /// Observations discarded during parsing.
    pub dropped: usize,
    /// Points written to the store.
    pub inserted: usize,
    /// Points whose single insert failed.
    pub failed_inserts: usize,
    /// True when the store was empty and the batch path ran.
    pub bulk: bool,
}

/// Why a cycle stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The report's metadata row could not be read.
    #[error("metadata for {slug} is unavailable: {message}")]
    MetadataUnavailable { slug: String, message: String },
    /// Stored points could not be listed.
    #[error("reading stored points failed: {0}")]
    RepositoryRead(TimeSeriesRepositoryError),
    /// The limiter refused the provider call.
    #[error(transparent)]
    RateLimited(RateLimitExceeded),
    /// The provider call failed.
    #[error("provider fetch failed: {0}")]
    Provider(EconomicDataSourceError),
    /// Every observation was dropped during parsing.
    #[error("provider returned no usable observations")]
    EmptyPayload,
    /// The batch write failed.
    #[error("writing points failed: {0}")]
    RepositoryWrite(TimeSeriesRepositoryError),
}

impl ReconcileError {
    /// Stable snake_case label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MetadataUnavailable { .. } => "metadata_unavailable",
            Self::RepositoryRead(_) => "repository_read",
            Self::RateLimited(_) => "rate_limited",
            Self::Provider(_) => "provider",
            Self::EmptyPayload => "empty_payload",
            Self::RepositoryWrite(_) => "repository_write",
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing was fetched.
    Skipped(SkipReason),
    /// The store was updated.
    Completed(ReconcileStats),
    /// The cycle stopped on an error.
    Failed(ReconcileError),
}

impl ReconcileOutcome {
    /// Counters when the cycle completed.
    #[must_use]
    pub const fn stats(&self) -> Option<&ReconcileStats> {
        match self {
            Self::Completed(stats) => Some(stats),
            Self::Skipped(_) | Self::Failed(_) => None,
        }
    }

    /// Failure when the cycle stopped early.
    #[must_use]
    pub const fn error(&self) -> Option<&ReconcileError> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Skipped(_) | Self::Completed(_) => None,
        }
    }
}
