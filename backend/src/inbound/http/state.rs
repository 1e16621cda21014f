//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::TimeSeriesRepository;
use crate::domain::{DashboardService, QueryComposer};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Series and statistics queries.
    pub composer: QueryComposer,
    /// Dashboard summaries.
    pub dashboard: DashboardService,
}

impl HttpState {
    /// Build both read services over one repository, sharing `deadline`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use pulse_backend::domain::ports::FixtureTimeSeriesRepository;
    /// use pulse_backend::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(Arc::new(FixtureTimeSeriesRepository), Duration::from_secs(10));
    /// let _ = state.composer.clone();
    /// ```
    pub fn new(repository: Arc<dyn TimeSeriesRepository>, deadline: Duration) -> Self {
        Self {
            composer: QueryComposer::new(Arc::clone(&repository), deadline),
            dashboard: DashboardService::new(repository, deadline),
        }
    }
}
