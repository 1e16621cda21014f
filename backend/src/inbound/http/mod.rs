//! HTTP inbound adapter exposing REST endpoints.

pub mod dashboard;
pub mod economic;
pub mod error;
pub mod health;
pub mod schemas;
pub mod state;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api/v1` endpoint on `cfg`.
///
/// Fixed segments (`dashboard`, `treasury_yield`) are registered ahead of the
/// `{report}` catch-all so they are never read as report slugs.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(economic::query_config())
        .service(dashboard::get_dashboard)
        .service(economic::get_treasury_stats)
        .service(economic::get_treasury_series)
        .service(economic::get_series_stats)
        .service(economic::get_series);
}
