//! Economic series read endpoints.
//!
//! ```text
//! GET /api/v1/economic/{report}
//! GET /api/v1/economic/{report}/stats
//! GET /api/v1/economic/treasury_yield/{maturity}
//! GET /api/v1/economic/treasury_yield/{maturity}/stats
//! ```

use actix_web::{HttpRequest, get, web};
use pagination::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, Paginated};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::ports::{DEFAULT_BUCKET_DAYS, DEFAULT_YEARS};
use crate::domain::{ComposedSeries, Error, Maturity, ReportType, SeriesQuery, StatsBucket};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::query_failure;
use crate::inbound::http::schemas::{ComposedSeriesSchema, ErrorSchema, StatsPageSchema};
use crate::inbound::http::state::HttpState;

/// Query string accepted by every series endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SeriesParams {
    /// Lookback window in years, at most 100. Defaults to 10.
    pub years: Option<u32>,
    /// One-based page number. Defaults to 1.
    pub page: Option<u32>,
    /// Items per page, at most 100. Defaults to 12.
    pub page_size: Option<u32>,
    /// Statistics bucket width in days, at most 36600. Defaults to 365.
    pub time_bucket_days: Option<u32>,
}

impl SeriesParams {
    fn into_query(self) -> Result<SeriesQuery, Error> {
        SeriesQuery::new(
            self.years.unwrap_or(DEFAULT_YEARS),
            self.page.unwrap_or(DEFAULT_PAGE),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            self.time_bucket_days.unwrap_or(DEFAULT_BUCKET_DAYS),
        )
        .map_err(Error::from)
    }
}

/// Extractor configuration turning malformed query strings into the JSON
/// error envelope.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|error, _request: &HttpRequest| {
        Error::invalid_request(error.to_string()).into()
    })
}

fn resolve_report(slug: &str) -> Result<ReportType, Error> {
    ReportType::from_slug(slug).ok_or_else(|| Error::not_found(format!("unknown report {slug}")))
}

fn resolve_treasury(segment: &str) -> Result<ReportType, Error> {
    Maturity::from_path_segment(segment)
        .map(ReportType::TreasuryYield)
        .ok_or_else(|| Error::not_found(format!("unknown treasury maturity {segment}")))
}

async fn compose(
    state: &HttpState,
    report: ReportType,
    params: SeriesParams,
) -> ApiResult<web::Json<ComposedSeries>> {
    let query = params.into_query()?;
    state
        .composer
        .compose(report, query)
        .await
        .map(web::Json)
        .map_err(|error| query_failure(report, error))
}

async fn compose_stats(
    state: &HttpState,
    report: ReportType,
    params: SeriesParams,
) -> ApiResult<web::Json<Paginated<StatsBucket>>> {
    let query = params.into_query()?;
    state
        .composer
        .compose_stats(report, query)
        .await
        .map(web::Json)
        .map_err(|error| query_failure(report, error))
}

/// Points with percentage change, page metadata, and bucket statistics.
#[utoipa::path(
    get,
    path = "/api/v1/economic/{report}",
    params(
        ("report" = String, Path, description = "Report slug, e.g. `cpi`"),
        SeriesParams
    ),
    responses(
        (status = 200, description = "Composed series", body = ComposedSeriesSchema),
        (status = 400, description = "Invalid query parameters", body = ErrorSchema),
        (status = 404, description = "Unknown report", body = ErrorSchema),
        (status = 504, description = "Query deadline exceeded", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["economic"],
    operation_id = "getSeries"
)]
#[get("/economic/{report}")]
pub async fn get_series(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    params: web::Query<SeriesParams>,
) -> ApiResult<web::Json<ComposedSeries>> {
    let report = resolve_report(&path.into_inner())?;
    compose(&state, report, params.into_inner()).await
}

/// Bucket statistics only.
#[utoipa::path(
    get,
    path = "/api/v1/economic/{report}/stats",
    params(
        ("report" = String, Path, description = "Report slug, e.g. `cpi`"),
        SeriesParams
    ),
    responses(
        (status = 200, description = "Bucket statistics", body = StatsPageSchema),
        (status = 400, description = "Invalid query parameters", body = ErrorSchema),
        (status = 404, description = "Unknown report", body = ErrorSchema),
        (status = 504, description = "Query deadline exceeded", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["economic"],
    operation_id = "getSeriesStats"
)]
#[get("/economic/{report}/stats")]
pub async fn get_series_stats(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    params: web::Query<SeriesParams>,
) -> ApiResult<web::Json<Paginated<StatsBucket>>> {
    let report = resolve_report(&path.into_inner())?;
    compose_stats(&state, report, params.into_inner()).await
}

/// Treasury yield series at one maturity.
#[utoipa::path(
    get,
    path = "/api/v1/economic/treasury_yield/{maturity}",
    params(
        ("maturity" = String, Path, description = "One of 3m, 2y, 5y, 7y, 10y, 30y"),
        SeriesParams
    ),
    responses(
        (status = 200, description = "Composed series", body = ComposedSeriesSchema),
        (status = 400, description = "Invalid query parameters", body = ErrorSchema),
        (status = 404, description = "Unknown maturity", body = ErrorSchema),
        (status = 504, description = "Query deadline exceeded", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["economic"],
    operation_id = "getTreasurySeries"
)]
#[get("/economic/treasury_yield/{maturity}")]
pub async fn get_treasury_series(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    params: web::Query<SeriesParams>,
) -> ApiResult<web::Json<ComposedSeries>> {
    let report = resolve_treasury(&path.into_inner())?;
    compose(&state, report, params.into_inner()).await
}

/// Treasury yield bucket statistics at one maturity.
#[utoipa::path(
    get,
    path = "/api/v1/economic/treasury_yield/{maturity}/stats",
    params(
        ("maturity" = String, Path, description = "One of 3m, 2y, 5y, 7y, 10y, 30y"),
        SeriesParams
    ),
    responses(
        (status = 200, description = "Bucket statistics", body = StatsPageSchema),
        (status = 400, description = "Invalid query parameters", body = ErrorSchema),
        (status = 404, description = "Unknown maturity", body = ErrorSchema),
        (status = 504, description = "Query deadline exceeded", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["economic"],
    operation_id = "getTreasuryStats"
)]
#[get("/economic/treasury_yield/{maturity}/stats")]
pub async fn get_treasury_stats(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    params: web::Query<SeriesParams>,
) -> ApiResult<web::Json<Paginated<StatsBucket>>> {
    let report = resolve_treasury(&path.into_inner())?;
    compose_stats(&state, report, params.into_inner()).await
}

#[cfg(test)]
mod tests;
