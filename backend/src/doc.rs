//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: the economic series, dashboard, and health endpoints
//! - **Schemas**: domain type wrappers from
//!   [`crate::inbound::http::schemas`] that provide OpenAPI definitions
//!   without coupling domain types to the utoipa framework
//!
//! The generated document is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::schemas::{
    ComposedSeriesSchema, EconomicPointSchema, ErrorCodeSchema, ErrorSchema, PageMetadataSchema,
    StatsBucketSchema, StatsPageSchema, SummaryHeaderSchema, SummarySchema,
};
use utoipa::OpenApi;

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pulse backend API",
        description = "Read access to synchronised economic time series and health probes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::dashboard::get_dashboard,
        crate::inbound::http::economic::get_series,
        crate::inbound::http::economic::get_series_stats,
        crate::inbound::http::economic::get_treasury_series,
        crate::inbound::http::economic::get_treasury_stats,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        EconomicPointSchema,
        StatsBucketSchema,
        PageMetadataSchema,
        ComposedSeriesSchema,
        StatsPageSchema,
        SummarySchema,
        SummaryHeaderSchema
    )),
    tags(
        (name = "economic", description = "Economic series and dashboard summaries"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
