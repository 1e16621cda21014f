//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.
//!
//! The schema wrappers mirror the structure of their corresponding domain
//! types but live in the inbound adapter layer where framework concerns belong.
#![expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// A dependency required to answer the request is unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// The client sent requests faster than it is allowed to.
    #[schema(rename = "too_many_requests")]
    TooManyRequests,
    /// The request did not complete before its deadline.
    #[schema(rename = "gateway_timeout")]
    GatewayTimeout,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "invalid query parameters")]
    message: String,
    /// Correlation identifier for tracing this error across systems.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Field-level validation failures, when present.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::EconomicPointWithChange`].
#[derive(ToSchema)]
#[schema(as = crate::domain::EconomicPointWithChange, rename_all = "camelCase")]
pub struct EconomicPointSchema {
    #[schema(value_type = String, format = Date, example = "2024-02-01")]
    date: String,
    /// Decimal rendered as a string.
    #[schema(example = "310.326")]
    value: String,
    /// Percentage change against the previous point; null for the oldest.
    #[schema(example = "0.3099")]
    change: Option<String>,
}

/// OpenAPI schema for [`crate::domain::StatsBucket`].
#[derive(ToSchema)]
#[schema(as = crate::domain::StatsBucket, rename_all = "camelCase")]
pub struct StatsBucketSchema {
    #[schema(value_type = String, format = Date)]
    bucket_start: String,
    #[schema(value_type = String, format = Date)]
    bucket_end: String,
    /// Null when the bucket holds a single point.
    stddev: Option<String>,
    mean: String,
    min: String,
    max: String,
}

/// OpenAPI schema for [`pagination::PageMetadata`].
#[derive(ToSchema)]
#[schema(as = pagination::PageMetadata, rename_all = "camelCase")]
pub struct PageMetadataSchema {
    current_page: u32,
    page_size: u32,
    first_page: u32,
    last_page: u64,
    total_records: u64,
}

/// OpenAPI schema for [`crate::domain::ComposedSeries`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ComposedSeries)]
pub struct ComposedSeriesSchema {
    data: Vec<EconomicPointSchema>,
    meta: PageMetadataSchema,
    stats: Vec<StatsBucketSchema>,
}

/// OpenAPI schema for a page of [`crate::domain::StatsBucket`].
#[derive(ToSchema)]
pub struct StatsPageSchema {
    data: Vec<StatsBucketSchema>,
    meta: PageMetadataSchema,
}

/// OpenAPI schema for [`crate::domain::Summary`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Summary, rename_all = "camelCase")]
pub struct SummarySchema {
    #[schema(example = "Treasury Yield - 10 Years")]
    name: String,
    #[schema(value_type = String, format = Date)]
    last_update: String,
    value: String,
    change: Option<String>,
}

/// OpenAPI schema for [`crate::domain::SummaryHeader`].
#[derive(ToSchema)]
#[schema(as = crate::domain::SummaryHeader, rename_all = "camelCase")]
pub struct SummaryHeaderSchema {
    #[schema(example = "Treasury Yields")]
    header_name: String,
    summaries: Vec<SummarySchema>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn property_names<T: PartialSchema>() -> Vec<String> {
        match T::schema() {
            RefOr::T(Schema::Object(object)) => object.properties.keys().cloned().collect(),
            other => panic!("expected object schema, got {other:?}"),
        }
    }

    #[rstest]
    fn error_schema_uses_camel_case_trace_id() {
        let names = property_names::<ErrorSchema>();
        assert!(names.contains(&"traceId".to_owned()));
        assert!(names.contains(&"details".to_owned()));
    }

    #[rstest]
    fn stats_bucket_schema_mirrors_wire_names() {
        let names = property_names::<StatsBucketSchema>();
        for expected in ["bucketStart", "bucketEnd", "stddev", "mean", "min", "max"] {
            assert!(names.contains(&expected.to_owned()), "missing {expected}");
        }
    }

    #[rstest]
    fn composed_series_schema_has_three_sections() {
        let names = property_names::<ComposedSeriesSchema>();
        assert_eq!(names, vec!["data", "meta", "stats"]);
    }
}
