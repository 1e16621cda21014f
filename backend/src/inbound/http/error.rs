//! HTTP adapter mapping for domain errors.
//!
//! Series query failures are translated here: validation problems become a
//! `400` listing every offending parameter, an elapsed deadline becomes a
//! `504`, and repository failures become a redacted `500`. The resulting
//! [`Error`] is rendered as the JSON envelope with the matching status.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::{
    Error, ErrorCode, QueryError, ReportType, SeriesQueryError, TRACE_ID_HEADER,
};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Vec<SeriesQueryError>> for Error {
    fn from(errors: Vec<SeriesQueryError>) -> Self {
        let fields: Vec<_> = errors
            .iter()
            .map(|error| json!({"field": error.field(), "message": error.to_string()}))
            .collect();
        Error::invalid_request("invalid query parameters").with_details(json!({ "errors": fields }))
    }
}

/// Map a failed series query for `report` onto the error envelope.
pub(crate) fn query_failure(report: ReportType, error: QueryError) -> Error {
    match error {
        QueryError::DeadlineExceeded(deadline) => {
            warn!(report = %report, ?deadline, "series query exceeded its deadline");
            Error::gateway_timeout(format!(
                "query for {report} did not finish within {}s",
                deadline.as_secs()
            ))
        }
        QueryError::Repository(error) => {
            error!(report = %report, kind = error.kind(), %error, "series query failed");
            Error::internal(error.to_string())
        }
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        let mut redacted = Error::internal("Internal server error");
        if let Some(id) = error.trace_id() {
            redacted = redacted.with_trace_id(id.to_owned());
        }
        redacted
    } else {
        error.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }

        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}
