//! Dashboard summary endpoint.
//!
//! ```text
//! GET /api/v1/economic/dashboard
//! ```

use actix_web::{get, web};

use crate::domain::SummaryHeader;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, SummaryHeaderSchema};
use crate::inbound::http::state::HttpState;

/// Latest value and change for the headline reports.
///
/// Lookups that fail are left out rather than failing the request.
#[utoipa::path(
    get,
    path = "/api/v1/economic/dashboard",
    responses(
        (status = 200, description = "Dashboard summaries", body = [SummaryHeaderSchema]),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["economic"],
    operation_id = "getDashboard"
)]
#[get("/economic/dashboard")]
pub async fn get_dashboard(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<SummaryHeader>>> {
    Ok(web::Json(state.dashboard.summary().await))
}
