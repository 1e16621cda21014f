//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::Trace;
use crate::middleware::ClientRateLimit;
#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::configure_api;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;

/// Shared state handed to every worker's [`App`].
#[derive(Clone)]
pub struct AppDependencies {
    /// Probe state flipped by start-up and shutdown.
    pub health_state: web::Data<HealthState>,
    /// Read services used by the handlers.
    pub http_state: web::Data<HttpState>,
    /// Per-client request limit, shared across workers.
    pub client_limit: ClientRateLimit,
}

/// Assemble the application: trace middleware around the per-client limiter,
/// `/api/v1` routes, health probes, and Swagger UI in debug builds.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        client_limit,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(client_limit)
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// OS signal handling is left to the caller, which stops the returned server
/// through its handle once shutdown begins.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        bind_addr,
        time_series,
        query_deadline,
        client_limit,
    } = config;
    let http_state = web::Data::new(HttpState::new(time_series, query_deadline));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            client_limit: client_limit.clone(),
        })
    })
    .disable_signals()
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
