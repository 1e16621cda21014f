//! Backend entry-point: runs migrations, starts the sync schedulers, and
//! serves the read API until an OS signal asks it to stop.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use pulse_backend::config::ServerSettings;
use pulse_backend::domain::ports::{ReportMetadataRepository, TimeSeriesRepository};
use pulse_backend::domain::{
    RateLimiter, ReconciliationEngine, ReconciliationPorts, ShutdownSignal, SyncJobs,
    shutdown_on_os_signal,
};
use pulse_backend::inbound::http::health::HealthState;
use pulse_backend::outbound::alpha_vantage::AlphaVantageHttpSource;
use pulse_backend::outbound::persistence::{
    DieselReportMetadataRepository, DieselTimeSeriesRepository, connect_with_retry,
    retry_with_backoff, run_migrations,
};
use pulse_backend::server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        ServerSettings::load().map_err(|error| eyre!("failed to load settings: {error}"))?;
    settings.validate()?;

    let pool = connect_with_retry(settings.pool_config()?, settings.retry_policy())
        .await
        .wrap_err("database unreachable")?;
    let database_url = settings.database_url()?;
    retry_with_backoff(settings.retry_policy(), "database migrations", || {
        run_migrations(database_url)
    })
    .await
    .wrap_err("database migrations failed")?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let time_series: Arc<dyn TimeSeriesRepository> =
        Arc::new(DieselTimeSeriesRepository::new(pool.clone()));
    let reports: Arc<dyn ReportMetadataRepository> =
        Arc::new(DieselReportMetadataRepository::new(pool));

    let (trigger, signal) = ShutdownSignal::new();
    let sync_handles = if settings.data_sync {
        start_sync(&settings, &time_series, reports, clock, &signal).await?
    } else {
        info!("data sync disabled, serving stored series only");
        Vec::new()
    };

    let health_state = web::Data::new(HealthState::new());
    let config = ServerConfig::new(settings.bind_addr()?, time_series)
        .with_query_deadline(settings.query_timeout())
        .with_client_rate_limit(settings.client_rate_limit());
    let server = create_server(health_state.clone(), config)?;
    let handle = server.handle();
    info!(bind_addr = %settings.bind_addr()?, "http server listening");

    let mut server_task = actix_web::rt::spawn(server);
    tokio::select! {
        result = &mut server_task => result??,
        result = shutdown_on_os_signal(trigger) => {
            result?;
            health_state.mark_unhealthy();
            handle.stop(true).await;
            server_task.await??;
        }
    }

    for handle in sync_handles {
        if let Err(error) = handle.await {
            warn!(%error, "sync scheduler ended abnormally");
        }
    }
    info!("shutdown complete");
    Ok(())
}

async fn start_sync(
    settings: &ServerSettings,
    time_series: &Arc<dyn TimeSeriesRepository>,
    reports: Arc<dyn ReportMetadataRepository>,
    clock: Arc<dyn Clock>,
    signal: &ShutdownSignal,
) -> Result<Vec<JoinHandle<()>>> {
    let source = AlphaVantageHttpSource::new(
        settings.alpha_vantage_base_url()?,
        settings.alpha_vantage_api_key()?,
        settings.provider_timeout(),
    )
    .wrap_err("failed to build provider client")?;
    let limiter = RateLimiter::new(settings.rate_limiter_config(), Arc::clone(&clock));
    let engine = ReconciliationEngine::new(
        ReconciliationPorts {
            time_series: Arc::clone(time_series),
            reports: Arc::clone(&reports),
            source: Arc::new(source),
            limiter: Arc::new(limiter),
        },
        clock,
        settings.reconciliation_config(),
    );
    Ok(SyncJobs::new(Arc::new(engine), reports).start(signal).await)
}
