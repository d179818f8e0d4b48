//! Clinic Server - Main entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clinic_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use clinic_server::{
    api,
    config::Config,
    db::{
        self, InMemoryAppointmentStore, InMemoryPatientStore, PgAppointmentStore, PgPatientStore,
        StoreBackend,
    },
    features::FeatureState,
    ingest::{
        appointments::AppointmentFileProcessor, InMemoryJobChannel, JobChannel, JobDispatcher,
        JobScheduler, JobSource, PgJobChannel,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_config = LogConfig::builder()
        .log_file_prefix("clinic-server")
        .filter_directives("clinic_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Clinic Server");

    let config = Config::load().context("Failed to load configuration")?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        store_backend = ?config.store_backend,
        "Configuration loaded"
    );

    let (state, source) = build_state(&config).await?;

    let shutdown = CancellationToken::new();

    let scheduler_handle = if config.ingest.enabled {
        let processor = AppointmentFileProcessor::new(state.appointments.clone());
        let dispatcher = JobDispatcher::new(state.jobs.clone(), processor);
        let scheduler = JobScheduler::new(config.ingest.clone(), dispatcher);
        Some(scheduler.start(source, shutdown.clone()))
    } else {
        info!("Ingestion is disabled (INGEST_ENABLED=false)");
        None
    };

    let app = api::create_router(state, &config);

    let server_shutdown = shutdown.clone();
    api::serve(app, &config, async move {
        shutdown_signal().await;
        server_shutdown.cancel();
    })
    .await?;

    // Workers finish their current job before stopping
    shutdown.cancel();
    if let Some(handle) = scheduler_handle {
        let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
        info!(timeout_secs = timeout.as_secs(), "Waiting for ingestion workers to stop");
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => info!("Ingestion workers stopped"),
            Ok(Err(e)) => warn!(error = %e, "Job scheduler task failed"),
            Err(_) => warn!("Ingestion workers did not stop in time"),
        }
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Pick the store and queue implementations for the configured backend
async fn build_state(config: &Config) -> Result<(FeatureState, JobSource)> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database)
                .await
                .context("Failed to connect to the database")?;
            PgJobChannel::setup(&pool)
                .await
                .context("Failed to set up the apalis job tables")?;
            db::run_migrations(&pool).await?;

            let channel = Arc::new(PgJobChannel::new(&pool, &config.ingest));
            let source = channel.source();
            let jobs: Arc<dyn JobChannel> = channel;
            let state = FeatureState {
                appointments: Arc::new(PgAppointmentStore::new(pool.clone())),
                patients: Arc::new(PgPatientStore::new(pool)),
                jobs,
                max_attempts: config.ingest.max_attempts,
            };
            Ok((state, source))
        },
        StoreBackend::Memory => {
            warn!("Using in-memory stores; data is lost on shutdown");

            let channel = Arc::new(InMemoryJobChannel::new());
            let source = channel.source();
            let jobs: Arc<dyn JobChannel> = channel;
            let state = FeatureState {
                appointments: Arc::new(InMemoryAppointmentStore::new()),
                patients: Arc::new(InMemoryPatientStore::new()),
                jobs,
                max_attempts: config.ingest.max_attempts,
            };
            Ok((state, source))
        },
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
