use beavy_calls::config::Config;
use beavy_calls::domain::shared::SystemClock;
use beavy_calls::domain::telephony::TelephonyProvider;
use beavy_calls::infrastructure::telephony::TwilioClient;
use beavy_calls::interface::api::{build_router, init_metrics, AppState, Stores};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "postgres")]
use beavy_calls::infrastructure::persistence::{
    create_pool, run_migrations, DatabaseConfig, PgCallLogRepository, PgCallSessionRepository,
    PgLeadRepository, PgRoutingRepository,
};
#[cfg(not(feature = "postgres"))]
use beavy_calls::infrastructure::persistence::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Beavy call service");

    // Load configuration
    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        public_base_url = %config.webhooks.public_base_url,
        "Configuration loaded"
    );

    if !config.telephony.is_configured() {
        warn!("Telephony credentials missing, outbound calls will fail");
    }
    if !config.livekit.is_configured() {
        warn!("LiveKit not configured, room tokens are unavailable");
    }
    if config.auth.jwt_secret == "change-me" {
        warn!("Using the default JWT secret");
    }

    #[cfg(feature = "postgres")]
    let stores = {
        info!("Initializing database connection...");
        let pool = create_pool(&DatabaseConfig::from(&config.database)).await?;
        run_migrations(&pool).await?;

        Stores {
            sessions: Arc::new(PgCallSessionRepository::new(pool.clone())),
            call_logs: Arc::new(PgCallLogRepository::new(pool.clone())),
            routing: Arc::new(PgRoutingRepository::new(pool.clone())),
            leads: Arc::new(PgLeadRepository::new(pool)),
        }
    };

    #[cfg(not(feature = "postgres"))]
    let stores = {
        warn!("Built without postgres, using the in-memory store");
        Stores::in_memory(InMemoryStore::new())
    };

    let provider: Arc<dyn TelephonyProvider> = Arc::new(TwilioClient::new(&config.telephony)?);
    let state = AppState::new(&config, stores, provider, Arc::new(SystemClock));

    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics()?;

    let app = build_router(state, prometheus_handle);
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("REST API server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
