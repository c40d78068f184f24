//! Database connection management

use crate::config;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Pool settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from(&config::DatabaseConfig::default())
    }
}

impl From<&config::DatabaseConfig> for DatabaseConfig {
    fn from(settings: &config::DatabaseConfig) -> Self {
        Self {
            url: settings.url.clone(),
            max_connections: settings.max_connections,
            min_connections: settings.min_connections,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),  // 10 minutes
            max_lifetime: Duration::from_secs(1800), // 30 minutes
        }
    }
}

/// Create a new database connection pool
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        url = %mask_password(&config.url),
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .max_lifetime(Some(config.max_lifetime))
        .connect(&config.url)
        .await?;

    info!("Database connection pool created");

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await?;

    info!("Database migrations completed");
    Ok(())
}

/// Mask password in database URL for logging
pub fn mask_password(url: &str) -> String {
    let authority_start = url.find("://").map_or(0, |pos| pos + 3);
    // Unencoded '@' may appear in the password; the host never contains one
    let Some(at_offset) = url[authority_start..].rfind('@') else {
        return url.to_string();
    };
    let at_pos = authority_start + at_offset;

    match url[authority_start..at_pos].find(':') {
        Some(colon_offset) => {
            let mut masked = url.to_string();
            masked.replace_range(authority_start + colon_offset + 1..at_pos, "****");
            masked
        }
        None => url.to_string(),
    }
}
