//! Persistence implementations

pub mod memory;

#[cfg(feature = "postgres")]
pub mod call_log_repository;
#[cfg(feature = "postgres")]
pub mod database;
#[cfg(feature = "postgres")]
pub mod lead_repository;
#[cfg(feature = "postgres")]
pub mod routing_repository;
#[cfg(feature = "postgres")]
pub mod session_repository;

pub use memory::InMemoryStore;

#[cfg(feature = "postgres")]
pub use call_log_repository::PgCallLogRepository;
#[cfg(feature = "postgres")]
pub use database::{create_pool, run_migrations, DatabaseConfig};
#[cfg(feature = "postgres")]
pub use lead_repository::PgLeadRepository;
#[cfg(feature = "postgres")]
pub use routing_repository::PgRoutingRepository;
#[cfg(feature = "postgres")]
pub use session_repository::PgCallSessionRepository;

/// Log and wrap a driver error
#[cfg(feature = "postgres")]
pub(crate) fn db_error(operation: &str, e: sqlx::Error) -> crate::domain::shared::DomainError {
    tracing::error!(operation, error = %e, "Database operation failed");
    crate::domain::shared::DomainError::Database(format!("{}: {}", operation, e))
}
