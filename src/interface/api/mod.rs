//! API interface implementations

pub mod auth;
pub mod calls_handler;
pub mod dto;
pub mod error;
pub mod health_handler;
pub mod livekit_handler;
pub mod metrics_handler;
pub mod router;
pub mod routing_handler;
pub mod state;
pub mod webhook_handler;

pub use error::ApiError;
pub use metrics_handler::init_metrics;
pub use router::build_router;
pub use state::{AppState, Stores};
