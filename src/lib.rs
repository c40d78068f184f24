//! Beavy calls - call-session lifecycle service
//!
//! Originates outbound calls through the telephony provider, answers the
//! provider's voice webhooks with TwiML, routes inbound calls per dialed
//! number and finalizes call logs when calls end.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::error::Result;
