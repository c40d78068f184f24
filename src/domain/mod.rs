//! Domain layer - Core business logic
//!
//! Entities, value objects and the store/provider ports the application
//! layer is written against.

pub mod api_auth;
pub mod call_log;
pub mod lead;
pub mod livekit;
pub mod routing;
pub mod session;
pub mod shared;
pub mod telephony;
