//! Interface layer - External interfaces
//!
//! This layer handles:
//! - REST API endpoints for clients
//! - Provider-facing webhooks
//! - Request/response formatting

pub mod api;
