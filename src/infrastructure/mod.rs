//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Store implementations (PostgreSQL, in-memory)
//! - TwiML rendering
//! - Telephony provider client and webhook signatures

pub mod persistence;
pub mod protocols;
pub mod telephony;
