//! Telephony provider integration (Twilio)

pub mod signature;
pub mod twilio;

pub use signature::{compute_signature, verify_signature, WebhookVerifier, SIGNATURE_HEADER};
pub use twilio::TwilioClient;
