//! Wire protocols spoken with the telephony provider

pub mod twiml;

pub use twiml::{Gather, Stream, Verb, VoiceResponse};
