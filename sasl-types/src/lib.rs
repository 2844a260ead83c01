#![deny(missing_docs, missing_debug_implementations)]

//! Wire-level types for the AMQP 1.0 SASL security layer as defined in
//! section 5.3.3 of the OASIS AMQP 1.0 core specification.
//!
//! This crate only carries data definitions and their `serde_amqp`
//! composite encoding. The negotiation behavior that produces and
//! consumes these types lives in `sasl-core`.

pub mod definitions;
pub mod sasl;
pub mod state;

pub use sasl::{SaslChallenge, SaslCode, SaslInit, SaslMechanisms, SaslOutcome, SaslResponse};
pub use state::{Role, SaslState};
