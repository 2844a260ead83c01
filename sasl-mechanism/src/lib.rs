#![deny(missing_docs, missing_debug_implementations)]

//! The pluggable mechanism-provider capability set for the AMQP 1.0 SASL
//! negotiation core. Concrete SASL mechanisms are out of scope for the
//! core itself (`spec.md` §1 Non-goals); this crate defines the seam and
//! ships the two mechanisms every AMQP peer needs regardless of what a
//! more capable external provider (Cyrus SASL, SCRAM, ...) adds.

mod anonymous;
mod error;
mod plain;
mod provider;

pub use anonymous::Anonymous;
pub use error::Error;
pub use plain::{PlainClient, PlainServer};
pub use provider::MechanismProvider;
