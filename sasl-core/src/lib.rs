#![deny(missing_docs, missing_debug_implementations)]

//! The SASL negotiation core of an AMQP 1.0 transport: header exchange,
//! the client/server state machines, and the bridge to a pluggable
//! mechanism provider.
//!
//! This crate never owns a socket, a thread, or an async runtime. It is a
//! synchronous, buffer-driven state machine: callers feed it bytes through
//! [`Sasl::input`] and drain bytes through [`Sasl::output`], the same way a
//! `rustls`-style sans-I/O protocol engine is driven.

pub mod context;
pub mod error;
pub mod frame;
pub mod frame_bridge;
pub mod header;
pub mod io_layer;
pub mod mech_broker;
pub mod sasl;
pub mod state_machine;

pub use context::{Context, Outcome, SaslConfig};
pub use error::NegotiationError;
pub use frame::{AmqpFrameDispatcher, DispatchError, Frame, FrameDispatcher};
pub use frame_bridge::FrameBridge;
pub use io_layer::{IoLayer, Layer};
pub use mech_broker::{MechBroker, TooManyMechanisms};
pub use sasl::{IoStatus, Sasl};
pub use state_machine::StateMachine;

pub use sasl_types::{Role, SaslState};
