use sasl_types::definitions::ErrorCondition;

/// Error surfaced by the SASL negotiation layer.
///
/// Only [`NegotiationError::Framing`] (and [`NegotiationError::Dispatch`],
/// which is framing-equivalent) is fatal (`spec.md` §7 kind 1): it carries
/// the condition that should be attached to the transport and means the
/// layer has switched to returning end-of-stream. [`NegotiationError::IllegalStateTransition`]
/// (kind 2), [`NegotiationError::Mechanism`] (kind 3/4), and
/// [`NegotiationError::Resource`] (kind 5) are all recovered locally
/// before they would otherwise cross a [`crate::Sasl`] method boundary —
/// [`crate::frame_bridge::FrameBridge`] folds a provider rejection into
/// an `OUTCOME`/`outcome` field, both [`crate::frame_bridge::FrameBridge`]
/// and [`crate::Sasl`] log and suppress a state violation rather than
/// propagate it, and [`crate::state_machine::StateMachine::drive`] logs
/// and stalls on a resource error rather than propagate it. The variants
/// stay on this enum because [`sasl_types::state::SaslState::is_legal_for`]
/// and [`StateMachine::set_desired_state`](crate::state_machine::StateMachine::set_desired_state)
/// are public API in their own right and report rejection to direct
/// callers, tests included.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    /// Header mismatch, a malformed SASL frame body, or unexpected EOS
    /// inside SASL framing (`spec.md` §7 kind 1). Fatal: the layer attaches
    /// `description` to `condition` and returns end-of-stream from then on.
    #[error("framing error: {condition:?}: {description}")]
    Framing {
        /// The AMQP error condition to attach to the transport.
        condition: ErrorCondition,
        /// A human-readable description (e.g. a capped hex dump of the
        /// offending bytes).
        description: String,
    },

    /// A backward transition attempt or a role/state mismatch
    /// (`spec.md` §7 kind 2). Logged only; the caller treats this as a
    /// no-op, never as a hard error.
    #[error("illegal state transition: {0}")]
    IllegalStateTransition(String),

    /// The mechanism provider rejected the negotiation (`spec.md` §7 kind
    /// 3/4): the caller should fold this into `outcome = SYS_PERM` and
    /// continue towards a normal `OUTCOME` frame rather than tearing down
    /// the connection.
    #[error("mechanism provider error: {0}")]
    Mechanism(#[from] sasl_mechanism::Error),

    /// The frame dispatcher could not encode or decode a frame
    /// (`spec.md` §7 kind 1): treated as a framing error since the wire
    /// contract between the two peers has broken down.
    #[error("dispatcher error: {0}")]
    Dispatch(#[from] crate::frame::DispatchError),

    /// Splitting or duplicating a mechanism list exhausted its bound
    /// (`spec.md` §7 kind 5, e.g. [`crate::mech_broker::TooManyMechanisms`]):
    /// the current transition is abandoned and logged; the next drive
    /// cycle may retry it.
    #[error("resource error: {0}")]
    Resource(String),
}

impl NegotiationError {
    /// Builds a framing error from a connection-level condition.
    pub fn framing(condition: impl Into<ErrorCondition>, description: impl Into<String>) -> Self {
        Self::Framing {
            condition: condition.into(),
            description: description.into(),
        }
    }

    /// `spec.md` §7 kind 2: true for a backward transition attempt or a
    /// role/state mismatch, which callers driving `set_desired_state`
    /// outside of direct API use should log and suppress rather than
    /// surface to their own caller.
    pub fn is_state_violation(&self) -> bool {
        matches!(self, Self::IllegalStateTransition(_))
    }

    /// `spec.md` §7 kind 5: true for a resource error, which `drive` logs
    /// and stalls on rather than surfacing to its caller.
    pub fn is_resource_error(&self) -> bool {
        matches!(self, Self::Resource(_))
    }
}
