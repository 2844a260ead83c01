//! The public engine: wires [`Context`], [`StateMachine`], [`MechBroker`],
//! [`IoLayer`], a [`MechanismProvider`], and a [`FrameDispatcher`] into the
//! buffer-driven API described by `spec.md` §4.6 and §6.

use sasl_mechanism::MechanismProvider;
use sasl_types::{Role, SaslState};

use crate::{
    context::{Context, Outcome, SaslConfig},
    error::NegotiationError,
    frame::FrameDispatcher,
    frame_bridge::FrameBridge,
    header,
    io_layer::IoLayer,
    mech_broker::MechBroker,
    state_machine::StateMachine,
};

/// Result of an [`Sasl::input`]/[`Sasl::output`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    /// Bytes were consumed (input) or produced (output).
    Consumed(usize),
    /// This direction of the SASL layer is finished; the caller should stop
    /// invoking it and, once both directions report this, switch to raw
    /// passthrough (`spec.md` §4.6).
    Eos,
}

/// The SASL negotiation engine for one transport. Never owns a socket: all
/// I/O happens through [`Sasl::input`]/[`Sasl::output`] against
/// caller-supplied buffers.
#[derive(Debug)]
pub struct Sasl {
    role: Role,
    context: Context,
    sm: StateMachine,
    broker: MechBroker,
    provider: Box<dyn MechanismProvider>,
    dispatcher: Box<dyn FrameDispatcher>,
    bridge: FrameBridge,
    io: IoLayer,
}

impl Sasl {
    /// Creates a new engine for `role`, backed by `provider` and
    /// `dispatcher`.
    pub fn new(
        role: Role,
        config: SaslConfig,
        provider: Box<dyn MechanismProvider>,
        dispatcher: Box<dyn FrameDispatcher>,
    ) -> Self {
        Self {
            role,
            context: Context::new(config),
            sm: StateMachine::new(role),
            broker: MechBroker::new(),
            provider,
            dispatcher,
            bridge: FrameBridge::new(),
            io: IoLayer::new(),
        }
    }

    /// `true` once negotiation has concluded and the stream has degenerated
    /// to raw passthrough. Once this returns `true` the caller should stop
    /// calling [`Sasl::input`]/[`Sasl::output`] and forward bytes directly.
    pub fn is_passthrough(&self) -> bool {
        self.io.is_passthrough()
    }

    /// `spec.md` §6 `allowed_mechs`: replaces the allow-list. Setting it to
    /// exactly `"ANONYMOUS"` on a CLIENT engine triggers the force-anonymous
    /// short-circuit (`spec.md` §4.5).
    pub fn allowed_mechs(&mut self, list: Option<&str>) -> Result<(), NegotiationError> {
        self.broker.set_included_mechanisms(list.map(str::to_string));
        if self.role == Role::Client && self.broker.is_anonymous_only() {
            self.bridge.force_anonymous(
                &mut self.context,
                self.provider.as_mut(),
                self.dispatcher.as_mut(),
                &mut self.sm,
            )?;
        }
        Ok(())
    }

    /// The allow-list currently in effect, if any.
    pub fn included_mechanisms(&self) -> Option<&str> {
        self.broker.included_mechanisms()
    }

    /// `spec.md` §6 `config_name`.
    pub fn config_name(&mut self, name: impl Into<String>) {
        self.context.config.config_name = Some(name.into());
    }

    /// `spec.md` §6 `config_path`.
    pub fn config_path(&mut self, dir: impl Into<String>) {
        self.context.config.config_dir = Some(dir.into());
    }

    /// `spec.md` §6 `done`: SERVER-side, records `outcome` and schedules the
    /// `SASL-OUTCOME` frame.
    pub fn done(&mut self, outcome: Outcome) -> Result<(), NegotiationError> {
        self.context.outcome = outcome;
        if self.role == Role::Server {
            self.set_desired_state(SaslState::PostedOutcome)?;
        }
        Ok(())
    }

    /// `spec.md` §6 `get_user`.
    pub fn get_user(&self) -> Option<&str> {
        self.context.config.username.as_deref()
    }

    /// `spec.md` §6 `get_mech`.
    pub fn get_mech(&self) -> Option<&str> {
        self.provider.selected_mechanism()
    }

    /// `spec.md` §6 `outcome`.
    pub fn outcome(&self) -> Outcome {
        self.context.outcome
    }

    /// `spec.md` §3 invariant 3: only [`Outcome::Ok`] authenticates.
    pub fn authenticated(&self) -> bool {
        self.context.outcome.authenticated()
    }

    /// `true` once a framing error or a failed outcome has marked the
    /// transport for closure rather than continued passthrough
    /// (`spec.md` §3 invariant 5, §7 kind 1).
    pub fn close_sent(&self) -> bool {
        self.context.close_sent
    }

    /// `spec.md` §6 `set_remote_hostname`.
    pub fn set_remote_hostname(&mut self, fqdn: impl Into<String>) {
        self.context.config.remote_fqdn = Some(fqdn.into());
    }

    /// `spec.md` §6 `set_user_password`.
    pub fn set_user_password(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.context.config.username = Some(username.into());
        self.context.config.password = Some(password.into());
    }

    /// `spec.md` §6 `set_external_security`: records the SSF and identity
    /// asserted by a lower secure-transport layer (e.g. TLS/mTLS).
    pub fn set_external_security(&mut self, ssf: u32, authid: impl Into<String>) {
        self.context.config.external_ssf = ssf;
        self.context.config.external_auth = Some(authid.into());
    }

    /// `spec.md` §4.6 `input`. `eof` tells the header-sniffing stage whether
    /// the byte-pipe underneath has nothing further to deliver — the
    /// caller's equivalent of a `read()` returning 0 — so a header that is
    /// still short can be told apart from a connection that closed before
    /// ever completing one (`spec.md` §4.2).
    pub fn input(&mut self, bytes: &[u8], eof: bool) -> Result<IoStatus, NegotiationError> {
        if self.io.is_passthrough() {
            return Ok(IoStatus::Consumed(0));
        }

        if self.io.input_needs_header() {
            return self.input_header(bytes, eof);
        }

        self.server_lazy_init()?;

        let (consumed, frame) = self.dispatcher.dispatcher_input(bytes)?;
        if let Some(frame) = frame {
            self.bridge.on_frame(
                frame,
                &mut self.context,
                &self.broker,
                self.provider.as_mut(),
                &mut self.sm,
            )?;
        }

        if consumed == 0 && self.is_final_input() {
            self.context.input_bypass = true;
            self.maybe_engage_passthrough();
            return Ok(IoStatus::Eos);
        }

        Ok(IoStatus::Consumed(consumed))
    }

    /// `spec.md` §4.6 `output`.
    pub fn output(&mut self, buf: &mut Vec<u8>) -> Result<IoStatus, NegotiationError> {
        if self.io.is_passthrough() {
            return Ok(IoStatus::Consumed(0));
        }

        if self.io.output_needs_header() {
            return self.output_header(buf);
        }

        self.server_lazy_init()?;
        self.sm.drive(
            &mut self.context,
            &self.broker,
            self.provider.as_mut(),
            self.dispatcher.as_mut(),
        )?;

        let produced = self.dispatcher.dispatcher_output(buf)?;

        if produced == 0 && self.is_final_output() {
            if !self.context.outcome.authenticated() && self.is_final_input() {
                self.context.close_sent = true;
            }
            self.context.output_bypass = true;
            self.maybe_engage_passthrough();
            return Ok(IoStatus::Eos);
        }

        Ok(IoStatus::Consumed(produced))
    }

    fn input_header(&mut self, bytes: &[u8], eof: bool) -> Result<IoStatus, NegotiationError> {
        match header::sniff(bytes) {
            // `spec.md` §4.2: insufficient bytes ask for more unless the
            // stream is already at EOS, in which case a header that will
            // never complete is a mismatch, not a stall.
            header::Sniff::Insufficient if eof => self.framing_error(bytes),
            header::Sniff::Insufficient => Ok(IoStatus::Consumed(0)),
            header::Sniff::AmqpSasl => {
                self.io.on_input_header_done();

                #[cfg(feature = "tracing")]
                tracing::trace!("  <- SASL");
                #[cfg(feature = "log")]
                log::trace!("  <- SASL");

                Ok(IoStatus::Consumed(header::HEADER_LEN))
            }
            header::Sniff::Amqp | header::Sniff::Other => self.framing_error(bytes),
        }
    }

    fn output_header(&mut self, buf: &mut Vec<u8>) -> Result<IoStatus, NegotiationError> {
        buf.extend_from_slice(&header::SASL_HEADER);
        self.io.on_output_header_done();
        Ok(IoStatus::Consumed(header::HEADER_LEN))
    }

    fn framing_error(&mut self, bytes: &[u8]) -> Result<IoStatus, NegotiationError> {
        self.context.close_sent = true;
        let description = header::hex_dump(bytes);
        Err(NegotiationError::framing(
            sasl_types::definitions::ConnectionError::FramingError,
            description,
        ))
    }

    /// SERVER-side lazy init: advertise mechanisms on the first I/O call if
    /// nothing has been requested yet (`spec.md` §4.6 `process`). Gated on
    /// `desired_state` rather than `last_state`: a server can receive
    /// `SASL-INIT` as its very first frame (the peer short-circuited via
    /// `force_anonymous`), which advances `desired_state` past `None`
    /// before `last_state` ever moves — `last_state` alone would
    /// misfire here and overwrite that already-decided target.
    fn server_lazy_init(&mut self) -> Result<(), NegotiationError> {
        if self.role == Role::Server && self.sm.desired_state() == SaslState::None {
            self.set_desired_state(SaslState::PostedMechanisms)?;
        }
        Ok(())
    }

    /// `spec.md` §7 kind 2: a backward transition or role mismatch is
    /// logged and suppressed rather than torn down as a hard error.
    fn set_desired_state(&mut self, target: SaslState) -> Result<(), NegotiationError> {
        match self.sm.set_desired_state(target) {
            Ok(()) => Ok(()),
            Err(err) if err.is_state_violation() => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%err, "suppressed illegal sasl state transition");
                #[cfg(feature = "log")]
                log::debug!("suppressed illegal sasl state transition: {err}");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn is_final_input(&self) -> bool {
        self.sm.last_state() == SaslState::RecvedOutcome
            || self.sm.desired_state() == SaslState::PostedOutcome
    }

    fn is_final_output(&self) -> bool {
        matches!(
            self.sm.last_state(),
            SaslState::PretendOutcome | SaslState::RecvedOutcome | SaslState::PostedOutcome
        )
    }

    fn maybe_engage_passthrough(&mut self) {
        if self.context.is_fully_bypassed() {
            self.io.engage_passthrough();
        }
    }
}

impl Drop for Sasl {
    fn drop(&mut self) {
        self.provider.free();
    }
}

#[cfg(test)]
mod tests {
    use sasl_mechanism::Anonymous;

    use super::*;
    use crate::frame::AmqpFrameDispatcher;

    fn client() -> Sasl {
        Sasl::new(
            Role::Client,
            SaslConfig::new(),
            Box::new(Anonymous::new()),
            Box::new(AmqpFrameDispatcher::new()),
        )
    }

    #[test]
    fn rejects_header_mismatch() {
        let mut sasl = client();
        let err = sasl.input(b"HTTP/1.1 ", false).unwrap_err();
        assert!(matches!(err, NegotiationError::Framing { .. }));
    }

    #[test]
    fn requests_more_bytes_on_short_header() {
        let mut sasl = client();
        let status = sasl.input(&header::SASL_HEADER[..4], false).unwrap();
        assert_eq!(status, IoStatus::Consumed(0));
    }

    #[test]
    fn short_header_at_eof_is_a_framing_error() {
        let mut sasl = client();
        let err = sasl.input(&header::SASL_HEADER[..4], true).unwrap_err();
        assert!(matches!(err, NegotiationError::Framing { .. }));
        assert!(sasl.close_sent());
    }

    #[test]
    fn force_anonymous_sets_pretend_outcome() {
        let mut sasl = client();
        sasl.allowed_mechs(Some("ANONYMOUS")).unwrap();
        assert_eq!(sasl.sm.last_state(), SaslState::PretendOutcome);
    }
}
