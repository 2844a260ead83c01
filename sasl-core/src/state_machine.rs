//! Owns `desired_state`/`last_state` and the emission drive loop
//! (`spec.md` §4.3).

use sasl_mechanism::MechanismProvider;
use sasl_types::{Role, SaslCode, SaslInit, SaslMechanisms, SaslOutcome, SaslResponse, SaslState};

use crate::{
    context::Context,
    error::NegotiationError,
    frame::{Frame, FrameDispatcher},
    mech_broker::MechBroker,
};

/// The client/server negotiation state machine.
#[derive(Debug)]
pub struct StateMachine {
    role: Role,
    desired_state: SaslState,
    last_state: SaslState,
}

impl StateMachine {
    /// Creates a state machine fixed to `role` for its lifetime.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            desired_state: SaslState::None,
            last_state: SaslState::None,
        }
    }

    /// The role this machine is driving.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The current `desired_state`.
    pub fn desired_state(&self) -> SaslState {
        self.desired_state
    }

    /// The current `last_state` — the progress actually made so far.
    pub fn last_state(&self) -> SaslState {
        self.last_state
    }

    /// `spec.md` §4.3: sets `desired_state`, subject to monotonicity and
    /// role legality. On rejection this is a no-op; the caller should log
    /// and continue (`spec.md` §7 kind 2).
    pub fn set_desired_state(&mut self, desired: SaslState) -> Result<(), NegotiationError> {
        if desired < self.last_state {
            return Err(NegotiationError::IllegalStateTransition(format!(
                "{desired:?} is behind last_state {:?}",
                self.last_state
            )));
        }
        if !desired.is_legal_for(self.role) {
            return Err(NegotiationError::IllegalStateTransition(format!(
                "{desired:?} is not legal for role {:?}",
                self.role
            )));
        }

        // Repeat handling: re-entering the same round-trip state rewinds
        // last_state one step so the drive loop re-emits the frame, which
        // is how multi-round challenge/response exchanges progress.
        if desired == self.last_state {
            match desired {
                SaslState::PostedResponse => self.last_state = SaslState::PostedInit,
                SaslState::PostedChallenge => self.last_state = SaslState::PostedMechanisms,
                _ => {}
            }
        }

        self.desired_state = desired;

        // PRETEND_OUTCOME and RECVED_OUTCOME post no frame of their own —
        // they record that the dialog is already decided (by a local
        // short-circuit or by an inbound OUTCOME already processed) — so
        // reaching them is instantaneous rather than something `drive`
        // needs to step towards.
        if matches!(desired, SaslState::PretendOutcome | SaslState::RecvedOutcome) {
            self.last_state = desired;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(?desired, role = ?self.role, "sasl desired_state set");
        #[cfg(feature = "log")]
        log::trace!("sasl desired_state set to {desired:?} for role {:?}", self.role);

        Ok(())
    }

    /// `spec.md` §4.3 drive loop (`post_sasl_frame`): emits frames until
    /// `desired_state` is reached or the machine hits a terminal,
    /// non-emitting state.
    pub fn drive(
        &mut self,
        context: &mut Context,
        broker: &MechBroker,
        provider: &mut dyn MechanismProvider,
        dispatcher: &mut dyn FrameDispatcher,
    ) -> Result<(), NegotiationError> {
        loop {
            // `desired_state` is the caller's goal and must never be
            // overwritten here: a redirect (e.g. POSTED_CHALLENGE needing
            // POSTED_MECHANISMS first) emits the prerequisite frame and
            // loops back to re-match the *original* desired_state against
            // the now-advanced last_state.
            if self.desired_state <= self.last_state {
                return Ok(());
            }

            match self.desired_state {
                SaslState::None => return Ok(()),

                SaslState::PostedInit => self.emit_init(context, provider, dispatcher)?,

                SaslState::PostedMechanisms => {
                    if !self.emit_mechanisms(broker, provider, dispatcher)? {
                        return Ok(());
                    }
                }

                SaslState::PostedResponse => self.emit_response(provider, dispatcher)?,

                SaslState::PostedChallenge => {
                    if self.last_state < SaslState::PostedMechanisms {
                        if !self.emit_mechanisms(broker, provider, dispatcher)? {
                            return Ok(());
                        }
                    } else {
                        self.emit_challenge(provider, dispatcher)?;
                    }
                }

                SaslState::PostedOutcome => {
                    if self.last_state < SaslState::PostedMechanisms {
                        if !self.emit_mechanisms(broker, provider, dispatcher)? {
                            return Ok(());
                        }
                    } else {
                        self.emit_outcome(context, dispatcher)?;
                    }
                }

                // Both are synced into last_state the instant they're
                // requested (see `set_desired_state`), so the loop guard
                // above always returns before either arm is reached; they
                // stay as a terminal fallback rather than `unreachable!()`.
                SaslState::PretendOutcome | SaslState::RecvedOutcome => return Ok(()),
            }
        }
    }

    /// Emits `SASL-INIT` and advances `last_state` to `PostedInit`. Exposed
    /// within the crate so [`crate::frame_bridge::FrameBridge::force_anonymous`]
    /// can send the real frame eagerly instead of waiting for `drive`.
    pub(crate) fn emit_init(
        &mut self,
        context: &Context,
        provider: &mut dyn MechanismProvider,
        dispatcher: &mut dyn FrameDispatcher,
    ) -> Result<(), NegotiationError> {
        let mechanism = provider
            .selected_mechanism()
            .ok_or_else(|| {
                NegotiationError::IllegalStateTransition(
                    "no mechanism selected before POSTED_INIT".to_string(),
                )
            })?
            .to_string();
        let initial_response = provider.take_bytes_out();
        dispatcher.post_frame(Frame::Init(SaslInit {
            mechanism: mechanism.as_str().into(),
            initial_response: initial_response.map(Into::into),
            hostname: context.config.remote_fqdn.clone(),
        }))?;
        self.emit(SaslState::PostedInit);
        Ok(())
    }

    /// Returns `Ok(false)` on a resource error (`spec.md` §7 kind 5): the
    /// mechanism list couldn't be split within its bound. Logged and left
    /// for the caller to stall on — `last_state` stays put, so the next
    /// `drive` call (the next I/O cycle) retries the same emission.
    fn emit_mechanisms(
        &mut self,
        broker: &MechBroker,
        provider: &mut dyn MechanismProvider,
        dispatcher: &mut dyn FrameDispatcher,
    ) -> Result<bool, NegotiationError> {
        let offered = provider.list_mechs();
        let symbols = match broker.filter(&offered) {
            Ok(symbols) => symbols,
            Err(err) => {
                let err = NegotiationError::Resource(err.to_string());
                #[cfg(feature = "tracing")]
                tracing::warn!(%err, "sasl mechanism emission stalled");
                #[cfg(feature = "log")]
                log::warn!("sasl mechanism emission stalled: {err}");
                return Ok(false);
            }
        };
        dispatcher.post_frame(Frame::Mechanisms(SaslMechanisms {
            sasl_server_mechanisms: symbols.iter().map(|s| s.as_str().into()).collect(),
        }))?;
        self.emit(SaslState::PostedMechanisms);
        Ok(true)
    }

    fn emit_response(
        &mut self,
        provider: &mut dyn MechanismProvider,
        dispatcher: &mut dyn FrameDispatcher,
    ) -> Result<(), NegotiationError> {
        let response = provider.take_bytes_out().unwrap_or_default();
        dispatcher.post_frame(Frame::Response(SaslResponse {
            response: response.into(),
        }))?;
        self.emit(SaslState::PostedResponse);
        Ok(())
    }

    fn emit_challenge(
        &mut self,
        provider: &mut dyn MechanismProvider,
        dispatcher: &mut dyn FrameDispatcher,
    ) -> Result<(), NegotiationError> {
        let challenge = provider.take_bytes_out().unwrap_or_default();
        dispatcher.post_frame(Frame::Challenge(sasl_types::SaslChallenge {
            challenge: challenge.into(),
        }))?;
        self.emit(SaslState::PostedChallenge);
        Ok(())
    }

    fn emit_outcome(
        &mut self,
        context: &Context,
        dispatcher: &mut dyn FrameDispatcher,
    ) -> Result<(), NegotiationError> {
        let code: SaslCode = context.outcome.try_into().unwrap_or(SaslCode::Sys);
        dispatcher.post_frame(Frame::Outcome(SaslOutcome {
            code,
            additional_data: None,
        }))?;
        self.emit(SaslState::PostedOutcome);
        Ok(())
    }

    fn emit(&mut self, state: SaslState) {
        self.last_state = state;

        #[cfg(feature = "tracing")]
        tracing::debug!(?state, role = ?self.role, "sasl frame emitted");
        #[cfg(feature = "log")]
        log::debug!("sasl frame emitted for state {state:?}, role {:?}", self.role);
    }
}

#[cfg(test)]
mod tests {
    use sasl_mechanism::Anonymous;

    use super::*;
    use crate::frame::AmqpFrameDispatcher;

    #[test]
    fn rejects_backward_transition() {
        let mut sm = StateMachine::new(Role::Client);
        let mut context = Context::default();
        let broker = MechBroker::new();
        let mut provider = Anonymous::new();
        provider.init_client().unwrap();
        provider.process_mechanisms("ANONYMOUS").unwrap();
        let mut dispatcher = AmqpFrameDispatcher::new();

        sm.set_desired_state(SaslState::PostedInit).unwrap();
        sm.drive(&mut context, &broker, &mut provider, &mut dispatcher)
            .unwrap();
        assert_eq!(sm.last_state(), SaslState::PostedInit);

        assert!(sm.set_desired_state(SaslState::None).is_err());
        assert_eq!(sm.last_state(), SaslState::PostedInit);
    }

    #[test]
    fn rejects_role_illegal_state() {
        let mut sm = StateMachine::new(Role::Client);
        assert!(sm.set_desired_state(SaslState::PostedMechanisms).is_err());
    }
}
