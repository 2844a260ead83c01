//! Adapts inbound [`Frame`]s to the provider and [`StateMachine`]
//! (`spec.md` §4.4).

use sasl_mechanism::MechanismProvider;
use sasl_types::{Role, SaslChallenge, SaslInit, SaslMechanisms, SaslOutcome, SaslResponse, SaslState};

use crate::{
    context::{Context, Outcome},
    error::NegotiationError,
    frame::{Frame, FrameDispatcher},
    mech_broker::MechBroker,
    state_machine::StateMachine,
};

/// `spec.md` §7 kind 3: only a genuine credential rejection is `AUTH`;
/// mechanism selection or init failures are local/configuration problems
/// and map to `SYS_PERM` (§6 `force_anonymous`, §8 scenario 6).
fn outcome_for_error(err: &sasl_mechanism::Error) -> Outcome {
    match err {
        sasl_mechanism::Error::AuthenticationFailed => Outcome::Auth,
        sasl_mechanism::Error::NoAcceptableMechanism(_) => Outcome::SysPerm,
        sasl_mechanism::Error::NotImplemented(_) => Outcome::SysPerm,
    }
}

/// Stateless adapter between decoded wire [`Frame`]s and the provider /
/// state-machine pair driving the negotiation.
#[derive(Debug, Default)]
pub struct FrameBridge;

impl FrameBridge {
    /// Creates a new bridge. Carries no state of its own; every call takes
    /// the collaborators it needs to mutate.
    pub fn new() -> Self {
        Self
    }

    /// `spec.md` §7 kind 2: a backward transition or role mismatch is
    /// logged and suppressed here rather than torn down as a hard error —
    /// distinct from [`FrameBridge::fail_with`], which folds a genuine
    /// provider rejection (kind 3/4) into an outcome.
    fn set_desired_state(&self, sm: &mut StateMachine, target: SaslState) -> Result<(), NegotiationError> {
        match sm.set_desired_state(target) {
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

    /// Routes an inbound frame to the matching handler below.
    pub fn on_frame(
        &self,
        frame: Frame,
        context: &mut Context,
        broker: &MechBroker,
        provider: &mut dyn MechanismProvider,
        sm: &mut StateMachine,
    ) -> Result<(), NegotiationError> {
        match frame {
            Frame::Init(init) => self.handle_init(context, provider, sm, init),
            Frame::Mechanisms(mechanisms) => self.handle_mechanisms(context, broker, provider, sm, mechanisms),
            Frame::Challenge(challenge) => self.handle_challenge(context, provider, sm, challenge),
            Frame::Response(response) => self.handle_response(context, provider, sm, response),
            Frame::Outcome(outcome) => self.handle_outcome(context, sm, outcome),
        }
    }

    /// SERVER receives `SASL-INIT`: selects the mechanism and hands the
    /// client's initial response to the provider.
    fn handle_init(
        &self,
        context: &mut Context,
        provider: &mut dyn MechanismProvider,
        sm: &mut StateMachine,
        init: SaslInit,
    ) -> Result<(), NegotiationError> {
        debug_assert_eq!(sm.role(), Role::Server);
        let mechanism = init.mechanism.as_str().to_string();
        let initial_response = init
            .initial_response
            .map(|b| b.into_vec())
            .unwrap_or_default();

        match provider.process_init(&mechanism, &initial_response) {
            Ok(()) => self.advance_after_server_step(context, provider, sm),
            Err(err) => self.fail_with(context, sm, &err),
        }
    }

    /// CLIENT receives `SASL-MECHANISMS`: filters the offered list through
    /// the allow-list and asks the provider to choose among the survivors.
    /// A no-op if the force-ANONYMOUS short-circuit already committed to an
    /// outcome.
    fn handle_mechanisms(
        &self,
        context: &mut Context,
        broker: &MechBroker,
        provider: &mut dyn MechanismProvider,
        sm: &mut StateMachine,
        mechanisms: SaslMechanisms,
    ) -> Result<(), NegotiationError> {
        debug_assert_eq!(sm.role(), Role::Client);
        if sm.last_state() == SaslState::PretendOutcome {
            return Ok(());
        }

        let filtered: Vec<String> = mechanisms
            .sasl_server_mechanisms
            .iter()
            .map(|symbol| symbol.as_str().to_string())
            .filter(|name| broker.included(name))
            .collect();
        let mechlist = filtered.join(" ");

        if let Err(err) = provider.init_client() {
            return self.fail_with(context, sm, &err);
        }
        match provider.process_mechanisms(&mechlist) {
            Ok(()) => {
                self.set_desired_state(sm, SaslState::PostedInit)?;
                Ok(())
            }
            Err(err) => self.fail_with(context, sm, &err),
        }
    }

    /// CLIENT receives `SASL-CHALLENGE`. A rejected challenge can't become
    /// an `OUTCOME` frame — only the SERVER may post one — so it folds
    /// into the same local-recovery path as a received `OUTCOME` would:
    /// `outcome` is recorded and the dialog ends at `RECVED_OUTCOME`
    /// without ever hearing from the server again.
    fn handle_challenge(
        &self,
        context: &mut Context,
        provider: &mut dyn MechanismProvider,
        sm: &mut StateMachine,
        challenge: SaslChallenge,
    ) -> Result<(), NegotiationError> {
        debug_assert_eq!(sm.role(), Role::Client);
        match provider.process_challenge(&challenge.challenge) {
            Ok(()) => {
                self.set_desired_state(sm, SaslState::PostedResponse)?;
                Ok(())
            }
            Err(err) => self.fail_with(context, sm, &err),
        }
    }

    /// SERVER receives `SASL-RESPONSE`.
    fn handle_response(
        &self,
        context: &mut Context,
        provider: &mut dyn MechanismProvider,
        sm: &mut StateMachine,
        response: SaslResponse,
    ) -> Result<(), NegotiationError> {
        debug_assert_eq!(sm.role(), Role::Server);
        match provider.process_response(&response.response) {
            Ok(()) => self.advance_after_server_step(context, provider, sm),
            Err(err) => self.fail_with(context, sm, &err),
        }
    }

    /// CLIENT receives `SASL-OUTCOME`: the terminal frame of the dialog.
    fn handle_outcome(
        &self,
        context: &mut Context,
        sm: &mut StateMachine,
        outcome: SaslOutcome,
    ) -> Result<(), NegotiationError> {
        debug_assert_eq!(sm.role(), Role::Client);
        context.outcome = outcome.code.into();
        self.set_desired_state(sm, SaslState::RecvedOutcome)?;
        Ok(())
    }

    /// `spec.md` §4.5 `force_anonymous`: fabricates the MECHANISMS round
    /// trip on the client side without any bytes touching the wire for
    /// that step. The `SASL-INIT` itself still has to reach the server, so
    /// it is emitted here eagerly rather than through the normal `drive`
    /// stepping, which `PretendOutcome` has already short-circuited.
    pub fn force_anonymous(
        &self,
        context: &mut Context,
        provider: &mut dyn MechanismProvider,
        dispatcher: &mut dyn FrameDispatcher,
        sm: &mut StateMachine,
    ) -> Result<(), NegotiationError> {
        debug_assert_eq!(sm.role(), Role::Client);
        if let Err(err) = provider.init_client() {
            return self.fail_with(context, sm, &err);
        }
        match provider.process_mechanisms("ANONYMOUS") {
            Ok(()) => {
                sm.emit_init(context, provider, dispatcher)?;
                self.set_desired_state(sm, SaslState::PretendOutcome)?;
                Ok(())
            }
            Err(err) => self.fail_with(context, sm, &err),
        }
    }

    /// SERVER-side completion check shared by `INIT` and `RESPONSE`
    /// handling: either the mechanism is done (emit the outcome) or another
    /// challenge round is needed.
    fn advance_after_server_step(
        &self,
        context: &mut Context,
        provider: &mut dyn MechanismProvider,
        sm: &mut StateMachine,
    ) -> Result<(), NegotiationError> {
        if provider.is_exchange_complete() {
            context.outcome = Outcome::Ok;
            self.set_desired_state(sm, SaslState::PostedOutcome)?;
        } else {
            self.set_desired_state(sm, SaslState::PostedChallenge)?;
        }
        Ok(())
    }

    /// Folds a provider rejection into an outcome rather than tearing down
    /// the connection (`spec.md` §7 kind 3/4).
    fn fail_with(
        &self,
        context: &mut Context,
        sm: &mut StateMachine,
        err: &sasl_mechanism::Error,
    ) -> Result<(), NegotiationError> {
        context.outcome = outcome_for_error(err);
        let target = match sm.role() {
            Role::Server => SaslState::PostedOutcome,
            Role::Client => SaslState::RecvedOutcome,
        };
        self.set_desired_state(sm, target)?;

        #[cfg(feature = "tracing")]
        tracing::warn!(%err, "sasl provider rejected negotiation");
        #[cfg(feature = "log")]
        log::warn!("sasl provider rejected negotiation: {err}");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sasl_mechanism::{Anonymous, PlainServer};
    use sasl_types::SaslCode;

    use super::*;
    use crate::frame::AmqpFrameDispatcher;

    #[test]
    fn client_ignores_mechanisms_after_force_anonymous() {
        let bridge = FrameBridge::new();
        let mut context = Context::default();
        let broker = MechBroker::new();
        let mut provider = Anonymous::new();
        let mut sm = StateMachine::new(Role::Client);
        let mut dispatcher = AmqpFrameDispatcher::new();

        bridge
            .force_anonymous(&mut context, &mut provider, &mut dispatcher, &mut sm)
            .unwrap();
        assert_eq!(sm.last_state(), SaslState::PretendOutcome);

        bridge
            .on_frame(
                Frame::Mechanisms(SaslMechanisms {
                    sasl_server_mechanisms: vec!["PLAIN".into()],
                }),
                &mut context,
                &broker,
                &mut provider,
                &mut sm,
            )
            .unwrap();
        assert_eq!(sm.last_state(), SaslState::PretendOutcome);
    }

    #[test]
    fn server_init_with_bad_credentials_yields_auth_outcome() {
        let bridge = FrameBridge::new();
        let mut context = Context::default();
        let broker = MechBroker::new();
        let mut provider = PlainServer::new("user", "secret");
        let mut sm = StateMachine::new(Role::Server);

        bridge
            .on_frame(
                Frame::Init(SaslInit {
                    mechanism: "PLAIN".into(),
                    initial_response: Some(b"\0user\0wrong".to_vec().into()),
                    hostname: None,
                }),
                &mut context,
                &broker,
                &mut provider,
                &mut sm,
            )
            .unwrap();

        assert_eq!(context.outcome, Outcome::Auth);
        assert_eq!(sm.last_state(), SaslState::PostedOutcome);
    }

    #[test]
    fn client_outcome_frame_records_result() {
        let bridge = FrameBridge::new();
        let mut context = Context::default();
        let mut sm = StateMachine::new(Role::Client);

        bridge
            .handle_outcome(
                &mut context,
                &mut sm,
                SaslOutcome {
                    code: SaslCode::Ok,
                    additional_data: None,
                },
            )
            .unwrap();

        assert_eq!(context.outcome, Outcome::Ok);
        assert_eq!(sm.last_state(), SaslState::RecvedOutcome);
    }
}
