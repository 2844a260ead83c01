//! Negotiation role and state vocabulary shared by the client and server
//! state machines (`spec.md` §3).

/// Which side of the negotiation a [`SaslState`] machine is driving.
///
/// Fixed at construction from the transport's server flag; never changes
/// for the lifetime of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The connection-initiating peer.
    Client,
    /// The connection-accepting peer.
    Server,
}

/// The SASL negotiation state, in the total order used to forbid
/// backward transitions (`desired_state`/`last_state` in `spec.md` §3).
///
/// Ordinal order matters: `last_state <= desired_state` must hold at all
/// times, and [`SaslState::is_legal_for`] enforces that a role never sets
/// a state that belongs to its peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SaslState {
    /// Nothing has been posted yet.
    None = 0,
    /// CLIENT posted SASL-INIT.
    PostedInit = 1,
    /// SERVER posted SASL-MECHANISMS.
    PostedMechanisms = 2,
    /// CLIENT posted SASL-RESPONSE.
    PostedResponse = 3,
    /// SERVER posted SASL-CHALLENGE.
    PostedChallenge = 4,
    /// CLIENT short-circuited straight to an outcome via force-ANONYMOUS.
    PretendOutcome = 5,
    /// SERVER posted SASL-OUTCOME.
    PostedOutcome = 6,
    /// CLIENT received SASL-OUTCOME.
    RecvedOutcome = 7,
}

impl SaslState {
    /// Whether `role` is permitted to set `self` as its `desired_state`.
    pub fn is_legal_for(self, role: Role) -> bool {
        match role {
            Role::Client => matches!(
                self,
                SaslState::None
                    | SaslState::PostedInit
                    | SaslState::PostedResponse
                    | SaslState::PretendOutcome
                    | SaslState::RecvedOutcome
            ),
            Role::Server => matches!(
                self,
                SaslState::None
                    | SaslState::PostedMechanisms
                    | SaslState::PostedChallenge
                    | SaslState::PostedOutcome
            ),
        }
    }

    /// `true` once this state observes that negotiation has concluded.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SaslState::PretendOutcome | SaslState::PostedOutcome | SaslState::RecvedOutcome
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_order_matches_declaration_order() {
        assert!(SaslState::None < SaslState::PostedInit);
        assert!(SaslState::PostedInit < SaslState::PostedMechanisms);
        assert!(SaslState::PostedChallenge < SaslState::PretendOutcome);
        assert!(SaslState::PretendOutcome < SaslState::PostedOutcome);
        assert!(SaslState::PostedOutcome < SaslState::RecvedOutcome);
    }

    #[test]
    fn client_cannot_set_server_only_states() {
        assert!(!SaslState::PostedMechanisms.is_legal_for(Role::Client));
        assert!(!SaslState::PostedChallenge.is_legal_for(Role::Client));
        assert!(!SaslState::PostedOutcome.is_legal_for(Role::Client));
    }

    #[test]
    fn server_cannot_set_client_only_states() {
        assert!(!SaslState::PostedInit.is_legal_for(Role::Server));
        assert!(!SaslState::PostedResponse.is_legal_for(Role::Server));
        assert!(!SaslState::PretendOutcome.is_legal_for(Role::Server));
        assert!(!SaslState::RecvedOutcome.is_legal_for(Role::Server));
    }

    #[test]
    fn none_is_legal_for_both_roles() {
        assert!(SaslState::None.is_legal_for(Role::Client));
        assert!(SaslState::None.is_legal_for(Role::Server));
    }
}
