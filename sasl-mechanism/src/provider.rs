use crate::Error;

/// The pluggable mechanism-provider capability set from `spec.md` §9's
/// design notes: `{list_mechs, init_client, init_server, process_init,
/// process_mechanisms, process_challenge, process_response, free}`.
///
/// A single implementation may serve either role — `sasl-core` only ever
/// calls the subset of methods that are legal for the role it is driving
/// (a CLIENT-side [`crate::Sasl`] never calls `init_server`/`process_init`/
/// `process_response`, and vice versa). Implementations that only support
/// one role can simply return [`Error::NotImplemented`] from the other
/// side's methods.
pub trait MechanismProvider: std::fmt::Debug {
    /// Space-separated list of mechanisms this provider can act as a
    /// SERVER for. Used to build the outbound `SASL-MECHANISMS` frame.
    fn list_mechs(&self) -> String;

    /// Reset any CLIENT-side negotiation state. Called once before the
    /// first `process_mechanisms`.
    fn init_client(&mut self) -> Result<(), Error>;

    /// Reset any SERVER-side negotiation state. Called once before the
    /// first `process_init`.
    fn init_server(&mut self) -> Result<(), Error>;

    /// CLIENT: choose a mechanism from the space-separated `mechlist`
    /// offered by the server and stage the corresponding `SASL-INIT`
    /// bytes. Returns an error if nothing in `mechlist` is acceptable.
    fn process_mechanisms(&mut self, mechlist: &str) -> Result<(), Error>;

    /// SERVER: validate the client's chosen `mechanism` and its
    /// `initial_response`, staging either a challenge or an outcome.
    fn process_init(&mut self, mechanism: &str, initial_response: &[u8]) -> Result<(), Error>;

    /// CLIENT: respond to a server challenge, staging `SASL-RESPONSE` bytes.
    fn process_challenge(&mut self, challenge: &[u8]) -> Result<(), Error>;

    /// SERVER: consume a client response, staging the next challenge or
    /// the final outcome.
    fn process_response(&mut self, response: &[u8]) -> Result<(), Error>;

    /// The mechanism selected so far, if any.
    fn selected_mechanism(&self) -> Option<&str>;

    /// Take the bytes staged by the last `process_*` call for the next
    /// `SASL-INIT`/`SASL-CHALLENGE`/`SASL-RESPONSE` body. Consuming instead
    /// of borrowing avoids the interior-pointer aliasing the source
    /// implementation relies on (`spec.md` §5).
    fn take_bytes_out(&mut self) -> Option<Vec<u8>>;

    /// Whether the mechanism considers its challenge/response exchange
    /// complete. Single-round mechanisms (ANONYMOUS, PLAIN) are always
    /// complete; multi-round mechanisms override this.
    fn is_exchange_complete(&self) -> bool {
        true
    }

    /// Tear down any resources owned by the provider. Called exactly once
    /// when the enclosing [`crate::Sasl`] is dropped.
    fn free(&mut self) {}
}
