/// Error returned by a [`crate::MechanismProvider`] method.
///
/// The SASL core folds every variant into an outcome rather than tearing
/// the connection down, but it does inspect which one it got: a genuine
/// credential rejection ([`Error::AuthenticationFailed`]) becomes
/// `outcome = AUTH`, while mechanism-selection/configuration failures
/// ([`Error::NoAcceptableMechanism`], [`Error::NotImplemented`]) become
/// `outcome = SYS_PERM` — either way followed by a normal
/// `RECVED_OUTCOME`/`POSTED_OUTCOME` path (`spec.md` §7 kind 3).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The mechanism list offered by the peer contained nothing this provider
    /// supports.
    #[error("no acceptable mechanism in {0:?}")]
    NoAcceptableMechanism(String),

    /// The operation is not meaningful for this provider / role combination.
    #[error("not implemented: {0:?}")]
    NotImplemented(Option<String>),

    /// Credential validation failed.
    #[error("authentication failed")]
    AuthenticationFailed,
}
