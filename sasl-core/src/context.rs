//! Configuration and outcome bookkeeping (`spec.md` §3 `SaslContext`,
//! minus the fields owned by [`crate::state_machine::StateMachine`] and
//! the mechanism provider).

use sasl_types::SaslCode;

/// Environment variable consulted by [`SaslConfig::from_env`]
/// (`spec.md` §6).
pub const SASL_CONFIG_PATH_ENV: &str = "PN_SASL_CONFIG_PATH";

/// User-facing configuration inputs (`spec.md` §6 public API:
/// `config_name`, `config_path`, `set_remote_hostname`,
/// `set_user_password`, `set_external_security`).
///
/// `env_override` is read once at construction instead of calling
/// `std::env::var` from deep inside the engine, so tests can inject a
/// deterministic value (Design Note 9).
#[derive(Debug, Clone, Default)]
pub struct SaslConfig {
    /// Username supplied for mechanisms that need one (e.g. PLAIN).
    pub username: Option<String>,
    /// Password supplied for mechanisms that need one (e.g. PLAIN).
    pub password: Option<String>,
    /// Name of the mechanism-provider configuration to load.
    pub config_name: Option<String>,
    /// Directory the mechanism provider should search for its configuration.
    pub config_dir: Option<String>,
    /// The hostname of the remote peer, sent in `SASL-INIT`.
    pub remote_fqdn: Option<String>,
    /// Identity asserted by an externally-authenticated transport layer (e.g. mTLS).
    pub external_auth: Option<String>,
    /// Security-strength factor inherited from a lower secure-transport layer. `0` if none.
    pub external_ssf: u32,
}

impl SaslConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `config_dir` from `PN_SASL_CONFIG_PATH` if it is set,
    /// otherwise from `override_value`. Passing `Some("")` clears
    /// `config_dir` the same way a null pointer does in the source
    /// (Design Note 9: "free-then-strdup ordering on NULL inputs").
    pub fn with_env_override(mut self, override_value: Option<&str>) -> Self {
        let from_env = std::env::var(SASL_CONFIG_PATH_ENV).ok();
        self.config_dir = from_env.or_else(|| override_value.map(str::to_string));
        self
    }
}

/// Outcome of the SASL dialog (`spec.md` §3 `outcome`). Distinct from
/// [`SaslCode`] so `None` — no outcome has been recorded yet — is
/// representable without stealing one of the wire's five values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// No outcome recorded yet.
    #[default]
    None,
    /// Authentication succeeded.
    Ok,
    /// Authentication failed due to bad credentials.
    Auth,
    /// Authentication failed due to a system error.
    Sys,
    /// Authentication failed due to a system error unlikely to be corrected without intervention.
    SysPerm,
    /// Authentication failed due to a transient system error.
    SysTemp,
}

impl Outcome {
    /// `true` only for [`Outcome::Ok`] — the sole value for which
    /// `spec.md` §3 invariant 3 requires `transport.authenticated = true`.
    pub fn authenticated(self) -> bool {
        matches!(self, Outcome::Ok)
    }
}

impl From<SaslCode> for Outcome {
    fn from(code: SaslCode) -> Self {
        match code {
            SaslCode::Ok => Outcome::Ok,
            SaslCode::Auth => Outcome::Auth,
            SaslCode::Sys => Outcome::Sys,
            SaslCode::SysPerm => Outcome::SysPerm,
            SaslCode::SysTemp => Outcome::SysTemp,
        }
    }
}

impl TryFrom<Outcome> for SaslCode {
    type Error = ();

    fn try_from(outcome: Outcome) -> Result<Self, Self::Error> {
        match outcome {
            Outcome::None => Err(()),
            Outcome::Ok => Ok(SaslCode::Ok),
            Outcome::Auth => Ok(SaslCode::Auth),
            Outcome::Sys => Ok(SaslCode::Sys),
            Outcome::SysPerm => Ok(SaslCode::SysPerm),
            Outcome::SysTemp => Ok(SaslCode::SysTemp),
        }
    }
}

/// The non-state-machine, non-provider slice of `spec.md` §3
/// `SaslContext`: configuration, outcome, and the bypass flags that hand
/// the stream off to passthrough.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Configuration inputs.
    pub config: SaslConfig,
    /// Recorded outcome of the dialog.
    pub outcome: Outcome,
    /// `true` once the SASL input side is finished (`spec.md` §4.6).
    pub input_bypass: bool,
    /// `true` once the SASL output side is finished (`spec.md` §4.6).
    pub output_bypass: bool,
    /// `true` once a framing error has closed the layer (`spec.md` §3 invariant 5).
    pub close_sent: bool,
}

impl Context {
    /// Creates a context from the given configuration.
    pub fn new(config: SaslConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// `true` once both directions have bypassed SASL framing — the
    /// point at which the enclosing [`crate::io_layer::IoLayer`]
    /// degenerates to passthrough (`spec.md` §3 invariant 4).
    pub fn is_fully_bypassed(&self) -> bool {
        self.input_bypass && self.output_bypass
    }
}
