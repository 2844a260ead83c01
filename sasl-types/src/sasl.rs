//! The five SASL frame bodies and the `sasl-code` outcome enumeration.

use serde::{Deserialize, Serialize};
use serde_amqp::{
    primitives::{Binary, Symbol},
    DeserializeComposite, SerializeComposite,
};

/// 5.3.3.1 SASL Mechanisms
///
/// <type name="sasl-mechanisms" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-mechanisms:list" code="0x00000000:0x00000040"/>
///     <field name="sasl-server-mechanisms" type="symbol" multiple="true" mandatory="true"/>
/// </type>
///
/// Advertises the SASL mechanisms supported by the sending peer.
#[derive(Debug, Clone, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:sasl-mechanisms:list",
    code = 0x0000_0000_0000_0040,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct SaslMechanisms {
    /// A list of the SASL mechanisms supported by the sending peer. Must not be null or empty.
    pub sasl_server_mechanisms: Vec<Symbol>,
}

impl Default for SaslMechanisms {
    /// A peer that requires no authentication advertises a single ANONYMOUS mechanism.
    fn default() -> Self {
        Self {
            sasl_server_mechanisms: vec![Symbol::from("ANONYMOUS")],
        }
    }
}

/// 5.3.3.2 SASL Init
///
/// <type name="sasl-init" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-init:list" code="0x00000000:0x00000041"/>
///     <field name="mechanism" type="symbol" mandatory="true"/>
///     <field name="initial-response" type="binary"/>
///     <field name="hostname" type="string"/>
/// </type>
#[derive(Debug, Clone, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:sasl-init:list",
    code = 0x0000_0000_0000_0041,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct SaslInit {
    /// The selected mechanism.
    pub mechanism: Symbol,
    /// The mechanism's initial response, if any.
    pub initial_response: Option<Binary>,
    /// The name of the target host being connected to.
    pub hostname: Option<String>,
}

/// 5.3.3.3 SASL Challenge
///
/// <type name="sasl-challenge" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-challenge:list" code="0x00000000:0x00000042"/>
///     <field name="challenge" type="binary" mandatory="true"/>
/// </type>
#[derive(Debug, Clone, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:sasl-challenge:list",
    code = 0x0000_0000_0000_0042,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct SaslChallenge {
    /// Security mechanism challenge data.
    pub challenge: Binary,
}

/// 5.3.3.4 SASL Response
///
/// <type name="sasl-response" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-response:list" code="0x00000000:0x00000043"/>
///     <field name="response" type="binary" mandatory="true"/>
/// </type>
#[derive(Debug, Clone, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:sasl-response:list",
    code = 0x0000_0000_0000_0043,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct SaslResponse {
    /// Security mechanism response data.
    pub response: Binary,
}

/// 5.3.3.5 SASL Outcome
///
/// <type name="sasl-outcome" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-outcome:list" code="0x00000000:0x00000044"/>
///     <field name="code" type="sasl-code" mandatory="true"/>
///     <field name="additional-data" type="binary"/>
/// </type>
///
/// Upon successful completion of the SASL dialog the security layer has
/// been established and the peers must exchange protocol headers again.
#[derive(Debug, Clone, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "amqp:sasl-outcome:list",
    code = 0x0000_0000_0000_0044,
    encoding = "list",
    rename_all = "kebab-case"
)]
pub struct SaslOutcome {
    /// Outcome of the SASL dialog.
    pub code: SaslCode,
    /// Additional data provided by the authentication mechanism upon completion.
    pub additional_data: Option<Binary>,
}

/// 5.3.3.6 SASL Code
///
/// <type name="sasl-code" class="restricted" source="ubyte">
///     <choice name="ok" value="0"/>
///     <choice name="auth" value="1"/>
///     <choice name="sys" value="2"/>
///     <choice name="sys-perm" value="3"/>
///     <choice name="sys-temp" value="4"/>
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SaslCode {
    /// Connection authentication succeeded.
    Ok = 0,
    /// Connection authentication failed due to an unspecified problem with the supplied
    /// credentials.
    Auth = 1,
    /// Connection authentication failed due to a system error.
    Sys = 2,
    /// Connection authentication failed due to a system error that is unlikely to be
    /// corrected without intervention.
    SysPerm = 3,
    /// Connection authentication failed due to a transient system error.
    SysTemp = 4,
}

/// Constants from section 5.3.2 of the AMQP 1.0 core specification.
pub mod constant {
    /// SASL major protocol version.
    pub const SASL_MAJOR: u8 = 1;
    /// SASL minor protocol version.
    pub const SASL_MINOR: u8 = 0;
    /// SASL protocol revision.
    pub const SASL_REVISION: u8 = 0;
}
