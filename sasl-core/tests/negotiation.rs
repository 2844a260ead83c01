//! End-to-end negotiation scenarios (`spec.md` §8).
//!
//! Each scenario pairs a CLIENT and a SERVER [`Sasl`] engine and shuttles
//! bytes between them by hand — the sans-I/O equivalent of a loopback
//! socket — since the core never owns a transport of its own.

use std::{cell::RefCell, rc::Rc};

use sasl_core::{
    frame::{AmqpFrameDispatcher, Frame},
    header, IoStatus, NegotiationError, Outcome, Role, Sasl, SaslConfig,
};
use sasl_mechanism::{Anonymous, Error as MechError, MechanismProvider, PlainClient, PlainServer};
use sasl_types::SaslMechanisms;

fn new_sasl(role: Role, provider: Box<dyn MechanismProvider>) -> Sasl {
    Sasl::new(role, SaslConfig::new(), provider, Box::new(AmqpFrameDispatcher::new()))
}

/// Shuttles bytes between `client` and `server` until neither side has
/// anything left to produce or consume.
///
/// Each direction's `input` only reports `Eos` on a call that sees zero
/// fresh bytes (the sans-I/O equivalent of a `read()` returning 0), so once
/// a side stops producing frames its peer still needs an empty probe call
/// to actually observe that. `feed` is called every round regardless of
/// whether this round produced bytes, so that probe keeps happening.
fn pump(client: &mut Sasl, server: &mut Sasl) -> Result<(), NegotiationError> {
    let mut client_out_done = false;
    let mut server_out_done = false;
    let mut client_in_done = false;
    let mut server_in_done = false;

    for _ in 0..200 {
        let mut progressed = false;

        let mut client_to_server = Vec::new();
        if !client_out_done {
            match client.output(&mut client_to_server)? {
                IoStatus::Consumed(0) => {}
                IoStatus::Consumed(_) => progressed = true,
                IoStatus::Eos => {
                    client_out_done = true;
                    progressed = true;
                }
            }
        }
        if !server_in_done {
            progressed |= !client_to_server.is_empty();
            feed(server, &client_to_server, &mut server_in_done)?;
        }

        let mut server_to_client = Vec::new();
        if !server_out_done {
            match server.output(&mut server_to_client)? {
                IoStatus::Consumed(0) => {}
                IoStatus::Consumed(_) => progressed = true,
                IoStatus::Eos => {
                    server_out_done = true;
                    progressed = true;
                }
            }
        }
        if !client_in_done {
            progressed |= !server_to_client.is_empty();
            feed(client, &server_to_client, &mut client_in_done)?;
        }

        if !progressed {
            break;
        }
    }
    Ok(())
}

fn feed(sasl: &mut Sasl, bytes: &[u8], done: &mut bool) -> Result<(), NegotiationError> {
    if bytes.is_empty() {
        if sasl.input(&[], false)? == IoStatus::Eos {
            *done = true;
        }
        return Ok(());
    }

    let mut offset = 0;
    while offset < bytes.len() {
        match sasl.input(&bytes[offset..], false)? {
            IoStatus::Consumed(0) => break,
            IoStatus::Consumed(n) => offset += n,
            IoStatus::Eos => {
                *done = true;
                break;
            }
        }
    }
    Ok(())
}

#[test]
fn anonymous_success_server_initiated() {
    let mut client = new_sasl(Role::Client, Box::new(Anonymous::new()));
    let mut server = new_sasl(Role::Server, Box::new(Anonymous::new()));

    pump(&mut client, &mut server).unwrap();

    assert_eq!(client.outcome(), Outcome::Ok);
    assert!(client.authenticated());
    assert!(client.is_passthrough());
    assert!(server.is_passthrough());
}

#[test]
fn force_anonymous_short_circuit_still_authenticates() {
    let mut client = new_sasl(Role::Client, Box::new(Anonymous::new()));
    let mut server = new_sasl(Role::Server, Box::new(Anonymous::new()));

    client.allowed_mechs(Some("ANONYMOUS")).unwrap();

    pump(&mut client, &mut server).unwrap();

    assert!(client.authenticated());
    assert_eq!(client.outcome(), Outcome::Ok);
}

#[test]
fn header_mismatch_is_a_framing_error() {
    let mut client = new_sasl(Role::Client, Box::new(Anonymous::new()));
    let err = client.input(b"HTTP/1.1 ", false).unwrap_err();
    match err {
        NegotiationError::Framing { description, .. } => {
            assert!(description.contains("48")); // 0x48 == 'H'
        }
        other => panic!("expected a framing error, got {other:?}"),
    }
    assert!(client.close_sent());
}

#[test]
fn short_header_followed_by_eof_is_a_framing_error() {
    let mut client = new_sasl(Role::Client, Box::new(Anonymous::new()));
    let err = client.input(&header::SASL_HEADER[..4], true).unwrap_err();
    assert!(matches!(err, NegotiationError::Framing { .. }));
    assert!(client.close_sent());
}

#[test]
fn authentication_denied_does_not_authenticate() {
    let mut client = new_sasl(Role::Client, Box::new(PlainClient::new("user", "wrong")));
    let mut server = new_sasl(Role::Server, Box::new(PlainServer::new("user", "secret")));

    pump(&mut client, &mut server).unwrap();

    assert_eq!(client.outcome(), Outcome::Auth);
    assert!(!client.authenticated());
    assert!(client.close_sent());
}

#[test]
fn mech_filter_excluding_everything_skips_init() {
    let mut client = new_sasl(Role::Client, Box::new(Anonymous::new()));
    client.allowed_mechs(Some("PLAIN")).unwrap();

    // Drive the client's own header out of the way, then simulate the
    // peer's header arriving so input() treats the next bytes as a frame.
    let mut discard = Vec::new();
    client.output(&mut discard).unwrap();
    client.input(&header::SASL_HEADER, false).unwrap();

    let mut dispatcher = AmqpFrameDispatcher::new();
    dispatcher
        .post_frame(Frame::Mechanisms(SaslMechanisms {
            sasl_server_mechanisms: vec!["ANONYMOUS".into(), "GSSAPI".into()],
        }))
        .unwrap();
    let mut wire = Vec::new();
    dispatcher.dispatcher_output(&mut wire).unwrap();

    client.input(&wire, false).unwrap();

    assert_eq!(client.outcome(), Outcome::SysPerm);

    let mut out = Vec::new();
    let status = client.output(&mut out).unwrap();
    assert_eq!(status, IoStatus::Eos);
    assert!(out.is_empty());
}

#[derive(Debug, Default)]
struct ThreeRoundClient {
    round: u8,
    selected: bool,
    bytes_out: Option<Vec<u8>>,
}

impl MechanismProvider for ThreeRoundClient {
    fn list_mechs(&self) -> String {
        String::new()
    }

    fn init_client(&mut self) -> Result<(), MechError> {
        self.round = 0;
        self.selected = false;
        Ok(())
    }

    fn init_server(&mut self) -> Result<(), MechError> {
        Err(MechError::NotImplemented(None))
    }

    fn process_mechanisms(&mut self, mechlist: &str) -> Result<(), MechError> {
        if mechlist.split(' ').any(|m| m.eq_ignore_ascii_case("TESTMECH")) {
            self.selected = true;
            self.bytes_out = Some(b"init".to_vec());
            Ok(())
        } else {
            Err(MechError::NoAcceptableMechanism(mechlist.to_string()))
        }
    }

    fn process_init(&mut self, _mechanism: &str, _initial_response: &[u8]) -> Result<(), MechError> {
        Err(MechError::NotImplemented(None))
    }

    fn process_challenge(&mut self, _challenge: &[u8]) -> Result<(), MechError> {
        self.round += 1;
        self.bytes_out = Some(format!("resp{}", self.round).into_bytes());
        Ok(())
    }

    fn process_response(&mut self, _response: &[u8]) -> Result<(), MechError> {
        Err(MechError::NotImplemented(None))
    }

    fn selected_mechanism(&self) -> Option<&str> {
        self.selected.then_some("TESTMECH")
    }

    fn take_bytes_out(&mut self) -> Option<Vec<u8>> {
        self.bytes_out.take()
    }
}

#[derive(Debug)]
struct ThreeRoundServer {
    challenges_sent: u8,
    responses_received: Rc<RefCell<u8>>,
    bytes_out: Option<Vec<u8>>,
}

impl ThreeRoundServer {
    fn new(responses_received: Rc<RefCell<u8>>) -> Self {
        Self {
            challenges_sent: 0,
            responses_received,
            bytes_out: None,
        }
    }
}

impl MechanismProvider for ThreeRoundServer {
    fn list_mechs(&self) -> String {
        "TESTMECH".to_string()
    }

    fn init_client(&mut self) -> Result<(), MechError> {
        Err(MechError::NotImplemented(None))
    }

    fn init_server(&mut self) -> Result<(), MechError> {
        self.challenges_sent = 0;
        *self.responses_received.borrow_mut() = 0;
        Ok(())
    }

    fn process_mechanisms(&mut self, _mechlist: &str) -> Result<(), MechError> {
        Err(MechError::NotImplemented(None))
    }

    fn process_init(&mut self, mechanism: &str, _initial_response: &[u8]) -> Result<(), MechError> {
        if !mechanism.eq_ignore_ascii_case("TESTMECH") {
            return Err(MechError::NoAcceptableMechanism(mechanism.to_string()));
        }
        self.challenges_sent = 1;
        self.bytes_out = Some(format!("challenge{}", self.challenges_sent).into_bytes());
        Ok(())
    }

    fn process_challenge(&mut self, _challenge: &[u8]) -> Result<(), MechError> {
        Err(MechError::NotImplemented(None))
    }

    fn process_response(&mut self, _response: &[u8]) -> Result<(), MechError> {
        let mut received = self.responses_received.borrow_mut();
        *received += 1;
        if *received < 3 {
            self.challenges_sent += 1;
            self.bytes_out = Some(format!("challenge{}", self.challenges_sent).into_bytes());
        } else {
            self.bytes_out = None;
        }
        Ok(())
    }

    fn selected_mechanism(&self) -> Option<&str> {
        Some("TESTMECH")
    }

    fn take_bytes_out(&mut self) -> Option<Vec<u8>> {
        self.bytes_out.take()
    }

    fn is_exchange_complete(&self) -> bool {
        *self.responses_received.borrow() >= 3
    }
}

#[test]
fn challenge_response_loop_runs_exactly_three_rounds() {
    let responses_received = Rc::new(RefCell::new(0u8));
    let mut client = new_sasl(Role::Client, Box::new(ThreeRoundClient::default()));
    let mut server = new_sasl(
        Role::Server,
        Box::new(ThreeRoundServer::new(responses_received.clone())),
    );

    pump(&mut client, &mut server).unwrap();

    assert_eq!(*responses_received.borrow(), 3);
    assert!(client.authenticated());
}
