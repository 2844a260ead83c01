use crate::{Error, MechanismProvider};

pub(crate) const PLAIN: &str = "PLAIN";

fn included(mechlist: &str, name: &str) -> bool {
    mechlist
        .split(' ')
        .any(|word| word.eq_ignore_ascii_case(name))
}

/// CLIENT-side PLAIN mechanism: offers a fixed username/password as the
/// SASL-INIT initial response, SASL `[authzid] UTF8NUL authcid UTF8NUL passwd`.
#[derive(Debug, Clone)]
pub struct PlainClient {
    username: String,
    password: String,
    selected: bool,
    bytes_out: Option<Vec<u8>>,
}

impl PlainClient {
    /// Creates a new PLAIN client provider with the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            selected: false,
            bytes_out: None,
        }
    }

    fn initial_response(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.username.len() + self.password.len() + 2);
        buf.push(0u8);
        buf.extend_from_slice(self.username.as_bytes());
        buf.push(0u8);
        buf.extend_from_slice(self.password.as_bytes());
        buf
    }
}

impl MechanismProvider for PlainClient {
    fn list_mechs(&self) -> String {
        String::new()
    }

    fn init_client(&mut self) -> Result<(), Error> {
        self.selected = false;
        Ok(())
    }

    fn init_server(&mut self) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "PlainClient cannot act as a server".to_string(),
        )))
    }

    fn process_mechanisms(&mut self, mechlist: &str) -> Result<(), Error> {
        if included(mechlist, PLAIN) {
            self.selected = true;
            self.bytes_out = Some(self.initial_response());
            Ok(())
        } else {
            Err(Error::NoAcceptableMechanism(mechlist.to_string()))
        }
    }

    fn process_init(&mut self, _mechanism: &str, _initial_response: &[u8]) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "PlainClient cannot act as a server".to_string(),
        )))
    }

    fn process_challenge(&mut self, _challenge: &[u8]) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "PLAIN never challenges".to_string(),
        )))
    }

    fn process_response(&mut self, _response: &[u8]) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "PlainClient cannot act as a server".to_string(),
        )))
    }

    fn selected_mechanism(&self) -> Option<&str> {
        self.selected.then_some(PLAIN)
    }

    fn take_bytes_out(&mut self) -> Option<Vec<u8>> {
        self.bytes_out.take()
    }
}

/// SERVER-side PLAIN mechanism: validates a fixed username/password
/// against the client's `SASL-INIT` initial response.
#[derive(Debug, Clone)]
pub struct PlainServer {
    username: String,
    password: String,
}

impl PlainServer {
    /// Creates a new PLAIN server provider that accepts exactly one
    /// username/password pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn validate(&self, initial_response: &[u8]) -> bool {
        let mut parts = initial_response.split(|b| *b == 0u8);
        let _authzid = match parts.next() {
            Some(v) => v,
            None => return false,
        };
        let authcid = match parts.next() {
            Some(v) => v,
            None => return false,
        };
        let passwd = match parts.next() {
            Some(v) => v,
            None => return false,
        };
        self.username.as_bytes() == authcid && self.password.as_bytes() == passwd
    }
}

impl MechanismProvider for PlainServer {
    fn list_mechs(&self) -> String {
        PLAIN.to_string()
    }

    fn init_client(&mut self) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "PlainServer cannot act as a client".to_string(),
        )))
    }

    fn init_server(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn process_mechanisms(&mut self, _mechlist: &str) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "PlainServer cannot act as a client".to_string(),
        )))
    }

    fn process_init(&mut self, mechanism: &str, initial_response: &[u8]) -> Result<(), Error> {
        if !mechanism.eq_ignore_ascii_case(PLAIN) {
            return Err(Error::NoAcceptableMechanism(mechanism.to_string()));
        }
        if self.validate(initial_response) {
            Ok(())
        } else {
            Err(Error::AuthenticationFailed)
        }
    }

    fn process_challenge(&mut self, _challenge: &[u8]) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "PLAIN never challenges".to_string(),
        )))
    }

    fn process_response(&mut self, _response: &[u8]) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "PLAIN never challenges".to_string(),
        )))
    }

    fn selected_mechanism(&self) -> Option<&str> {
        Some(PLAIN)
    }

    fn take_bytes_out(&mut self) -> Option<Vec<u8>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_stages_initial_response() {
        let mut client = PlainClient::new("user", "example");
        client.init_client().unwrap();
        client.process_mechanisms("PLAIN SCRAM-SHA-1").unwrap();
        let bytes = client.take_bytes_out().unwrap();
        assert_eq!(bytes, b"\0user\0example");
    }

    #[test]
    fn server_validates_credentials() {
        let mut server = PlainServer::new("user", "example");
        assert!(server.process_init("PLAIN", b"\0user\0example").is_ok());
        assert!(matches!(
            server.process_init("PLAIN", b"\0user\0wrong"),
            Err(Error::AuthenticationFailed)
        ));
    }
}
