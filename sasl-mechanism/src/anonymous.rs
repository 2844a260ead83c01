use crate::{Error, MechanismProvider};

pub(crate) const ANONYMOUS: &str = "ANONYMOUS";

/// The ANONYMOUS mechanism: no credentials are exchanged, the server
/// simply accepts. Works as either role.
#[derive(Debug, Clone, Default)]
pub struct Anonymous {
    selected: bool,
    bytes_out: Option<Vec<u8>>,
}

impl Anonymous {
    /// Creates a new ANONYMOUS provider.
    pub fn new() -> Self {
        Self::default()
    }
}

fn included(mechlist: &str, name: &str) -> bool {
    mechlist
        .split(' ')
        .any(|word| word.eq_ignore_ascii_case(name))
}

impl MechanismProvider for Anonymous {
    fn list_mechs(&self) -> String {
        ANONYMOUS.to_string()
    }

    fn init_client(&mut self) -> Result<(), Error> {
        self.selected = false;
        Ok(())
    }

    fn init_server(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn process_mechanisms(&mut self, mechlist: &str) -> Result<(), Error> {
        if included(mechlist, ANONYMOUS) {
            self.selected = true;
            self.bytes_out = Some(Vec::new());
            Ok(())
        } else {
            Err(Error::NoAcceptableMechanism(mechlist.to_string()))
        }
    }

    fn process_init(&mut self, mechanism: &str, _initial_response: &[u8]) -> Result<(), Error> {
        if mechanism.eq_ignore_ascii_case(ANONYMOUS) {
            self.selected = true;
            Ok(())
        } else {
            Err(Error::NoAcceptableMechanism(mechanism.to_string()))
        }
    }

    fn process_challenge(&mut self, _challenge: &[u8]) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "ANONYMOUS never challenges".to_string(),
        )))
    }

    fn process_response(&mut self, _response: &[u8]) -> Result<(), Error> {
        Err(Error::NotImplemented(Some(
            "ANONYMOUS never challenges".to_string(),
        )))
    }

    fn selected_mechanism(&self) -> Option<&str> {
        self.selected.then_some(ANONYMOUS)
    }

    fn take_bytes_out(&mut self) -> Option<Vec<u8>> {
        self.bytes_out.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_anonymous_case_insensitively() {
        let mut mech = Anonymous::new();
        mech.init_client().unwrap();
        mech.process_mechanisms("PLAIN anonymous EXTERNAL").unwrap();
        assert_eq!(mech.selected_mechanism(), Some(ANONYMOUS));
    }

    #[test]
    fn rejects_mechlist_without_anonymous() {
        let mut mech = Anonymous::new();
        mech.init_client().unwrap();
        assert!(mech.process_mechanisms("PLAIN GSSAPI").is_err());
    }
}
