//! The included-mechanism allow-list filter (`spec.md` §4.5).

/// Maximum number of mechanisms kept by [`MechBroker::filter`]. The
/// source's hard-coded limit of 16 has ambiguous overflow behavior
/// (Design Note 9); this rewrite fails closed instead.
pub const MAX_MECHANISMS: usize = 16;

/// Error raised by [`MechBroker::filter`] when the surviving mechanism
/// count would exceed [`MAX_MECHANISMS`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("more than {MAX_MECHANISMS} mechanisms survived the allow-list filter")]
pub struct TooManyMechanisms;

/// Owns the space-separated, case-insensitive allow-list (`included
/// mechanisms`) and mediates every place a mechanism list is filtered
/// through it.
#[derive(Debug, Clone, Default)]
pub struct MechBroker {
    /// `None` means every mechanism is allowed.
    included_mechanisms: Option<String>,
}

impl MechBroker {
    /// Creates a broker with no allow-list (everything permitted).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the allow-list. `None` clears it back to unrestricted.
    pub fn set_included_mechanisms(&mut self, list: Option<String>) {
        self.included_mechanisms = list;
    }

    /// The current allow-list, if any.
    pub fn included_mechanisms(&self) -> Option<&str> {
        self.included_mechanisms.as_deref()
    }

    /// `true` exactly when the allow-list is the single mechanism
    /// `ANONYMOUS` — the trigger condition for `force_anonymous`
    /// (`spec.md` §4.5, §6 `allowed_mechs`).
    pub fn is_anonymous_only(&self) -> bool {
        self.included_mechanisms
            .as_deref()
            .map(|list| included(list, "ANONYMOUS") && word_count(list) == 1)
            .unwrap_or(false)
    }

    /// Case-insensitive word membership test. `list == None` means
    /// unrestricted (always returns `true`). A `name` containing a space
    /// can never match, since word boundaries are spaces or the string
    /// terminator.
    pub fn included(&self, name: &str) -> bool {
        match &self.included_mechanisms {
            None => true,
            Some(list) => included(list, name),
        }
    }

    /// Destructively tokenizes `mechlist` on spaces and keeps only the
    /// tokens this broker's allow-list permits, capped at
    /// [`MAX_MECHANISMS`]. Returns the survivors in order.
    pub fn filter(&self, mechlist: &str) -> Result<Vec<String>, TooManyMechanisms> {
        let mut out = Vec::new();
        for token in mechlist.split(' ').filter(|t| !t.is_empty()) {
            if self.included(token) {
                if out.len() >= MAX_MECHANISMS {
                    return Err(TooManyMechanisms);
                }
                out.push(token.to_string());
            }
        }
        Ok(out)
    }
}

/// Case-insensitive word match of `name` inside the space-separated
/// `list`. A `name` with an embedded space can never match, since word
/// boundaries are spaces or the string terminator.
pub fn included(list: &str, name: &str) -> bool {
    if name.contains(' ') {
        return false;
    }
    list.split(' ').any(|word| word.eq_ignore_ascii_case(name))
}

fn word_count(list: &str) -> usize {
    list.split(' ').filter(|t| !t.is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn included_is_case_insensitive() {
        assert!(included("PLAIN ANONYMOUS", "anonymous"));
        assert!(!included("PLAIN ANONYMOUS", "GSSAPI"));
    }

    #[test]
    fn included_treats_none_list_as_universal() {
        let broker = MechBroker::new();
        assert!(broker.included("ANYTHING"));
    }

    #[test]
    fn included_rejects_embedded_space() {
        assert!(!included("PLAIN ANONYMOUS", "PLAIN ANONYMOUS"));
    }

    #[test]
    fn filter_excludes_everything_not_allowed() {
        let mut broker = MechBroker::new();
        broker.set_included_mechanisms(Some("PLAIN".to_string()));
        let survivors = broker.filter("ANONYMOUS GSSAPI").unwrap();
        assert!(survivors.is_empty());
    }

    #[test]
    fn filter_fails_closed_on_overflow() {
        let broker = MechBroker::new();
        let many: Vec<String> = (0..20).map(|i| format!("MECH{i}")).collect();
        let mechlist = many.join(" ");
        assert_eq!(broker.filter(&mechlist), Err(TooManyMechanisms));
    }

    #[test]
    fn is_anonymous_only_requires_exact_single_mechanism() {
        let mut broker = MechBroker::new();
        broker.set_included_mechanisms(Some("ANONYMOUS".to_string()));
        assert!(broker.is_anonymous_only());

        broker.set_included_mechanisms(Some("ANONYMOUS PLAIN".to_string()));
        assert!(!broker.is_anonymous_only());
    }
}
