use serde::ser;
use serde_amqp::primitives::Symbol;

use super::ConnectionError;

/// An AMQP error condition symbol, scoped to the subset this crate's
/// SASL core can raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCondition {
    /// A connection-level error condition.
    ConnectionError(ConnectionError),
}

impl ser::Serialize for ErrorCondition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::ConnectionError(err) => err.serialize(serializer),
        }
    }
}

impl From<&ErrorCondition> for Symbol {
    fn from(value: &ErrorCondition) -> Self {
        match value {
            ErrorCondition::ConnectionError(err) => Symbol::from(err),
        }
    }
}
