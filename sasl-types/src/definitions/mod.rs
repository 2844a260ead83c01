//! A small slice of the AMQP 1.0 error-condition vocabulary: just enough
//! for the SASL core to name the conditions it can raise (`spec.md` §7).

mod conn_error;
mod error_cond;

pub use conn_error::ConnectionError;
pub use error_cond::ErrorCondition;
