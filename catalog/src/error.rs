//! Error types for catalog transports and configuration.

use loadstate_core::request::{Lifecycle, RequestEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a transport call.
///
/// Carried verbatim as the error of a rejected operation, so it is
/// `Clone` and comparable.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportError {
    /// The request never got a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("Request failed with status {code}: {message}")]
    Status {
        /// Status code
        code: u16,
        /// Message from the response body
        message: String,
    },

    /// The addressed resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Invalid catalog configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The namespace is empty.
    #[error("Namespace must not be empty")]
    EmptyNamespace,

    /// The namespace ends in the separator, which would produce `ns//op` names.
    #[error("Namespace {0:?} must not end with '/'")]
    TrailingSeparator(String),

    /// The action broadcast channel needs room for at least one action.
    #[error("Broadcast capacity must be greater than zero")]
    ZeroCapacity,

    /// An environment variable holds a value that does not parse.
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue {
        /// Environment variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Log a settled transport call; rejections at `warn`.
pub(crate) fn log_settlement<T>(event: &RequestEvent<T, TransportError>) {
    match &event.lifecycle {
        Lifecycle::Rejected(error) => {
            tracing::warn!(operation = %event.operation, %error, "Operation rejected");
        },
        Lifecycle::Fulfilled(_) => {
            tracing::debug!(operation = %event.operation, "Operation fulfilled");
        },
        Lifecycle::Pending => {},
    }
}
