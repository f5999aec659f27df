//! XML-RPC error types.

use thiserror::Error;

/// Error raised by an XML-RPC call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    /// The server answered with a `<fault>` response.
    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },

    /// The request never produced a usable HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body is not a valid XML-RPC document.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A value did not have the shape the caller expected.
    #[error("Unexpected value: expected {expected}, got {found}")]
    UnexpectedType {
        expected: &'static str,
        found: String,
    },
}

/// Result type alias for XML-RPC calls.
pub type RpcResult<T> = std::result::Result<T, RpcError>;

impl RpcError {
    /// Create a new fault error.
    pub fn fault(code: i64, message: impl Into<String>) -> Self {
        Self::Fault {
            code,
            message: message.into(),
        }
    }

    /// Create a new transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Check if the server answered with a fault.
    pub fn is_fault(&self) -> bool {
        matches!(self, RpcError::Fault { .. })
    }
}
