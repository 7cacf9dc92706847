//! Error types for the connection manager.

use crate::manager::DEFAULT_CLOSE_CODE;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised while talking to connected clients.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Writing to a socket failed.
    #[error("Send failed: {0}")]
    Send(String),

    /// The socket was already closed.
    #[error("Connection closed")]
    Closed,

    /// A handler failed with an explicit status code.
    #[error("{message}")]
    Handler { status_code: u16, message: String },
}

impl RuntimeError {
    pub fn handler(status_code: u16, message: impl Into<String>) -> Self {
        Self::Handler {
            status_code,
            message: message.into(),
        }
    }

    /// Close code to send when this error ends a connection.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::Handler { status_code, .. } => *status_code,
            _ => DEFAULT_CLOSE_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code() {
        assert_eq!(RuntimeError::handler(4001, "bad token").close_code(), 4001);
        assert_eq!(RuntimeError::Closed.close_code(), DEFAULT_CLOSE_CODE);
    }

    #[test]
    fn test_handler_display_is_message() {
        assert_eq!(RuntimeError::handler(4001, "bad token").to_string(), "bad token");
    }
}
