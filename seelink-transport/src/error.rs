//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Read timeout")]
    ReadTimeout,

    #[error("Connection closed by remote after {received} of {expected} bytes")]
    ConnectionClosed {
        received: usize,
        expected: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Line exceeds {max} bytes without a terminator")]
    LineTooLong {
        max: usize,
    },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] seelink_core::Error),
}

impl Error {
    /// Check if the socket is unusable and must be reopened
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::ConnectionTimeout
                | Self::ConnectionClosed { .. }
                | Self::Io(_)
                | Self::LineTooLong { .. }
        )
    }
}
