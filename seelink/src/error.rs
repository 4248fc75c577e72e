//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] seelink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] seelink_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] seelink_types::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session is not running")]
    NotRunning,

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Check if the underlying socket failed (the listener reconnects on these)
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connection_error(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}
