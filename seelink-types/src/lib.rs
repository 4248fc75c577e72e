//! Event types of the Seestar control channel

pub mod error;
pub mod event;
pub mod events;

pub use error::{Error, Result};
pub use event::{classify, EventKind, EventRecord, EVENT_TAG};
pub use events::OperationState;
