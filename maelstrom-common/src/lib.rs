//! Types shared by every maelstrom crate: the outbound [`Message`], address
//! validation, and the logging setup.

pub mod address;
pub mod error;
pub mod logging;
pub mod message;

pub use address::AddressField;
pub use error::ValidationError;
pub use message::Message;
pub use tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
