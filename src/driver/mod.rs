//! JSON-lines transports for the command interpreter.

mod line;
mod socket;

use thiserror::Error;

pub use line::LineDriver;
pub use socket::SocketDriver;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}
