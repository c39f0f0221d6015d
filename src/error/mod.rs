//! Error taxonomy for the board engine.
//!
//! Validation failures block a command before anything is mutated; every
//! other failure is isolated to the command that raised it.

mod types;

pub use types::{BoardError, Result, ValidationError};
