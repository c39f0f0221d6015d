//! Command interpreter.
//!
//! Untyped JSON commands are checked, dispatched by action name to an
//! [`ActionHandler`], and their primitives handed to the board renderer.
//! Commands can be run one at a time with
//! [`CommandInterpreter::execute`] or queued and drained in order with
//! [`CommandInterpreter::process_queue`].

mod command;
mod core;
mod handlers;

pub use command::{Command, PositionSpec};
pub use core::{ActionHandler, CommandInterpreter, CommandResult, HandlerContext};
