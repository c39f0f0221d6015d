//! Renderer seam.
//!
//! The interpreter hands every batch of primitives to a `BoardRenderer`.
//! Implementations here serialize them (`JsonLinesRenderer`), keep them for
//! inspection (`RecordingRenderer`), or drop them (`NullRenderer`).

mod core;

pub use core::{BoardRenderer, JsonLinesRenderer, NullRenderer, RecordingRenderer};
