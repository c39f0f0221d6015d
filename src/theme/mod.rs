//! Per-subject visual configuration.
//!
//! The table is static: subjects map to complete bundles and nothing mutates
//! them at runtime. Switching subject only changes which bundle later
//! placements read.

mod core;

pub use core::{GRAPH_PALETTE, GridType, Subject, Theme};
