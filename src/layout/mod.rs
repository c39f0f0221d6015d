//! Zone & cursor layout engine.
//!
//! Callers import layout types from here. The engine itself lives in the
//! private `core` module; the tree, timeline and graph generators extend it
//! from sibling modules. `grid` is the independent occupancy-grid placer.

mod core;
pub mod expr;
mod graph;
pub mod grid;
mod timeline;
mod tree;
pub mod typography;

pub use core::{
    Cursor, Group, LayoutEngine, LayoutMode, LayoutOutput, Placement, SHAPE_SIZE, ShapeKind,
    TextRequest,
};
pub use expr::{Equation, ExprError};
pub use grid::{Anchor, GridConstraints, GridPlacer, Region};
pub use timeline::TimelineEvent;
pub use tree::{TREE_RESERVED_HEIGHT, TreeNode};
pub use typography::{Emphasis, StyleConfig, TextStyle};
