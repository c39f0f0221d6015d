//! Semantic whiteboard layout engine.
//!
//! An external agent sends high-level drawing commands ("write a title",
//! "connect A to B", "draw a tree") as JSON. The [`interpreter`] validates and
//! dispatches them, the [`layout`] engine turns them into pixel-positioned
//! [`BoardCommand`] primitives, and the [`registry`] remembers what was drawn
//! so later commands can refer to it by description or id.
//!
//! ```
//! use chalkboard::{Board, BoardConfig, CommandInterpreter, RecordingRenderer};
//! use serde_json::json;
//!
//! let board = Board::new(BoardConfig::default()).unwrap();
//! let mut interpreter = CommandInterpreter::new(board, RecordingRenderer::new());
//! let result = interpreter.execute(&json!({
//!     "action": "write_text",
//!     "content": "Photosynthesis",
//!     "style": {"role": "title"}
//! }));
//! assert!(result.success);
//! ```

pub mod board;
pub mod config;
pub mod driver;
pub mod element;
pub mod error;
pub mod geometry;
pub mod interpreter;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod primitive;
pub mod registry;
pub mod render;
pub mod theme;

pub use board::Board;
pub use config::{BoardConfig, InterpreterConfig};
pub use driver::{DriverError, DriverResult, LineDriver, SocketDriver};
pub use element::{Element, ElementId, Role, Zone};
pub use error::{BoardError, Result, ValidationError};
pub use geometry::{Point, Rect, Size};
pub use interpreter::{
    ActionHandler, Command, CommandInterpreter, CommandResult, HandlerContext, PositionSpec,
};
pub use layout::{
    Anchor, GridConstraints, GridPlacer, LayoutEngine, LayoutMode, LayoutOutput, Placement,
    Region, ShapeKind, StyleConfig, TextRequest, TimelineEvent, TreeNode,
};
pub use logging::{LogEvent, LogFields, LogLevel, Logger, LoggingError, LoggingResult};
pub use metrics::{InterpreterMetrics, MetricSnapshot};
pub use primitive::{BoardCommand, TextAlign};
pub use registry::{AuditAction, AuditEntry, EntityRegistry};
pub use render::{BoardRenderer, JsonLinesRenderer, NullRenderer, RecordingRenderer};
pub use theme::{GridType, Subject, Theme};
