//! Board and interpreter configuration.
//!
//! `BoardConfig` is plain data and can be loaded from JSON; every field has a
//! default so partial documents are accepted. `InterpreterConfig` carries the
//! runtime handles (logger, metrics) and is assembled in code.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::error::{BoardError, Result};
use crate::geometry::Size;
use crate::logging::Logger;
use crate::metrics::InterpreterMetrics;
use crate::theme::Subject;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    pub width: f64,
    pub height: f64,
    pub subject: Subject,
    /// Outer margin around every zone.
    pub padding: f64,
    pub header_height: f64,
    pub footer_height: f64,
    /// Horizontal gap between main and sidebar in split view.
    pub column_gap: f64,
    /// Share of the available width given to main in split view.
    pub split_ratio: f64,
    /// Cell edge length of the spatial occupancy grid.
    pub grid_cell_size: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            subject: Subject::General,
            padding: 60.0,
            header_height: 120.0,
            footer_height: 80.0,
            column_gap: 40.0,
            split_ratio: 0.6,
            grid_cell_size: 20.0,
        }
    }
}

impl BoardConfig {
    pub fn with_size(mut self, size: Size) -> Self {
        self.width = size.width;
        self.height = size.height;
        self
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = subject;
        self
    }

    pub fn canvas(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: BoardConfig =
            serde_json::from_str(raw).map_err(|err| BoardError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(BoardError::Config(format!(
                "canvas must have positive dimensions, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(BoardError::Config(format!(
                "split_ratio must lie in (0, 1), got {}",
                self.split_ratio
            )));
        }
        if self.grid_cell_size < 1.0 {
            return Err(BoardError::Config(format!(
                "grid_cell_size must be at least 1, got {}",
                self.grid_cell_size
            )));
        }
        if self.padding < 0.0 || self.padding * 2.0 >= self.width {
            return Err(BoardError::Config(format!(
                "padding {} leaves no usable width",
                self.padding
            )));
        }
        Ok(())
    }
}

/// Runtime knobs for the command interpreter.
#[derive(Clone)]
pub struct InterpreterConfig {
    /// Optional structured logger used by the interpreter and its board.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with observers.
    pub metrics: Option<Arc<Mutex<InterpreterMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            metrics_target: "chalkboard::metrics".to_string(),
        }
    }
}

impl InterpreterConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(InterpreterMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<InterpreterMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config = BoardConfig::from_json_str(r#"{"width": 1280, "subject": "math"}"#).unwrap();
        assert_eq!(config.width, 1280.0);
        assert_eq!(config.height, 1080.0);
        assert_eq!(config.subject, Subject::Math);
        assert_eq!(config.split_ratio, 0.6);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = BoardConfig::from_json_str(r#"{"widht": 1280}"#).unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));
    }

    #[test]
    fn split_ratio_must_be_a_fraction() {
        let err = BoardConfig::from_json_str(r#"{"split_ratio": 1.5}"#).unwrap_err();
        assert!(err.to_string().contains("split_ratio"));
    }

    #[test]
    fn metrics_toggle() {
        let mut config = InterpreterConfig::default();
        assert!(config.metrics_handle().is_none());
        config.enable_metrics();
        assert!(config.metrics_handle().is_some());
        config.disable_metrics();
        assert!(config.metrics.is_none());
    }
}
