use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::error::{BoardError, Result};
use crate::primitive::BoardCommand;

/// Consumer of positioned primitives. Renderers draw; they never lay out.
pub trait BoardRenderer: Send {
    fn name(&self) -> &str {
        "board_renderer"
    }

    fn draw(&mut self, primitives: &[BoardCommand]) -> Result<()>;
}

/// Writes one JSON object per primitive, flushing after each batch.
pub struct JsonLinesRenderer<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> BoardRenderer for JsonLinesRenderer<W> {
    fn name(&self) -> &str {
        "json_lines"
    }

    fn draw(&mut self, primitives: &[BoardCommand]) -> Result<()> {
        for primitive in primitives {
            let line = serde_json::to_string(primitive)?;
            self.writer
                .write_all(line.as_bytes())
                .and_then(|_| self.writer.write_all(b"\n"))
                .map_err(|err| BoardError::Render(err.to_string()))?;
        }
        self.writer
            .flush()
            .map_err(|err| BoardError::Render(err.to_string()))
    }
}

/// Keeps every drawn primitive behind a shared handle.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    drawn: Arc<Mutex<Vec<BoardCommand>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle observers can hold after the renderer moves into an
    /// interpreter.
    pub fn handle(&self) -> Arc<Mutex<Vec<BoardCommand>>> {
        Arc::clone(&self.drawn)
    }

    pub fn primitives(&self) -> Vec<BoardCommand> {
        self.drawn
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl BoardRenderer for RecordingRenderer {
    fn name(&self) -> &str {
        "recording"
    }

    fn draw(&mut self, primitives: &[BoardCommand]) -> Result<()> {
        let mut guard = self
            .drawn
            .lock()
            .map_err(|_| BoardError::Render("recording buffer poisoned".into()))?;
        guard.extend_from_slice(primitives);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl BoardRenderer for NullRenderer {
    fn name(&self) -> &str {
        "null"
    }

    fn draw(&mut self, _primitives: &[BoardCommand]) -> Result<()> {
        Ok(())
    }
}
