use std::io::{BufRead, Write};

use serde_json::Value;

use crate::error::BoardError;
use crate::interpreter::{CommandInterpreter, CommandResult};
use crate::logging::{LogLevel, json_kv, json_str};

use super::DriverResult;

pub(super) const LOG_TARGET: &str = "chalkboard::driver";

/// Serves one command stream: every non-empty input line is a JSON command,
/// every output line a JSON [`CommandResult`].
pub struct LineDriver {
    interpreter: CommandInterpreter,
    lines_read: u64,
}

impl LineDriver {
    pub fn new(interpreter: CommandInterpreter) -> Self {
        Self {
            interpreter,
            lines_read: 0,
        }
    }

    pub fn interpreter(&self) -> &CommandInterpreter {
        &self.interpreter
    }

    pub fn into_interpreter(self) -> CommandInterpreter {
        self.interpreter
    }

    /// Read until EOF. Returns the number of results written. Lines that are
    /// not valid UTF-8 or JSON get a failure result; only I/O errors end the
    /// stream.
    pub fn run<R, W>(&mut self, mut reader: R, writer: &mut W) -> DriverResult<usize>
    where
        R: BufRead,
        W: Write,
    {
        let mut written = 0;
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            written += self.serve_bytes(&line, writer)?;
        }
        self.log(LogLevel::Info, "stream_closed", [json_kv("results", written)]);
        Ok(written)
    }

    /// Queue one line, drain the queue and write the results.
    pub fn serve_line<W: Write>(&mut self, line: &str, writer: &mut W) -> DriverResult<usize> {
        self.serve_bytes(line.as_bytes(), writer)
    }

    fn serve_bytes<W: Write>(&mut self, line: &[u8], writer: &mut W) -> DriverResult<usize> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return Ok(0);
        }
        self.lines_read += 1;

        let results = match serde_json::from_slice::<Value>(line) {
            Ok(raw) => {
                self.interpreter.queue_command(raw);
                self.interpreter.process_queue()
            }
            Err(err) => {
                self.log(
                    LogLevel::Warn,
                    "malformed_line",
                    [
                        json_kv("line", self.lines_read),
                        json_str("error", err.to_string()),
                    ],
                );
                let id = format!("line-{}", self.lines_read);
                vec![CommandResult::failure(id, "", &BoardError::Serde(err))]
            }
        };

        for result in &results {
            serde_json::to_writer(&mut *writer, result)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(results.len())
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.interpreter.config().logger.as_ref() {
            logger.emit(level, LOG_TARGET, message, fields);
        }
    }
}
