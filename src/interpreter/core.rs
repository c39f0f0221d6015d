use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use serde_json::Value;

use crate::board::Board;
use crate::config::InterpreterConfig;
use crate::element::ElementId;
use crate::error::{BoardError, Result, ValidationError};
use crate::logging::{LogLevel, json_kv, json_str};
use crate::primitive::BoardCommand;
use crate::render::BoardRenderer;

use super::command::{Command, command_id, precheck};
use super::handlers::builtin_handlers;

const LOG_TARGET: &str = "chalkboard::interpreter";

/// Context passed to handlers. Primitives and deferred commands are applied
/// by the interpreter after the handler returns.
pub struct HandlerContext<'a> {
    board: &'a mut Board,
    primitives: Vec<BoardCommand>,
    element_id: Option<ElementId>,
    deferred: Vec<Value>,
}

impl<'a> HandlerContext<'a> {
    fn new(board: &'a mut Board) -> Self {
        Self {
            board,
            primitives: Vec::new(),
            element_id: None,
            deferred: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        self.board
    }

    /// Queue a primitive for the renderer.
    pub fn emit(&mut self, primitive: BoardCommand) {
        self.primitives.push(primitive);
    }

    pub fn emit_all(&mut self, primitives: impl IntoIterator<Item = BoardCommand>) {
        self.primitives.extend(primitives);
    }

    /// Report the element this command created or touched.
    pub fn set_element(&mut self, id: impl Into<ElementId>) {
        self.element_id = Some(id.into());
    }

    /// Append a follow-up command to the interpreter queue.
    pub fn defer(&mut self, raw: Value) {
        self.deferred.push(raw);
    }

    fn into_outcome(self) -> HandlerOutcome {
        HandlerOutcome {
            primitives: self.primitives,
            element_id: self.element_id,
            deferred: self.deferred,
        }
    }
}

struct HandlerOutcome {
    primitives: Vec<BoardCommand>,
    element_id: Option<ElementId>,
    deferred: Vec<Value>,
}

/// One action's behaviour. Registered by name; adding an action never
/// touches the dispatcher.
pub trait ActionHandler: Send {
    fn name(&self) -> &str;

    /// Fields that must be present, dotted for nested position keys.
    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Reject a command before anything mutates.
    fn validate(&self, command: &Command) -> std::result::Result<(), ValidationError> {
        command.require(self.required_fields())
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()>;
}

/// Structured outcome of one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub command_id: String,
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<ElementId>,
    pub primitives: Vec<BoardCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl CommandResult {
    pub fn failure(command_id: impl Into<String>, action: impl Into<String>, err: &BoardError) -> Self {
        Self {
            command_id: command_id.into(),
            action: action.into(),
            success: false,
            element_id: None,
            primitives: Vec::new(),
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
        }
    }
}

/// Validates, dispatches and sequences commands against one board.
pub struct CommandInterpreter {
    board: Board,
    handlers: HashMap<String, Box<dyn ActionHandler>>,
    renderer: Box<dyn BoardRenderer>,
    config: InterpreterConfig,
    queue: VecDeque<Value>,
    draining: bool,
    sequence: u64,
}

impl CommandInterpreter {
    /// Interpreter with the eight built-in actions registered.
    pub fn new<R>(board: Board, renderer: R) -> Self
    where
        R: BoardRenderer + 'static,
    {
        let mut interpreter = Self::without_handlers(board, renderer);
        for handler in builtin_handlers() {
            interpreter.handlers.insert(handler.name().to_string(), handler);
        }
        interpreter
    }

    pub fn without_handlers<R>(board: Board, renderer: R) -> Self
    where
        R: BoardRenderer + 'static,
    {
        Self {
            board,
            handlers: HashMap::new(),
            renderer: Box::new(renderer),
            config: InterpreterConfig::default(),
            queue: VecDeque::new(),
            draining: false,
            sequence: 0,
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.board.set_logger(config.logger.clone());
        self.config = config;
        self
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Register (or replace) a handler under its name.
    pub fn register_handler<H>(&mut self, handler: H) -> Option<Box<dyn ActionHandler>>
    where
        H: ActionHandler + 'static,
    {
        let name = handler.name().to_string();
        self.log(LogLevel::Debug, "handler_registered", [json_str("action", name.as_str())]);
        self.handlers.insert(name, Box::new(handler))
    }

    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Turn an untyped payload into a `Command`, assigning an id if absent.
    pub fn parse_command(&mut self, raw: &Value) -> Result<Command> {
        let action = precheck(raw)?.to_string();
        let mut command: Command =
            serde_json::from_value(raw.clone()).map_err(|err| ValidationError::InvalidPayload {
                action,
                reason: err.to_string(),
            })?;
        self.sequence += 1;
        if command.id.as_deref().is_none_or(|id| id.trim().is_empty()) {
            command.id = Some(command_id(self.sequence, raw));
        }
        Ok(command)
    }

    /// The action must have a registered handler, and that handler must
    /// accept the payload.
    pub fn validate_command(&self, command: &Command) -> Result<()> {
        let handler = self
            .handlers
            .get(&command.action)
            .ok_or_else(|| ValidationError::UnknownAction(command.action.clone()))?;
        handler.validate(command)?;
        Ok(())
    }

    pub fn execute(&mut self, raw: &Value) -> CommandResult {
        match self.parse_command(raw) {
            Ok(command) => self.execute_command(command),
            Err(err) => {
                let action = raw
                    .get("action")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let id = raw
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        self.sequence += 1;
                        command_id(self.sequence, raw)
                    });
                self.fail(id, action, err)
            }
        }
    }

    pub fn execute_command(&mut self, mut command: Command) -> CommandResult {
        if command.id.is_none() {
            self.sequence += 1;
            let raw = serde_json::to_value(&command).unwrap_or(Value::Null);
            command.id = Some(command_id(self.sequence, &raw));
        }
        let command_id = command.id().to_string();

        if let Err(err) = self.validate_command(&command) {
            return self.fail(command_id, command.action, err);
        }

        let outcome = match self.handlers.get_mut(&command.action) {
            Some(handler) => {
                let mut ctx = HandlerContext::new(&mut self.board);
                match catch_unwind(AssertUnwindSafe(|| handler.handle(&mut ctx, &command))) {
                    Ok(handled) => handled.map(|()| ctx.into_outcome()),
                    Err(payload) => Err(BoardError::Handler(format!(
                        "handler panicked: {}",
                        panic_message(payload.as_ref())
                    ))),
                }
            }
            None => Err(ValidationError::UnknownAction(command.action.clone()).into()),
        };
        let HandlerOutcome {
            primitives,
            element_id,
            deferred,
        } = match outcome {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(command_id, command.action, err),
        };
        self.queue.extend(deferred);
        self.record_metric(|metrics| {
            metrics.record_command();
            metrics.record_primitives(primitives.len());
        });

        let mut result = CommandResult {
            command_id,
            action: command.action,
            success: true,
            element_id,
            primitives,
            error: None,
            error_kind: None,
        };

        // The board already holds the new entity; a failed draw leaves it
        // registered but not visible.
        if let Err(err) = self.renderer.draw(&result.primitives) {
            let err = match err {
                err @ BoardError::Render(_) => err,
                other => BoardError::Render(other.to_string()),
            };
            result.success = false;
            result.error = Some(err.to_string());
            result.error_kind = Some(err.kind().to_string());
            self.log(
                LogLevel::Warn,
                "render_failed",
                [
                    json_str("id", result.command_id.as_str()),
                    json_str("renderer", self.renderer.name()),
                    json_str("error", err.to_string()),
                ],
            );
            return result;
        }

        self.log(
            LogLevel::Debug,
            "command_executed",
            [
                json_str("id", result.command_id.as_str()),
                json_str("action", result.action.as_str()),
                json_kv("primitives", result.primitives.len()),
            ],
        );
        result
    }

    /// Append a raw command to the FIFO queue.
    pub fn queue_command(&mut self, raw: Value) {
        self.queue.push_back(raw);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Drain the queue in order, including commands deferred along the way.
    /// A drain already in progress makes this a no-op.
    pub fn process_queue(&mut self) -> Vec<CommandResult> {
        if self.draining {
            return Vec::new();
        }
        self.draining = true;
        let mut results = Vec::with_capacity(self.queue.len());
        while let Some(raw) = self.queue.pop_front() {
            results.push(self.execute(&raw));
        }
        self.draining = false;

        self.record_metric(|metrics| metrics.record_queue_drain());
        self.emit_metrics();
        results
    }

    /// Log a metrics snapshot when both a logger and metrics are configured.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let event = guard.snapshot().to_log_event(&self.config.metrics_target);
                let _ = logger.log_event(event);
            }
        }
    }

    fn fail(&mut self, command_id: String, action: String, err: BoardError) -> CommandResult {
        let validation = matches!(err, BoardError::Validation(_));
        self.record_metric(|metrics| {
            metrics.record_command();
            if validation {
                metrics.record_validation_failure();
            } else {
                metrics.record_handler_failure();
            }
        });
        self.log(
            LogLevel::Warn,
            "command_failed",
            [
                json_str("id", command_id.as_str()),
                json_str("action", action.as_str()),
                json_str("kind", err.kind()),
                json_str("error", err.to_string()),
            ],
        );
        CommandResult::failure(command_id, action, &err)
    }

    fn record_metric<F>(&self, update: F)
    where
        F: FnOnce(&mut crate::metrics::InterpreterMetrics),
    {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut guard);
            }
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            logger.emit(level, LOG_TARGET, message, fields);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

