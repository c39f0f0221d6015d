use thiserror::Error;

use crate::layout::ExprError;

/// Unified result type for the board crate.
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors surfaced by the board engine and command interpreter.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("invalid command: {0}")]
    Validation(#[from] ValidationError),
    #[error("unresolved reference: {0}")]
    Unresolved(String),
    #[error("handler failure: {0}")]
    Handler(String),
    #[error("expression error: {0}")]
    Expression(#[from] ExprError),
    #[error("renderer error: {0}")]
    Render(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BoardError {
    /// Short machine-readable label used in command results and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BoardError::Validation(_) => "validation",
            BoardError::Unresolved(_) => "resolution",
            BoardError::Handler(_) => "handler",
            BoardError::Expression(_) => "expression",
            BoardError::Render(_) => "render",
            BoardError::Config(_) => "config",
            BoardError::Serde(_) => "serialization",
            BoardError::Io(_) => "io",
        }
    }
}

/// Malformed or incomplete commands. Raised before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("command must be a JSON object")]
    NotAnObject,
    #[error("command is missing the `action` field")]
    MissingAction,
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("`{action}` requires field `{field}`")]
    MissingField { action: String, field: String },
    #[error("`{action}` payload rejected: {reason}")]
    InvalidPayload { action: String, reason: String },
}

impl ValidationError {
    pub fn missing(action: &str, field: &str) -> Self {
        Self::MissingField {
            action: action.to_string(),
            field: field.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_field() {
        let err = BoardError::from(ValidationError::missing("draw_arrow", "to"));
        assert_eq!(err.kind(), "validation");
        assert_eq!(
            err.to_string(),
            "invalid command: `draw_arrow` requires field `to`"
        );
    }
}
