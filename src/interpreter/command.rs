//! Wire format of incoming commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::layout::StyleConfig;

/// Where a command wants its result placed. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct PositionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
}

/// A parsed command. `id` is always present after
/// [`parse_command`](super::CommandInterpreter::parse_command).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Command {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<Value>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.position.get_or_insert_with(PositionSpec::default).region = Some(region.into());
        self
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Content as display text. Scalars other than strings are stringified;
    /// objects, arrays and null yield `None`.
    pub fn content_text(&self) -> Option<String> {
        match self.content.as_ref()? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    pub fn style(&self) -> StyleConfig {
        self.style.clone().unwrap_or_default()
    }

    pub fn region(&self) -> Option<&str> {
        self.position.as_ref()?.region.as_deref()
    }

    pub fn relative_to(&self) -> Option<&str> {
        self.position.as_ref()?.relative_to.as_deref()
    }

    pub fn align_with(&self) -> Option<&str> {
        self.position.as_ref()?.align_with.as_deref()
    }

    pub fn padding(&self) -> Option<f64> {
        self.position.as_ref()?.padding
    }

    /// Whether a named field is present and non-empty. Nested position fields
    /// use dotted names (`position.region`).
    pub fn has_field(&self, field: &str) -> bool {
        let present = |value: Option<&str>| value.is_some_and(|v| !v.trim().is_empty());
        match field {
            "content" => match self.content.as_ref() {
                None | Some(Value::Null) => false,
                Some(Value::String(text)) => !text.trim().is_empty(),
                Some(_) => true,
            },
            "reference" => present(self.reference.as_deref()),
            "from" => present(self.from.as_deref()),
            "to" => present(self.to.as_deref()),
            "label" => present(self.label.as_deref()),
            "style" => self.style.is_some(),
            "position" => self.position.is_some(),
            "position.region" => present(self.region()),
            "position.relativeTo" => present(self.relative_to()),
            "position.alignWith" => present(self.align_with()),
            _ => false,
        }
    }

    /// Check every `field` is present, naming the first that is missing.
    pub fn require(&self, fields: &[&str]) -> Result<(), ValidationError> {
        match fields.iter().find(|field| !self.has_field(field)) {
            Some(field) => Err(ValidationError::missing(&self.action, field)),
            None => Ok(()),
        }
    }

    pub(super) fn invalid(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::InvalidPayload {
            action: self.action.clone(),
            reason: reason.into(),
        }
    }
}

/// `cmd-` plus 12 hex digits of a digest over the sequence number and the
/// raw payload.
pub(super) fn command_id(sequence: u64, raw: &Value) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&sequence.to_le_bytes());
    hasher.update(raw.to_string().as_bytes());
    let hex = hasher.finalize().to_hex();
    format!("cmd-{}", &hex.as_str()[..12])
}

/// Shape checks that come before deserialization: an object with a string
/// `action`.
pub(super) fn precheck(raw: &Value) -> Result<&str, ValidationError> {
    let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    object
        .get("action")
        .and_then(Value::as_str)
        .filter(|action| !action.trim().is_empty())
        .ok_or(ValidationError::MissingAction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_are_camel_case() {
        let command: Command = serde_json::from_value(json!({
            "action": "write_text",
            "content": "Hi",
            "position": {"region": "aside", "relativeTo": "el-1", "alignWith": "center"}
        }))
        .unwrap();
        assert_eq!(command.region(), Some("aside"));
        assert_eq!(command.relative_to(), Some("el-1"));
        assert_eq!(command.align_with(), Some("center"));
    }

    #[test]
    fn unknown_keys_are_rejected_at_every_level() {
        assert!(serde_json::from_value::<Command>(json!({"action": "erase", "colour": "red"})).is_err());
        assert!(
            serde_json::from_value::<Command>(json!({
                "action": "write_text",
                "style": {"glow": true}
            }))
            .is_err()
        );
        assert!(
            serde_json::from_value::<Command>(json!({
                "action": "write_text",
                "position": {"zIndex": 3}
            }))
            .is_err()
        );
    }

    #[test]
    fn require_names_the_first_missing_field() {
        let command = Command::new("draw_arrow").with_reference("x");
        assert_eq!(
            command.require(&["from", "to"]),
            Err(ValidationError::missing("draw_arrow", "from"))
        );
        let blank = Command::new("write_text").with_content("   ");
        assert!(blank.require(&["content"]).is_err());
        assert!(Command::new("clear_region").with_region("all").require(&["position.region"]).is_ok());
    }

    #[test]
    fn precheck_runs_before_deserialization() {
        assert_eq!(precheck(&json!([1, 2])), Err(ValidationError::NotAnObject));
        assert_eq!(precheck(&json!({"content": "x"})), Err(ValidationError::MissingAction));
        assert_eq!(precheck(&json!({"action": 7})), Err(ValidationError::MissingAction));
        assert_eq!(precheck(&json!({"action": "erase"})), Ok("erase"));
    }

    #[test]
    fn generated_ids_depend_on_sequence_and_payload() {
        let raw = json!({"action": "erase", "reference": "a"});
        let first = command_id(1, &raw);
        assert!(first.starts_with("cmd-"));
        assert_eq!(first.len(), 16);
        assert_eq!(first, command_id(1, &raw));
        assert_ne!(first, command_id(2, &raw));
    }
}
