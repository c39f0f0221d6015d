use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Identifier of an element or group. Minted ids are never reused.
pub type ElementId = String;

/// Pedagogical/typographic category of a placed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Title,
    Heading,
    Subheading,
    #[default]
    Body,
    Bullet,
    Equation,
    Example,
    Note,
    Container,
    Connector,
    Label,
    GroupTitle,
    TreeNode,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Title => "title",
            Role::Heading => "heading",
            Role::Subheading => "subheading",
            Role::Body => "body",
            Role::Bullet => "bullet",
            Role::Equation => "equation",
            Role::Example => "example",
            Role::Note => "note",
            Role::Container => "container",
            Role::Connector => "connector",
            Role::Label => "label",
            Role::GroupTitle => "group-title",
            Role::TreeNode => "tree-node",
        }
    }

    /// Notes and labels float next to what they annotate.
    pub fn is_floating(self) -> bool {
        matches!(self, Role::Note | Role::Label)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        serde_json::from_value(serde_json::Value::String(normalized))
            .map_err(|_| format!("unknown role `{s}`"))
    }
}

/// Independently cursored layout region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Header,
    Main,
    Sidebar,
    Footer,
    Floating,
}

impl Zone {
    pub const ALL: [Zone; 5] = [
        Zone::Header,
        Zone::Main,
        Zone::Sidebar,
        Zone::Footer,
        Zone::Floating,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Header => "header",
            Zone::Main => "main",
            Zone::Sidebar => "sidebar",
            Zone::Footer => "footer",
            Zone::Floating => "floating",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aside" => Ok(Zone::Sidebar),
            other => Zone::ALL
                .into_iter()
                .find(|zone| zone.as_str() == other)
                .ok_or_else(|| format!("unknown zone `{s}`")),
        }
    }
}

/// A placed, addressable element on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    pub role: Role,
    pub zone: Zone,
    pub bbox: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<ElementId>,
}

impl Element {
    pub fn new(id: impl Into<ElementId>, role: Role, zone: Zone, bbox: Rect) -> Self {
        Self {
            id: id.into(),
            role,
            zone,
            bbox,
            text: None,
            group_id: None,
            ref_id: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn in_group(mut self, group_id: Option<ElementId>) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn referencing(mut self, ref_id: Option<ElementId>) -> Self {
        self.ref_id = ref_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_from_snake_and_kebab_case() {
        assert_eq!("group_title".parse::<Role>(), Ok(Role::GroupTitle));
        assert_eq!("tree-node".parse::<Role>(), Ok(Role::TreeNode));
        assert_eq!("Heading".parse::<Role>(), Ok(Role::Heading));
        assert!("caption".parse::<Role>().is_err());
    }

    #[test]
    fn zones_parse_with_aside_alias() {
        assert_eq!("Sidebar".parse::<Zone>(), Ok(Zone::Sidebar));
        assert_eq!("aside".parse::<Zone>(), Ok(Zone::Sidebar));
        assert!("everywhere".parse::<Zone>().is_err());
    }

    #[test]
    fn only_notes_and_labels_float() {
        assert!(Role::Note.is_floating());
        assert!(Role::Label.is_floating());
        assert!(!Role::Body.is_floating());
    }
}
