//! Fully resolved drawing instructions handed to the rendering surface.
//!
//! The renderer has no layout authority: every variant carries absolute pixel
//! coordinates and colors already resolved against the active theme.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
}

/// One pixel-positioned primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BoardCommand {
    Text {
        x: f64,
        y: f64,
        text: String,
        font_size: f64,
        font_weight: String,
        font_style: String,
        font_family: String,
        color: String,
        align: TextAlign,
        max_width: f64,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        underline: bool,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        stroke: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<String>,
        stroke_width: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
        stroke: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<String>,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: String,
        width: f64,
    },
    Arrow {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: String,
        width: f64,
    },
    Polygon {
        points: Vec<Point>,
        stroke: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<String>,
    },
    Stroke {
        points: Vec<Point>,
        color: String,
        width: f64,
    },
    Formula {
        x: f64,
        y: f64,
        expression: String,
        font_size: f64,
        color: String,
    },
    Highlight {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
        opacity: f64,
    },
    EraseArea {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Clear {
        background: String,
    },
}

impl BoardCommand {
    /// Wire tag of the primitive.
    pub fn kind(&self) -> &'static str {
        match self {
            BoardCommand::Text { .. } => "text",
            BoardCommand::Rect { .. } => "rect",
            BoardCommand::Circle { .. } => "circle",
            BoardCommand::Line { .. } => "line",
            BoardCommand::Arrow { .. } => "arrow",
            BoardCommand::Polygon { .. } => "polygon",
            BoardCommand::Stroke { .. } => "stroke",
            BoardCommand::Formula { .. } => "formula",
            BoardCommand::Highlight { .. } => "highlight",
            BoardCommand::EraseArea { .. } => "erase-area",
            BoardCommand::Clear { .. } => "clear",
        }
    }

    pub fn outline(rect: Rect, stroke: &str, stroke_width: f64) -> Self {
        BoardCommand::Rect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            stroke: stroke.to_string(),
            fill: None,
            stroke_width,
        }
    }

    pub fn filled(rect: Rect, stroke: &str, fill: &str) -> Self {
        BoardCommand::Rect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            stroke: stroke.to_string(),
            fill: Some(fill.to_string()),
            stroke_width: 1.0,
        }
    }

    pub fn line(from: Point, to: Point, color: &str, width: f64) -> Self {
        BoardCommand::Line {
            x1: from.x,
            y1: from.y,
            x2: to.x,
            y2: to.y,
            color: color.to_string(),
            width,
        }
    }

    pub fn erase(rect: Rect) -> Self {
        BoardCommand::EraseArea {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_serialize_with_kebab_case_tags() {
        let erase = BoardCommand::erase(Rect::new(1.0, 2.0, 3.0, 4.0));
        let value = serde_json::to_value(&erase).unwrap();
        assert_eq!(
            value,
            json!({"type": "erase-area", "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0})
        );
        assert_eq!(erase.kind(), "erase-area");
    }

    #[test]
    fn outline_omits_fill() {
        let rect = BoardCommand::outline(Rect::new(0.0, 0.0, 10.0, 10.0), "#fff", 2.0);
        let value = serde_json::to_value(&rect).unwrap();
        assert!(value.get("fill").is_none());
        assert_eq!(value["type"], "rect");
    }
}
