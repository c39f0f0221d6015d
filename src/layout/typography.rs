//! Role-driven typography and the closed style override structure.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::element::Role;
use crate::theme::Theme;

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.55;
const LINE_HEIGHT_RATIO: f64 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    Normal,
    Bold,
    Italic,
    Underline,
}

/// Every style option a command may carry. Unknown keys are rejected at
/// deserialization time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct StyleConfig {
    /// Semantic role of the text; defaults to body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Font size override in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Text/stroke color override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Weight or slant override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emphasis: Option<Emphasis>,
    /// Draw an outline around the element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<bool>,
    /// Fill painted behind the element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Font family override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSlot {
    Primary,
    Secondary,
    Accent,
}

struct RoleTypography {
    size: f64,
    weight: &'static str,
    style: &'static str,
    margin: f64,
    color: ColorSlot,
}

fn role_typography(role: Role) -> RoleTypography {
    use ColorSlot::*;
    let (size, weight, style, margin, color) = match role {
        Role::Title => (56.0, "bold", "normal", 30.0, Primary),
        Role::Heading => (40.0, "bold", "normal", 24.0, Primary),
        Role::Subheading => (32.0, "600", "normal", 18.0, Secondary),
        Role::Body => (24.0, "normal", "normal", 16.0, Primary),
        Role::Bullet => (24.0, "normal", "normal", 12.0, Primary),
        Role::Equation => (32.0, "normal", "normal", 20.0, Accent),
        Role::Example => (24.0, "normal", "italic", 16.0, Secondary),
        Role::Note => (20.0, "normal", "italic", 10.0, Accent),
        Role::Container => (24.0, "normal", "normal", 16.0, Primary),
        Role::Connector => (18.0, "normal", "normal", 8.0, Secondary),
        Role::Label => (18.0, "normal", "normal", 8.0, Secondary),
        Role::GroupTitle => (28.0, "bold", "normal", 16.0, Primary),
        Role::TreeNode => (20.0, "normal", "normal", 0.0, Primary),
    };
    RoleTypography {
        size,
        weight,
        style,
        margin,
        color,
    }
}

/// Fully resolved text appearance for one placement.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub font_weight: String,
    pub font_style: String,
    pub font_family: String,
    pub color: String,
    pub margin: f64,
    pub underline: bool,
}

impl TextStyle {
    pub fn resolve(role: Role, theme: &Theme, overrides: &StyleConfig) -> Self {
        let base = role_typography(role);
        let color = match base.color {
            ColorSlot::Primary => theme.primary_color,
            ColorSlot::Secondary => theme.secondary_color,
            ColorSlot::Accent => theme.accent_color,
        };

        let mut style = Self {
            font_size: base.size,
            font_weight: base.weight.to_string(),
            font_style: base.style.to_string(),
            font_family: theme.font_family.to_string(),
            color: color.to_string(),
            margin: base.margin,
            underline: false,
        };

        if let Some(size) = overrides.size.filter(|size| *size > 0.0) {
            style.font_size = size;
        }
        if let Some(color) = overrides.color.as_ref() {
            style.color = color.clone();
        }
        if let Some(font) = overrides.font.as_ref() {
            style.font_family = font.clone();
        }
        match overrides.emphasis {
            Some(Emphasis::Bold) => style.font_weight = "bold".to_string(),
            Some(Emphasis::Italic) => style.font_style = "italic".to_string(),
            Some(Emphasis::Underline) => style.underline = true,
            Some(Emphasis::Normal) => {
                style.font_weight = "normal".to_string();
                style.font_style = "normal".to_string();
            }
            None => {}
        }
        style
    }

    pub fn for_role(role: Role, theme: &Theme) -> Self {
        Self::resolve(role, theme, &StyleConfig::default())
    }

    pub fn line_height(&self) -> f64 {
        self.font_size * LINE_HEIGHT_RATIO
    }
}

/// Horizontal indentation implied by role and placement.
pub fn indent_for(role: Role, indented: bool) -> f64 {
    let mut indent = 0.0;
    if role == Role::Bullet {
        indent += 40.0;
    }
    if role == Role::Subheading {
        indent += 20.0;
    }
    if indented {
        indent += 60.0;
    }
    indent
}

/// Heuristic wrapped line count; always at least one line.
pub fn estimate_lines(text: &str, font_size: f64, max_width: f64) -> f64 {
    let len = UnicodeWidthStr::width(text) as f64;
    let lines = (len * GLYPH_WIDTH_RATIO * font_size / max_width.max(1.0)).ceil();
    lines.max(1.0)
}

pub fn estimate_height(text: &str, font_size: f64, max_width: f64) -> f64 {
    estimate_lines(text, font_size, max_width) * font_size * LINE_HEIGHT_RATIO
}

/// Single-line advance of `text`, used for labels that do not wrap.
pub fn estimate_width(text: &str, font_size: f64) -> f64 {
    UnicodeWidthStr::width(text) as f64 * GLYPH_WIDTH_RATIO * font_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Subject;

    #[test]
    fn role_table_drives_defaults() {
        let theme = Theme::for_subject(Subject::General);
        let title = TextStyle::for_role(Role::Title, theme);
        assert_eq!(title.font_size, 56.0);
        assert_eq!(title.font_weight, "bold");
        assert_eq!(title.color, theme.primary_color);

        let equation = TextStyle::for_role(Role::Equation, theme);
        assert_eq!(equation.color, theme.accent_color);
    }

    #[test]
    fn overrides_apply_on_top_of_role() {
        let theme = Theme::for_subject(Subject::Math);
        let overrides = StyleConfig {
            size: Some(30.0),
            color: Some("#123456".into()),
            emphasis: Some(Emphasis::Italic),
            ..StyleConfig::default()
        };
        let style = TextStyle::resolve(Role::Body, theme, &overrides);
        assert_eq!(style.font_size, 30.0);
        assert_eq!(style.color, "#123456");
        assert_eq!(style.font_style, "italic");
        assert_eq!(style.font_weight, "normal");
    }

    #[test]
    fn unknown_style_keys_fail_to_parse() {
        let err = serde_json::from_str::<StyleConfig>(r#"{"colour": "red"}"#).unwrap_err();
        assert!(err.to_string().contains("colour"));
        let ok: StyleConfig = serde_json::from_str(r#"{"role": "heading", "size": 44}"#).unwrap();
        assert_eq!(ok.role, Some(Role::Heading));
    }

    #[test]
    fn indentation_is_additive() {
        assert_eq!(indent_for(Role::Body, false), 0.0);
        assert_eq!(indent_for(Role::Bullet, false), 40.0);
        assert_eq!(indent_for(Role::Subheading, true), 80.0);
        assert_eq!(indent_for(Role::Bullet, true), 100.0);
    }

    #[test]
    fn wrapped_height_grows_with_length() {
        // 100 chars * 0.55 * 24 = 1320px over 600px -> 3 lines.
        let text = "a".repeat(100);
        assert_eq!(estimate_lines(&text, 24.0, 600.0), 3.0);
        assert!((estimate_height(&text, 24.0, 600.0) - 3.0 * 24.0 * 1.4).abs() < 1e-9);
        assert_eq!(estimate_lines("", 24.0, 600.0), 1.0);
    }
}
