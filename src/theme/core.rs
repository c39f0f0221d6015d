use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Colors cycled across plotted equations by index.
pub const GRAPH_PALETTE: [&str; 3] = ["#e74c3c", "#3498db", "#2ecc71"];

/// Lesson subject selecting a theme bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    #[default]
    General,
    Math,
    Science,
    History,
    Literature,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::General,
        Subject::Math,
        Subject::Science,
        Subject::History,
        Subject::Literature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Subject::General => "general",
            Subject::Math => "math",
            Subject::Science => "science",
            Subject::History => "history",
            Subject::Literature => "literature",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown subject `{s}`"))
    }
}

/// Background grid pattern painted behind plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    Lines,
    Dots,
    Cross,
    None,
}

/// Complete color/grid/font bundle for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub background: &'static str,
    pub grid_type: GridType,
    pub grid_color: &'static str,
    pub primary_color: &'static str,
    pub secondary_color: &'static str,
    pub accent_color: &'static str,
    pub font_family: &'static str,
}

impl Theme {
    pub fn for_subject(subject: Subject) -> &'static Theme {
        match subject {
            Subject::General => &GENERAL,
            Subject::Math => &MATH,
            Subject::Science => &SCIENCE,
            Subject::History => &HISTORY,
            Subject::Literature => &LITERATURE,
        }
    }
}

static GENERAL: Theme = Theme {
    background: "#1e2a38",
    grid_type: GridType::None,
    grid_color: "#2c3e50",
    primary_color: "#ffffff",
    secondary_color: "#a0aec0",
    accent_color: "#f6e05e",
    font_family: "Inter, sans-serif",
};

static MATH: Theme = Theme {
    background: "#fdfdf8",
    grid_type: GridType::Lines,
    grid_color: "#d6e4f0",
    primary_color: "#1a202c",
    secondary_color: "#2b6cb0",
    accent_color: "#c53030",
    font_family: "KaTeX_Main, serif",
};

static SCIENCE: Theme = Theme {
    background: "#0b1d2a",
    grid_type: GridType::Dots,
    grid_color: "#1f3b4d",
    primary_color: "#e6f1ff",
    secondary_color: "#64ffda",
    accent_color: "#ff6b6b",
    font_family: "Roboto Mono, monospace",
};

static HISTORY: Theme = Theme {
    background: "#f4ecd8",
    grid_type: GridType::None,
    grid_color: "#e0d5b7",
    primary_color: "#3e2723",
    secondary_color: "#795548",
    accent_color: "#b71c1c",
    font_family: "Georgia, serif",
};

static LITERATURE: Theme = Theme {
    background: "#fffaf0",
    grid_type: GridType::Cross,
    grid_color: "#ede3d1",
    primary_color: "#2d3748",
    secondary_color: "#6b46c1",
    accent_color: "#d69e2e",
    font_family: "Merriweather, serif",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subject_has_a_complete_bundle() {
        for subject in Subject::ALL {
            let theme = Theme::for_subject(subject);
            for color in [
                theme.background,
                theme.grid_color,
                theme.primary_color,
                theme.secondary_color,
                theme.accent_color,
            ] {
                assert!(color.starts_with('#') && color.len() == 7, "{subject}: {color}");
            }
            assert!(!theme.font_family.is_empty());
        }
    }

    #[test]
    fn subjects_parse_case_insensitively() {
        assert_eq!("Math".parse::<Subject>(), Ok(Subject::Math));
        assert_eq!(" history ".parse::<Subject>(), Ok(Subject::History));
        assert!("chemistry".parse::<Subject>().is_err());
    }

    #[test]
    fn math_board_uses_line_grid() {
        assert_eq!(Theme::for_subject(Subject::Math).grid_type, GridType::Lines);
        assert_eq!(Theme::for_subject(Subject::General).grid_type, GridType::None);
    }
}
