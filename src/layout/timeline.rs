use serde::{Deserialize, Serialize};

use crate::element::{Element, Role};
use crate::geometry::{Point, Rect};
use crate::primitive::BoardCommand;

use super::core::{
    Appearance, BLOCK_SPACING, LayoutEngine, LayoutOutput, Placement, centered_text,
};
use super::typography::{TextStyle, estimate_width};

const AXIS_OFFSET: f64 = 100.0;
const AXIS_INSET: f64 = 40.0;
const TICK_HALF: f64 = 12.0;
const DOT_RADIUS: f64 = 6.0;
const LABEL_ABOVE: f64 = 40.0;
const LABEL_BELOW: f64 = 36.0;
const TIMELINE_HEIGHT: f64 = 200.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl TimelineEvent {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            date: None,
        }
    }

    pub fn dated(date: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            date: Some(date.into()),
        }
    }

    fn caption(&self) -> String {
        match self.date.as_deref() {
            Some(date) => format!("{date}: {}", self.label),
            None => self.label.clone(),
        }
    }
}

impl LayoutEngine {
    /// Horizontal axis with evenly spaced events; labels alternate above and
    /// below the axis by index parity.
    pub fn draw_timeline(&mut self, events: &[TimelineEvent], placement: Placement) -> LayoutOutput {
        let zone = self.zone_for(Role::Container, placement);
        self.ensure_zone_mode(zone);
        let cursor = self.cursor(zone);
        let theme = self.theme();
        let style = TextStyle::for_role(Role::Label, theme);

        let axis_y = cursor.y + AXIS_OFFSET;
        let start = cursor.x + AXIS_INSET;
        let end = cursor.x + cursor.width - AXIS_INSET;
        let length = (end - start).max(0.0);
        let spacing = length / (events.len() + 1) as f64;

        let timeline_id = self.mint_id("el");
        let mut primitives = vec![BoardCommand::line(
            Point::new(start, axis_y),
            Point::new(end, axis_y),
            theme.primary_color,
            3.0,
        )];
        let mut members = Vec::with_capacity(events.len());

        for (index, event) in events.iter().enumerate() {
            let x = start + spacing * (index + 1) as f64;
            primitives.push(BoardCommand::line(
                Point::new(x, axis_y - TICK_HALF),
                Point::new(x, axis_y + TICK_HALF),
                theme.secondary_color,
                2.0,
            ));
            primitives.push(BoardCommand::Circle {
                cx: x,
                cy: axis_y,
                radius: DOT_RADIUS,
                stroke: theme.accent_color.to_string(),
                fill: Some(theme.accent_color.to_string()),
            });

            let caption = event.caption();
            let label_y = if index % 2 == 0 {
                axis_y - LABEL_ABOVE
            } else {
                axis_y + LABEL_BELOW
            };
            let width = estimate_width(&caption, style.font_size).min(spacing.max(1.0));
            let label_box = Rect::new(x - width / 2.0, label_y, width, style.line_height());
            primitives.push(centered_text(&caption, &label_box, &style));

            members.push(
                Element::new(self.mint_id("el"), Role::Label, zone, label_box)
                    .with_text(caption)
                    .referencing(Some(timeline_id.clone())),
            );
        }

        let bbox = Rect::new(cursor.x, cursor.y, cursor.width, TIMELINE_HEIGHT);
        self.advance(zone, bbox.bottom() + BLOCK_SPACING);
        self.warn_on_overflow(zone, &bbox);

        let summary = events
            .iter()
            .map(|event| event.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let element = Element::new(timeline_id, Role::Container, zone, bbox).with_text(summary);
        for member in &members {
            self.set_appearance(&member.id, Appearance::Caption);
            self.insert_element(member.clone());
        }
        self.insert_element(element.clone());

        LayoutOutput {
            element,
            primitives,
            members,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::element::Zone;

    fn text_ys(primitives: &[BoardCommand]) -> Vec<f64> {
        primitives
            .iter()
            .filter_map(|p| match p {
                BoardCommand::Text { y, .. } => Some(*y),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn events_are_evenly_spaced_with_alternating_labels() {
        let mut engine = LayoutEngine::new(BoardConfig::default());
        let events = vec![
            TimelineEvent::dated("1492", "Columbus"),
            TimelineEvent::dated("1607", "Jamestown"),
            TimelineEvent::dated("1776", "Independence"),
        ];

        let out = engine.draw_timeline(&events, Placement::Flow);

        let dots: Vec<f64> = out
            .primitives
            .iter()
            .filter_map(|p| match p {
                BoardCommand::Circle { cx, .. } => Some(*cx),
                _ => None,
            })
            .collect();
        assert_eq!(dots.len(), 3);
        let gap = dots[1] - dots[0];
        assert!((dots[2] - dots[1] - gap).abs() < 1e-9);

        let ys = text_ys(&out.primitives);
        assert!(ys[0] < ys[1]);
        assert_eq!(ys[0], ys[2]);

        // axis + (tick, dot, label) per event
        assert_eq!(out.primitives.len(), 1 + 3 * 3);
        assert_eq!(out.members[0].text.as_deref(), Some("1492: Columbus"));
    }

    #[test]
    fn timeline_reserves_its_band() {
        let mut engine = LayoutEngine::new(BoardConfig::default());
        let start = engine.cursor(Zone::Main).y;
        engine.draw_timeline(&[TimelineEvent::new("Only")], Placement::Flow);
        assert_eq!(
            engine.cursor(Zone::Main).y,
            start + TIMELINE_HEIGHT + BLOCK_SPACING
        );
    }
}
