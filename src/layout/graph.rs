//! Function plots over x in [-10, 10].

use crate::element::{Element, Role};
use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::logging::{LogLevel, json_kv, json_str};
use crate::primitive::{BoardCommand, TextAlign};
use crate::theme::{GRAPH_PALETTE, GridType, Theme};

use super::core::{BLOCK_SPACING, LayoutEngine, LayoutOutput, Placement, text_command};
use super::expr::Equation;
use super::typography::{StyleConfig, TextStyle};

const PLOT_WIDTH: f64 = 600.0;
const PLOT_HEIGHT: f64 = 400.0;
const TITLE_BAND: f64 = 48.0;
const TITLE_SIZE: f64 = 28.0;
const GRID_SPACING: f64 = 50.0;
const CROSS_HALF: f64 = 4.0;
const DOMAIN: f64 = 10.0;
const SAMPLE_STEP: f64 = 0.2;
const RELATIVE_GAP: f64 = 20.0;
const CLIP_EPSILON: f64 = 1e-6;

/// Maps plot coordinates to canvas pixels.
#[derive(Debug, Clone, Copy)]
struct PlotFrame {
    area: Rect,
}

impl PlotFrame {
    fn to_canvas(&self, x: f64, y: f64) -> Point {
        let px = self.area.x + (x + DOMAIN) / (DOMAIN * 2.0) * self.area.width;
        let py = self.area.center().y - y * (self.area.height / (DOMAIN * 2.0));
        Point::new(px, py)
    }

    fn contains_y(&self, py: f64) -> bool {
        py >= self.area.y - CLIP_EPSILON && py <= self.area.bottom() + CLIP_EPSILON
    }
}

fn sample_count() -> usize {
    (DOMAIN * 2.0 / SAMPLE_STEP).round() as usize + 1
}

/// Sample `equation` across the domain, splitting into runs wherever a
/// point is clipped.
fn sample_runs(equation: &Equation, frame: &PlotFrame) -> Vec<Vec<Point>> {
    let mut runs = Vec::new();
    let mut current: Vec<Point> = Vec::new();

    for i in 0..sample_count() {
        let x = -DOMAIN + i as f64 * SAMPLE_STEP;
        let y = equation.eval(x);
        let point = frame.to_canvas(x, y);
        if y.is_finite() && frame.contains_y(point.y) {
            current.push(point);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs.retain(|run| run.len() >= 2);
    runs
}

fn grid_primitives(frame: &PlotFrame, theme: &Theme) -> Vec<BoardCommand> {
    let area = frame.area;
    let cols = (area.width / GRID_SPACING).round() as usize;
    let rows = (area.height / GRID_SPACING).round() as usize;
    let color = theme.grid_color;
    let mut primitives = Vec::new();

    match theme.grid_type {
        GridType::None => {}
        GridType::Lines => {
            for c in 1..cols {
                let x = area.x + c as f64 * GRID_SPACING;
                primitives.push(BoardCommand::line(
                    Point::new(x, area.y),
                    Point::new(x, area.bottom()),
                    color,
                    1.0,
                ));
            }
            for r in 1..rows {
                let y = area.y + r as f64 * GRID_SPACING;
                primitives.push(BoardCommand::line(
                    Point::new(area.x, y),
                    Point::new(area.right(), y),
                    color,
                    1.0,
                ));
            }
        }
        GridType::Dots | GridType::Cross => {
            for c in 1..cols {
                for r in 1..rows {
                    let x = area.x + c as f64 * GRID_SPACING;
                    let y = area.y + r as f64 * GRID_SPACING;
                    if theme.grid_type == GridType::Dots {
                        primitives.push(BoardCommand::Circle {
                            cx: x,
                            cy: y,
                            radius: 1.5,
                            stroke: color.to_string(),
                            fill: Some(color.to_string()),
                        });
                    } else {
                        primitives.push(BoardCommand::line(
                            Point::new(x - CROSS_HALF, y),
                            Point::new(x + CROSS_HALF, y),
                            color,
                            1.0,
                        ));
                        primitives.push(BoardCommand::line(
                            Point::new(x, y - CROSS_HALF),
                            Point::new(x, y + CROSS_HALF),
                            color,
                            1.0,
                        ));
                    }
                }
            }
        }
    }
    primitives
}

impl LayoutEngine {
    /// Plot `equations` in a bounded area below the cursor or below a
    /// referenced element. Every equation is parsed before anything is placed.
    pub fn draw_graph(
        &mut self,
        title: Option<&str>,
        equations: &[String],
        placement: Placement,
        relative_to: Option<&str>,
    ) -> Result<LayoutOutput> {
        let compiled = equations
            .iter()
            .map(|source| Equation::parse(source))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let zone = self.zone_for(Role::Container, placement);
        self.ensure_zone_mode(zone);
        let cursor = self.cursor(zone);
        let anchor = relative_to.and_then(|id| self.bounds_of(id).map(|bbox| (id, bbox)));
        let (x, top) = match anchor {
            Some((_, reference)) => (reference.x, reference.bottom() + RELATIVE_GAP),
            None => (
                cursor.x + ((cursor.width - PLOT_WIDTH) / 2.0).max(0.0),
                cursor.y,
            ),
        };

        let theme = self.theme();
        let mut primitives = Vec::new();
        let plot_top = match title {
            Some(text) => {
                let style = TextStyle::resolve(
                    Role::Heading,
                    theme,
                    &StyleConfig {
                        size: Some(TITLE_SIZE),
                        ..StyleConfig::default()
                    },
                );
                let title_box = Rect::new(x, top, PLOT_WIDTH, style.line_height());
                primitives.push(text_command(text, &title_box, &style, TextAlign::Center));
                top + TITLE_BAND
            }
            None => top,
        };

        let frame = PlotFrame {
            area: Rect::new(x, plot_top, PLOT_WIDTH, PLOT_HEIGHT),
        };
        primitives.push(BoardCommand::outline(frame.area, theme.secondary_color, 2.0));
        primitives.extend(grid_primitives(&frame, theme));

        let origin = frame.to_canvas(0.0, 0.0);
        primitives.push(BoardCommand::line(
            Point::new(frame.area.x, origin.y),
            Point::new(frame.area.right(), origin.y),
            theme.secondary_color,
            1.5,
        ));
        primitives.push(BoardCommand::line(
            Point::new(origin.x, frame.area.y),
            Point::new(origin.x, frame.area.bottom()),
            theme.secondary_color,
            1.5,
        ));

        for (index, equation) in compiled.iter().enumerate() {
            let color = GRAPH_PALETTE[index % GRAPH_PALETTE.len()];
            let runs = sample_runs(equation, &frame);
            if runs.is_empty() {
                self.log(
                    LogLevel::Debug,
                    "equation_fully_clipped",
                    [json_str("equation", equation.source())],
                );
            }
            for points in runs {
                primitives.push(BoardCommand::Stroke {
                    points,
                    color: color.to_string(),
                    width: 2.5,
                });
            }
        }

        let bbox = Rect::new(x, top, PLOT_WIDTH, frame.area.bottom() - top);
        self.advance(zone, bbox.bottom() + BLOCK_SPACING);
        self.warn_on_overflow(zone, &bbox);

        let text = title
            .map(str::to_string)
            .unwrap_or_else(|| equations.join("; "));
        let element = Element::new(self.mint_id("el"), Role::Container, zone, bbox)
            .with_text(text)
            .referencing(anchor.map(|(id, _)| id.to_string()));
        self.insert_element(element.clone());
        self.log(
            LogLevel::Debug,
            "graph_drawn",
            [
                json_str("id", element.id.as_str()),
                json_kv("equations", compiled.len()),
            ],
        );
        Ok(LayoutOutput::new(element, primitives))
    }
}
