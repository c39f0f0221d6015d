use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::BoardConfig;
use crate::element::{Element, ElementId, Role, Zone};
use crate::geometry::{Point, Rect, Size};
use crate::logging::{LogLevel, Logger, json_kv, json_str};
use crate::primitive::{BoardCommand, TextAlign};
use crate::theme::{Subject, Theme};

use super::tree::node_primitives;
use super::typography::{StyleConfig, TextStyle, estimate_height, indent_for};

pub(super) const LOG_TARGET: &str = "chalkboard::layout";

pub(super) const GROUP_HEADER_HEIGHT: f64 = 100.0;
pub(super) const GROUP_INSET: f64 = 20.0;
const GROUP_SPACING: f64 = 20.0;
const FLOAT_GAP: f64 = 10.0;
const SHAPE_WIDTH: f64 = 300.0;
const SHAPE_HEIGHT: f64 = 200.0;
/// Box every drawn shape occupies.
pub const SHAPE_SIZE: Size = Size::new(SHAPE_WIDTH, SHAPE_HEIGHT);
const SHAPE_RELATIVE_GAP: f64 = 20.0;
pub(super) const BLOCK_SPACING: f64 = 40.0;
const BACKGROUND_INSET: f64 = 8.0;
const ELLIPSE_SEGMENTS: usize = 36;

/// Column arrangement of the main and sidebar zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    #[default]
    Standard,
    SplitView,
}

/// Requested placement of a new element relative to the zone layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Flow,
    Aside,
    Indent,
    Header,
    Footer,
}

impl Placement {
    /// Map a free-form region name to a placement.
    pub fn from_region(region: &str) -> Option<Self> {
        match region.trim().to_ascii_lowercase().as_str() {
            "" | "main" | "flow" | "body" => Some(Placement::Flow),
            "aside" | "sidebar" | "side" => Some(Placement::Aside),
            "indent" | "indented" => Some(Placement::Indent),
            "header" | "top" => Some(Placement::Header),
            "footer" | "bottom" => Some(Placement::Footer),
            _ => None,
        }
    }

    fn zone(self) -> Zone {
        match self {
            Placement::Aside => Zone::Sidebar,
            Placement::Header => Zone::Header,
            Placement::Footer => Zone::Footer,
            Placement::Flow | Placement::Indent => Zone::Main,
        }
    }
}

/// Next insertion point and usable width of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

/// Titled container whose box grows to enclose its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: ElementId,
    pub title: String,
    pub bbox: Rect,
}

/// Everything a single layout call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutput {
    pub element: Element,
    pub primitives: Vec<BoardCommand>,
    /// Addressable sub-elements (tree nodes, timeline events).
    pub members: Vec<Element>,
}

impl LayoutOutput {
    pub(super) fn new(element: Element, primitives: Vec<BoardCommand>) -> Self {
        Self {
            element,
            primitives,
            members: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.element.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Ellipse,
    Triangle,
    Diamond,
}

impl std::str::FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rect" | "rectangle" | "box" | "square" => Ok(ShapeKind::Rectangle),
            "circle" => Ok(ShapeKind::Circle),
            "ellipse" | "oval" => Ok(ShapeKind::Ellipse),
            "triangle" => Ok(ShapeKind::Triangle),
            "diamond" | "rhombus" => Ok(ShapeKind::Diamond),
            other => Err(format!("unknown shape `{other}`")),
        }
    }
}

/// Text placement request. Built with the `with_*` helpers.
#[derive(Debug, Clone, Default)]
pub struct TextRequest {
    pub text: String,
    pub role: Role,
    pub placement: Placement,
    pub relative_to: Option<ElementId>,
    pub group_id: Option<ElementId>,
    pub style: StyleConfig,
}

impl TextRequest {
    pub fn new(text: impl Into<String>, role: Role) -> Self {
        Self {
            text: text.into(),
            role,
            ..Self::default()
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn relative_to(mut self, id: impl Into<ElementId>) -> Self {
        self.relative_to = Some(id.into());
        self
    }

    pub fn in_group(mut self, id: impl Into<ElementId>) -> Self {
        self.group_id = Some(id.into());
        self
    }

    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }
}

/// How an element was drawn, so a text change can redraw it faithfully.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Appearance {
    /// Free text and the overrides it was written with.
    Text(StyleConfig),
    /// Shape outline with a centered label.
    Shape(ShapeKind),
    /// Boxed tree node.
    Node,
    /// Centered caption in its own box.
    Caption,
}

/// Zone/cursor layout engine. One instance per board session.
pub struct LayoutEngine {
    pub(super) config: BoardConfig,
    pub(super) mode: LayoutMode,
    pub(super) subject: Subject,
    pub(super) cursors: HashMap<Zone, Cursor>,
    pub(super) elements: IndexMap<ElementId, Element>,
    pub(super) groups: IndexMap<ElementId, Group>,
    appearances: HashMap<ElementId, Appearance>,
    next_id: u64,
    logger: Option<Logger>,
}

impl LayoutEngine {
    pub fn new(config: BoardConfig) -> Self {
        let subject = config.subject;
        let mut engine = Self {
            config,
            mode: LayoutMode::Standard,
            subject,
            cursors: HashMap::new(),
            elements: IndexMap::new(),
            groups: IndexMap::new(),
            appearances: HashMap::new(),
            next_id: 0,
            logger: None,
        };
        engine.recompute_cursors();
        engine
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn set_logger(&mut self, logger: Option<Logger>) {
        self.logger = logger;
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn theme(&self) -> &'static Theme {
        Theme::for_subject(self.subject)
    }

    pub fn canvas(&self) -> Size {
        self.config.canvas()
    }

    pub fn cursor(&self, zone: Zone) -> Cursor {
        self.cursors
            .get(&zone)
            .copied()
            .unwrap_or_else(|| self.zone_origin(zone))
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Bounding box of an element or group.
    pub fn bounds_of(&self, id: &str) -> Option<Rect> {
        self.elements
            .get(id)
            .map(|element| element.bbox)
            .or_else(|| self.groups.get(id).map(|group| group.bbox))
    }

    pub fn set_subject(&mut self, subject: Subject) {
        if self.subject != subject {
            self.subject = subject;
            self.log(
                LogLevel::Info,
                "subject_changed",
                [json_str("subject", subject.as_str())],
            );
        }
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.recompute_cursors();
        self.log(
            LogLevel::Info,
            "layout_mode_changed",
            [json_kv("mode", json!(mode))],
        );
    }

    /// Forget an element or group. Returns whether anything was removed.
    pub fn forget(&mut self, id: &str) -> bool {
        self.appearances.remove(id);
        let element = self.elements.shift_remove(id).is_some();
        let group = self.groups.shift_remove(id).is_some();
        element || group
    }

    /// Drop every placement and restart all cursors. Ids keep counting.
    pub fn reset(&mut self) -> Vec<BoardCommand> {
        self.elements.clear();
        self.groups.clear();
        self.appearances.clear();
        self.cursors.clear();
        self.mode = LayoutMode::Standard;
        self.recompute_cursors();
        vec![BoardCommand::Clear {
            background: self.theme().background.to_string(),
        }]
    }

    pub fn resize(&mut self, size: Size) -> Vec<BoardCommand> {
        self.config.width = size.width;
        self.config.height = size.height;
        self.reset()
    }

    /// Full rectangle a zone may occupy under the current mode.
    pub fn zone_bounds(&self, zone: Zone) -> Rect {
        let origin = self.zone_origin(zone);
        let footer_top = self.config.height - self.config.padding - self.config.footer_height;
        let bottom = match zone {
            Zone::Header => self.config.padding + self.config.header_height,
            Zone::Footer => self.config.height - self.config.padding,
            Zone::Main | Zone::Sidebar | Zone::Floating => footer_top,
        };
        Rect::new(
            origin.x,
            origin.y,
            origin.width,
            (bottom - origin.y).max(0.0),
        )
    }

    /// Rewind a zone's cursor to its origin.
    pub fn rewind(&mut self, zone: Zone) {
        let origin = self.zone_origin(zone);
        self.cursors.insert(zone, origin);
    }

    pub fn write_text(&mut self, request: TextRequest) -> LayoutOutput {
        let TextRequest {
            text,
            role,
            placement,
            relative_to,
            group_id,
            style: overrides,
        } = request;

        let zone = self.zone_for(role, placement);
        self.ensure_zone_mode(zone);

        let style = TextStyle::resolve(role, self.theme(), &overrides);
        let indent = indent_for(role, placement == Placement::Indent);
        let cursor = self.cursor(zone);

        let group = group_id
            .as_deref()
            .and_then(|id| self.groups.get(id))
            .map(|group| group.bbox);
        let anchor = match (group, role.is_floating()) {
            (None, true) => relative_to
                .as_deref()
                .and_then(|id| self.bounds_of(id).map(|bbox| (id.to_string(), bbox))),
            _ => None,
        };

        let (x, y, max_width) = if let Some(bbox) = group {
            (
                bbox.x + GROUP_INSET + indent,
                bbox.bottom(),
                bbox.width - GROUP_INSET * 2.0 - indent,
            )
        } else if let Some((_, bbox)) = anchor.as_ref() {
            let available = self.config.width - self.config.padding - bbox.x - indent;
            (bbox.x + indent, bbox.bottom() + FLOAT_GAP, available)
        } else {
            (cursor.x + indent, cursor.y, cursor.width - indent)
        };
        let max_width = max_width.max(1.0);

        let display_text = display_text(role, &text);
        let height = estimate_height(&display_text, style.font_size, max_width);
        let bbox = Rect::new(x, y, max_width, height);

        if let Some(id) = group_id.as_deref().filter(|_| group.is_some()) {
            self.expand_group(id, &bbox);
        } else if anchor.is_none() && zone != Zone::Floating {
            self.advance(zone, bbox.bottom() + style.margin);
        }
        self.warn_on_overflow(zone, &bbox);

        let primitives = self.text_primitives(role, &display_text, &bbox, &style, &overrides);

        let element = Element::new(self.mint_id("el"), role, zone, bbox)
            .with_text(text)
            .in_group(group.and(group_id))
            .referencing(anchor.map(|(id, _)| id));
        self.log(
            LogLevel::Debug,
            "text_placed",
            [
                json_str("id", element.id.as_str()),
                json_str("role", role.as_str()),
                json_str("zone", zone.as_str()),
                json_kv("y", bbox.y),
                json_kv("height", bbox.height),
            ],
        );
        self.set_appearance(&element.id, Appearance::Text(overrides));
        self.elements.insert(element.id.clone(), element.clone());
        LayoutOutput::new(element, primitives)
    }

    /// Redraw an element or group with new text in its existing box. Shapes
    /// keep their outline, text keeps its style overrides and groups redraw
    /// their header. `None` when the id is unknown or the element carries no
    /// text of its own (whole diagrams, arrows).
    pub fn rewrite_text(&mut self, id: &str, text: &str) -> Option<Vec<BoardCommand>> {
        let theme = self.theme();
        let primitives = if let Some(group) = self.groups.get_mut(id) {
            group.title = text.to_string();
            let bbox = group.bbox;
            let header = Rect::new(bbox.x, bbox.y, bbox.width, GROUP_HEADER_HEIGHT);
            let mut primitives = vec![BoardCommand::erase(header)];
            primitives.extend(group_primitives(&bbox, text, theme));
            primitives
        } else {
            let element = self.elements.get(id)?;
            let (role, bbox) = (element.role, element.bbox);
            match self.appearances.get(id)? {
                Appearance::Text(overrides) => {
                    let style = TextStyle::resolve(role, theme, overrides);
                    let decorated =
                        overrides.background.is_some() || overrides.border.unwrap_or(false);
                    let area = if decorated {
                        bbox.inflate(BACKGROUND_INSET)
                    } else {
                        bbox
                    };
                    let mut primitives = vec![BoardCommand::erase(area)];
                    primitives.extend(self.text_primitives(
                        role,
                        &display_text(role, text),
                        &bbox,
                        &style,
                        overrides,
                    ));
                    primitives
                }
                Appearance::Shape(shape) => {
                    let mut primitives = vec![BoardCommand::erase(bbox)];
                    primitives.extend(shape_primitives(*shape, &bbox, Some(text), theme));
                    primitives
                }
                Appearance::Node => {
                    let mut primitives = vec![BoardCommand::erase(bbox)];
                    primitives.extend(node_primitives(&bbox, text, theme));
                    primitives
                }
                Appearance::Caption => vec![
                    BoardCommand::erase(bbox),
                    centered_text(text, &bbox, &TextStyle::for_role(role, theme)),
                ],
            }
        };
        if let Some(element) = self.elements.get_mut(id) {
            element.text = Some(text.to_string());
        }
        self.log(LogLevel::Debug, "text_rewritten", [json_str("id", id)]);
        Some(primitives)
    }

    pub fn draw_shape(
        &mut self,
        shape: ShapeKind,
        placement: Placement,
        label: Option<&str>,
        relative_to: Option<&str>,
    ) -> LayoutOutput {
        let zone = placement.zone();
        self.ensure_zone_mode(zone);
        let cursor = self.cursor(zone);
        let anchor = relative_to.and_then(|id| self.bounds_of(id).map(|bbox| (id, bbox)));

        let bbox = match anchor {
            Some((_, reference)) => {
                let bbox = Rect::new(
                    reference.x,
                    reference.bottom() + SHAPE_RELATIVE_GAP,
                    SHAPE_WIDTH,
                    SHAPE_HEIGHT,
                );
                // Only reserve space the cursor has not already covered.
                if bbox.bottom() + BLOCK_SPACING > cursor.y {
                    self.advance(zone, bbox.bottom() + BLOCK_SPACING);
                }
                bbox
            }
            None => {
                let x = cursor.x + ((cursor.width - SHAPE_WIDTH) / 2.0).max(0.0);
                let bbox = Rect::new(x, cursor.y, SHAPE_WIDTH, SHAPE_HEIGHT);
                self.advance(zone, bbox.bottom() + BLOCK_SPACING);
                bbox
            }
        };
        self.warn_on_overflow(zone, &bbox);

        let primitives = shape_primitives(shape, &bbox, label, self.theme());

        let mut element = Element::new(self.mint_id("el"), Role::Container, zone, bbox)
            .referencing(anchor.map(|(id, _)| id.to_string()));
        if let Some(text) = label {
            element = element.with_text(text);
        }
        self.set_appearance(&element.id, Appearance::Shape(shape));
        self.elements.insert(element.id.clone(), element.clone());
        LayoutOutput::new(element, primitives)
    }

    /// Draw a shape into a box chosen elsewhere (the grid placer). The
    /// element keeps its id and no cursor moves.
    pub fn adopt_shape(&mut self, shape: ShapeKind, element: Element) -> LayoutOutput {
        let bbox = element.bbox;
        let primitives = shape_primitives(shape, &bbox, element.text.as_deref(), self.theme());
        self.warn_on_overflow(element.zone, &bbox);
        self.set_appearance(&element.id, Appearance::Shape(shape));
        self.insert_element(element.clone());
        LayoutOutput::new(element, primitives)
    }

    pub fn create_group(&mut self, title: &str, placement: Placement) -> LayoutOutput {
        let zone = placement.zone();
        self.ensure_zone_mode(zone);
        let cursor = self.cursor(zone);
        let bbox = Rect::new(cursor.x, cursor.y, cursor.width, GROUP_HEADER_HEIGHT);
        self.advance(zone, bbox.bottom() + GROUP_SPACING);

        let primitives = group_primitives(&bbox, title, self.theme());

        let id = self.mint_id("group");
        let group = Group {
            id: id.clone(),
            title: title.to_string(),
            bbox,
        };
        self.groups.insert(id.clone(), group);
        self.log(
            LogLevel::Debug,
            "group_created",
            [json_str("id", id.as_str()), json_str("zone", zone.as_str())],
        );

        let element = Element::new(id, Role::GroupTitle, zone, bbox).with_text(title);
        LayoutOutput::new(element, primitives)
    }

    /// Arrow from the source's right edge to the target's left edge.
    /// `None` when either side is not a known element or group.
    pub fn connect_elements(
        &mut self,
        source: &str,
        target: &str,
        label: Option<&str>,
    ) -> Option<LayoutOutput> {
        let (Some(from_box), Some(to_box)) = (self.bounds_of(source), self.bounds_of(target))
        else {
            self.log(
                LogLevel::Debug,
                "connect_unresolved",
                [json_str("source", source), json_str("target", target)],
            );
            return None;
        };

        let theme = self.theme();
        let from = from_box.mid_right();
        let to = to_box.mid_left();
        let mut primitives = vec![BoardCommand::Arrow {
            x1: from.x,
            y1: from.y,
            x2: to.x,
            y2: to.y,
            color: theme.primary_color.to_string(),
            width: 2.0,
        }];

        let span = Rect::new(
            from.x.min(to.x),
            from.y.min(to.y),
            (to.x - from.x).abs(),
            (to.y - from.y).abs(),
        );
        if let Some(text) = label {
            let style = TextStyle::for_role(Role::Connector, theme);
            let mid = Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
            let width = span.width.max(120.0);
            let label_box = Rect::new(
                mid.x - width / 2.0,
                mid.y - style.line_height() - 6.0,
                width,
                style.line_height(),
            );
            primitives.push(centered_text(text, &label_box, &style));
        }

        let mut element = Element::new(self.mint_id("el"), Role::Connector, Zone::Floating, span)
            .referencing(Some(source.to_string()));
        if let Some(text) = label {
            element = element.with_text(text);
        }
        self.elements.insert(element.id.clone(), element.clone());
        Some(LayoutOutput::new(element, primitives))
    }

    pub(super) fn mint_id(&mut self, prefix: &str) -> ElementId {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    pub(super) fn zone_for(&self, role: Role, placement: Placement) -> Zone {
        if role == Role::Title {
            Zone::Header
        } else if role.is_floating() {
            Zone::Floating
        } else {
            placement.zone()
        }
    }

    /// First sidebar placement flips a standard board into split view.
    pub(super) fn ensure_zone_mode(&mut self, zone: Zone) {
        if zone == Zone::Sidebar && self.mode == LayoutMode::Standard {
            self.set_layout_mode(LayoutMode::SplitView);
        }
    }

    /// Move a zone's cursor down to `y`. Floating never advances.
    pub(super) fn advance(&mut self, zone: Zone, y: f64) {
        if zone == Zone::Floating {
            return;
        }
        let mut cursor = self.cursor(zone);
        cursor.y = cursor.y.max(y);
        self.cursors.insert(zone, cursor);
    }

    pub(super) fn set_appearance(&mut self, id: &str, appearance: Appearance) {
        self.appearances.insert(id.to_string(), appearance);
    }

    pub(super) fn insert_element(&mut self, element: Element) {
        self.elements.insert(element.id.clone(), element);
    }

    pub(super) fn zone_origin(&self, zone: Zone) -> Cursor {
        let padding = self.config.padding;
        let available = (self.config.width - padding * 2.0).max(0.0);
        let content_top = padding + self.config.header_height;
        let main_width = match self.mode {
            LayoutMode::Standard => available,
            LayoutMode::SplitView => available * self.config.split_ratio,
        };
        let split_main = available * self.config.split_ratio;

        match zone {
            Zone::Header => Cursor {
                x: padding,
                y: padding,
                width: available,
            },
            Zone::Main => Cursor {
                x: padding,
                y: content_top,
                width: main_width,
            },
            Zone::Sidebar => Cursor {
                x: padding + split_main + self.config.column_gap,
                y: content_top,
                width: (available - split_main - self.config.column_gap).max(0.0),
            },
            Zone::Footer => Cursor {
                x: padding,
                y: self.config.height - padding - self.config.footer_height,
                width: available,
            },
            Zone::Floating => Cursor {
                x: padding,
                y: content_top,
                width: available,
            },
        }
    }

    /// Geometry is rebuilt from the configuration; y never moves above what
    /// a zone has already filled. Main and sidebar share a starting line.
    fn recompute_cursors(&mut self) {
        let previous = std::mem::take(&mut self.cursors);
        let frontier = |zone: Zone| previous.get(&zone).map(|c| c.y).unwrap_or(f64::MIN);
        let column_y = frontier(Zone::Main).max(frontier(Zone::Sidebar));

        for zone in Zone::ALL {
            let mut cursor = self.zone_origin(zone);
            match zone {
                Zone::Main | Zone::Sidebar => cursor.y = cursor.y.max(column_y),
                Zone::Floating => {}
                Zone::Header | Zone::Footer => cursor.y = cursor.y.max(frontier(zone)),
            }
            self.cursors.insert(zone, cursor);
        }
    }

    fn expand_group(&mut self, id: &str, child: &Rect) {
        if let Some(group) = self.groups.get_mut(id) {
            let needed = child.bottom() + GROUP_INSET - group.bbox.y;
            group.bbox.height = group.bbox.height.max(needed);
        }
    }

    /// Text plus the optional background fill and border outline.
    fn text_primitives(
        &self,
        role: Role,
        text: &str,
        bbox: &Rect,
        style: &TextStyle,
        overrides: &StyleConfig,
    ) -> Vec<BoardCommand> {
        let mut primitives = Vec::new();
        if let Some(fill) = overrides.background.as_deref() {
            primitives.push(BoardCommand::filled(
                bbox.inflate(BACKGROUND_INSET),
                fill,
                fill,
            ));
        }
        primitives.push(self.text_primitive(role, text, bbox, style));
        if overrides.border.unwrap_or(false) {
            primitives.push(BoardCommand::outline(
                bbox.inflate(BACKGROUND_INSET),
                &style.color,
                2.0,
            ));
        }
        primitives
    }

    fn text_primitive(&self, role: Role, text: &str, bbox: &Rect, style: &TextStyle) -> BoardCommand {
        match role {
            Role::Equation => BoardCommand::Formula {
                x: bbox.x,
                y: bbox.y,
                expression: text.to_string(),
                font_size: style.font_size,
                color: style.color.clone(),
            },
            Role::Title => text_command(text, bbox, style, TextAlign::Center),
            _ => text_command(text, bbox, style, TextAlign::Left),
        }
    }

    pub(super) fn warn_on_overflow(&self, zone: Zone, bbox: &Rect) {
        if bbox.bottom() > self.config.height {
            self.log(
                LogLevel::Warn,
                "zone_overflow",
                [
                    json_str("zone", zone.as_str()),
                    json_kv("bottom", bbox.bottom()),
                    json_kv("canvas_height", self.config.height),
                ],
            );
        }
    }

    pub(super) fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.logger.as_ref() {
            logger.emit(level, LOG_TARGET, message, fields);
        }
    }
}

/// Text primitive anchored to `bbox`; centered text is positioned by its midpoint.
pub(super) fn text_command(
    text: &str,
    bbox: &Rect,
    style: &TextStyle,
    align: TextAlign,
) -> BoardCommand {
    let x = match align {
        TextAlign::Left => bbox.x,
        TextAlign::Center => bbox.x + bbox.width / 2.0,
    };
    BoardCommand::Text {
        x,
        y: bbox.y,
        text: text.to_string(),
        font_size: style.font_size,
        font_weight: style.font_weight.clone(),
        font_style: style.font_style.clone(),
        font_family: style.font_family.clone(),
        color: style.color.clone(),
        align,
        max_width: bbox.width,
        underline: style.underline,
    }
}

pub(super) fn centered_text(text: &str, bbox: &Rect, style: &TextStyle) -> BoardCommand {
    text_command(text, bbox, style, TextAlign::Center)
}

fn display_text(role: Role, text: &str) -> String {
    if role == Role::Bullet {
        format!("• {text}")
    } else {
        text.to_string()
    }
}

fn shape_primitives(
    shape: ShapeKind,
    bbox: &Rect,
    label: Option<&str>,
    theme: &Theme,
) -> Vec<BoardCommand> {
    let mut primitives = vec![shape_primitive(shape, bbox, theme.primary_color)];
    if let Some(text) = label {
        let style = TextStyle::for_role(Role::Label, theme);
        let label_box = Rect::new(
            bbox.x,
            bbox.center().y - style.line_height() / 2.0,
            bbox.width,
            style.line_height(),
        );
        primitives.push(centered_text(text, &label_box, &style));
    }
    primitives
}

/// Group outline and its title, inset from the top-left corner.
fn group_primitives(bbox: &Rect, title: &str, theme: &Theme) -> Vec<BoardCommand> {
    let style = TextStyle::for_role(Role::GroupTitle, theme);
    let title_box = Rect::new(
        bbox.x + GROUP_INSET,
        bbox.y + GROUP_INSET,
        bbox.width - GROUP_INSET * 2.0,
        style.line_height(),
    );
    vec![
        BoardCommand::outline(*bbox, theme.secondary_color, 2.0),
        text_command(title, &title_box, &style, TextAlign::Left),
    ]
}

fn shape_primitive(shape: ShapeKind, bbox: &Rect, color: &str) -> BoardCommand {
    let center = bbox.center();
    match shape {
        ShapeKind::Rectangle => BoardCommand::outline(*bbox, color, 2.0),
        ShapeKind::Circle => BoardCommand::Circle {
            cx: center.x,
            cy: center.y,
            radius: bbox.width.min(bbox.height) / 2.0,
            stroke: color.to_string(),
            fill: None,
        },
        ShapeKind::Ellipse => {
            let (rx, ry) = (bbox.width / 2.0, bbox.height / 2.0);
            let points = (0..ELLIPSE_SEGMENTS)
                .map(|i| {
                    let angle = i as f64 / ELLIPSE_SEGMENTS as f64 * std::f64::consts::TAU;
                    Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin())
                })
                .collect();
            BoardCommand::Polygon {
                points,
                stroke: color.to_string(),
                fill: None,
            }
        }
        ShapeKind::Triangle => BoardCommand::Polygon {
            points: vec![
                Point::new(center.x, bbox.y),
                Point::new(bbox.right(), bbox.bottom()),
                Point::new(bbox.x, bbox.bottom()),
            ],
            stroke: color.to_string(),
            fill: None,
        },
        ShapeKind::Diamond => BoardCommand::Polygon {
            points: vec![
                Point::new(center.x, bbox.y),
                Point::new(bbox.right(), center.y),
                Point::new(center.x, bbox.bottom()),
                Point::new(bbox.x, center.y),
            ],
            stroke: color.to_string(),
            fill: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(BoardConfig::default())
    }

    #[test]
    fn title_goes_to_header_centered_without_moving_main() {
        let mut engine = engine();
        let main_before = engine.cursor(Zone::Main);

        let out = engine.write_text(TextRequest::new("Hello", Role::Title));

        assert_eq!(out.element.zone, Zone::Header);
        assert_eq!(engine.cursor(Zone::Main), main_before);
        assert_eq!(out.primitives.len(), 1);
        match &out.primitives[0] {
            BoardCommand::Text { align, x, .. } => {
                assert_eq!(*align, TextAlign::Center);
                assert_eq!(*x, 960.0);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn sequential_body_text_stacks_downward() {
        let mut engine = engine();
        let first = engine.write_text(TextRequest::new("First paragraph", Role::Body));
        let second = engine.write_text(TextRequest::new("Second paragraph", Role::Body));

        let a = first.element.bbox;
        let b = second.element.bbox;
        assert!(b.y > a.y + a.height);
        assert_eq!(b.y, a.bottom() + 16.0);
    }

    #[test]
    fn main_cursor_never_moves_up() {
        let mut engine = engine();
        let mut last = engine.cursor(Zone::Main).y;
        for (i, role) in [Role::Heading, Role::Body, Role::Bullet, Role::Equation, Role::Example]
            .into_iter()
            .enumerate()
        {
            engine.write_text(TextRequest::new("x".repeat(i * 40 + 1), role));
            let now = engine.cursor(Zone::Main).y;
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn aside_switches_to_split_view() {
        let mut engine = engine();
        assert_eq!(engine.layout_mode(), LayoutMode::Standard);
        assert_eq!(engine.cursor(Zone::Main).width, 1800.0);

        let out = engine.write_text(
            TextRequest::new("Side fact", Role::Body).with_placement(Placement::Aside),
        );

        assert_eq!(out.element.zone, Zone::Sidebar);
        assert_eq!(engine.layout_mode(), LayoutMode::SplitView);
        assert!((engine.cursor(Zone::Main).width - 1080.0).abs() < 1e-9);
        let sidebar = engine.cursor(Zone::Sidebar);
        assert!((sidebar.x - 1180.0).abs() < 1e-9);
        assert!((sidebar.width - 680.0).abs() < 1e-9);
    }

    #[test]
    fn split_view_keeps_the_content_frontier() {
        let mut engine = engine();
        engine.write_text(TextRequest::new("Intro", Role::Heading));
        let main_y = engine.cursor(Zone::Main).y;

        engine.set_layout_mode(LayoutMode::SplitView);

        assert_eq!(engine.cursor(Zone::Main).y, main_y);
        assert_eq!(engine.cursor(Zone::Sidebar).y, main_y);
    }

    #[test]
    fn split_view_is_never_reverted_automatically() {
        let mut engine = engine();
        engine.write_text(TextRequest::new("a", Role::Body).with_placement(Placement::Aside));
        engine.write_text(TextRequest::new("b", Role::Body));
        assert_eq!(engine.layout_mode(), LayoutMode::SplitView);
    }

    #[test]
    fn grouped_text_grows_group_but_not_cursor() {
        let mut engine = engine();
        let group = engine.create_group("Forces", Placement::Flow);
        let cursor_after_group = engine.cursor(Zone::Main).y;
        let mut height = engine.group(group.id()).unwrap().bbox.height;
        assert_eq!(height, GROUP_HEADER_HEIGHT);

        for text in ["Gravity", "Friction", "Tension"] {
            let child = engine.write_text(TextRequest::new(text, Role::Bullet).in_group(group.id()));
            let bbox = engine.group(group.id()).unwrap().bbox;
            assert!(bbox.contains_rect(&child.element.bbox));
            assert!(bbox.height >= height);
            height = bbox.height;
            assert_eq!(child.element.group_id.as_deref(), Some(group.id()));
        }
        assert_eq!(engine.cursor(Zone::Main).y, cursor_after_group);
    }

    #[test]
    fn notes_anchor_below_their_reference() {
        let mut engine = engine();
        let body = engine.write_text(TextRequest::new("Newton's second law", Role::Body));
        let cursor = engine.cursor(Zone::Main);

        let note = engine.write_text(TextRequest::new("F = ma", Role::Note).relative_to(body.id()));

        assert_eq!(note.element.zone, Zone::Floating);
        assert_eq!(note.element.bbox.y, body.element.bbox.bottom() + FLOAT_GAP);
        assert_eq!(note.element.ref_id.as_deref(), Some(body.id()));
        assert_eq!(engine.cursor(Zone::Main), cursor);
    }

    #[test]
    fn equations_emit_formula_primitives() {
        let mut engine = engine();
        let out = engine.write_text(TextRequest::new("E = mc^2", Role::Equation));
        assert_eq!(out.primitives[0].kind(), "formula");
    }

    #[test]
    fn style_background_and_border_wrap_text() {
        let mut engine = engine();
        let style = StyleConfig {
            background: Some("#333333".into()),
            border: Some(true),
            ..StyleConfig::default()
        };
        let out = engine.write_text(TextRequest::new("Key idea", Role::Body).with_style(style));
        let kinds: Vec<_> = out.primitives.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec!["rect", "text", "rect"]);
    }

    #[test]
    fn shapes_relative_to_reference_do_not_double_reserve() {
        let mut engine = engine();
        let first = engine.draw_shape(ShapeKind::Rectangle, Placement::Flow, Some("A"), None);
        let cursor_after_first = engine.cursor(Zone::Main).y;
        assert_eq!(cursor_after_first, first.element.bbox.bottom() + BLOCK_SPACING);

        let reference = engine.write_text(TextRequest::new("anchor", Role::Body));
        let cursor_before = engine.cursor(Zone::Main).y;
        let below = engine.draw_shape(ShapeKind::Circle, Placement::Flow, None, Some(reference.id()));
        assert_eq!(
            below.element.bbox.y,
            reference.element.bbox.bottom() + SHAPE_RELATIVE_GAP
        );
        assert!(engine.cursor(Zone::Main).y >= cursor_before);
        assert_eq!(
            engine.cursor(Zone::Main).y,
            below.element.bbox.bottom() + BLOCK_SPACING
        );
    }

    #[test]
    fn shapes_are_centered_in_the_column() {
        let mut engine = engine();
        let out = engine.draw_shape(ShapeKind::Diamond, Placement::Flow, None, None);
        assert_eq!(out.element.bbox.x, 60.0 + (1800.0 - 300.0) / 2.0);
        assert_eq!(out.primitives[0].kind(), "polygon");
    }

    #[test]
    fn rewrite_keeps_the_box() {
        let mut engine = engine();
        let out = engine.write_text(TextRequest::new("Draft", Role::Bullet));
        let cursor = engine.cursor(Zone::Main);

        let primitives = engine.rewrite_text(out.id(), "Final").unwrap();

        assert_eq!(primitives[0], BoardCommand::erase(out.element.bbox));
        match &primitives[1] {
            BoardCommand::Text { text, y, .. } => {
                assert_eq!(text, "• Final");
                assert_eq!(*y, out.element.bbox.y);
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(engine.element(out.id()).unwrap().text.as_deref(), Some("Final"));
        assert_eq!(engine.cursor(Zone::Main), cursor);
        assert!(engine.rewrite_text("missing", "x").is_none());
    }

    #[test]
    fn rewriting_a_shape_redraws_outline_and_label() {
        let mut engine = engine();
        let out = engine.draw_shape(ShapeKind::Circle, Placement::Flow, Some("Cell"), None);

        let primitives = engine.rewrite_text(out.id(), "Nucleus").unwrap();

        let kinds: Vec<_> = primitives.iter().map(BoardCommand::kind).collect();
        assert_eq!(kinds, ["erase-area", "circle", "text"]);
        match &primitives[2] {
            BoardCommand::Text { text, align, .. } => {
                assert_eq!(text, "Nucleus");
                assert_eq!(*align, TextAlign::Center);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn rewriting_styled_text_keeps_its_overrides() {
        let mut engine = engine();
        let style = StyleConfig {
            size: Some(40.0),
            color: Some("#ff0000".into()),
            ..StyleConfig::default()
        };
        let out = engine.write_text(TextRequest::new("Hot", Role::Body).with_style(style));

        let primitives = engine.rewrite_text(out.id(), "Cold").unwrap();

        match &primitives[1] {
            BoardCommand::Text {
                text,
                color,
                font_size,
                ..
            } => {
                assert_eq!(text, "Cold");
                assert_eq!(color, "#ff0000");
                assert_eq!(*font_size, 40.0);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn rewriting_a_group_redraws_its_header() {
        let mut engine = engine();
        let group = engine.create_group("Forces", Placement::Flow);
        let bbox = group.element.bbox;

        let primitives = engine.rewrite_text(group.id(), "Motion").unwrap();

        assert_eq!(
            primitives[0],
            BoardCommand::erase(Rect::new(bbox.x, bbox.y, bbox.width, GROUP_HEADER_HEIGHT))
        );
        assert_eq!(primitives[1].kind(), "rect");
        assert!(matches!(&primitives[2], BoardCommand::Text { text, .. } if text == "Motion"));
        assert_eq!(engine.element(group.id()).unwrap().text.as_deref(), Some("Motion"));
    }

    #[test]
    fn adopted_shapes_keep_their_box_and_id() {
        let mut engine = engine();
        let cursor = engine.cursor(Zone::Main);
        let element = Element::new("entity-7", Role::Container, Zone::Sidebar, Rect::new(1400.0, 300.0, 300.0, 200.0))
            .with_text("Cell");

        let out = engine.adopt_shape(ShapeKind::Circle, element.clone());

        assert_eq!(out.element, element);
        assert_eq!(engine.bounds_of("entity-7"), Some(element.bbox));
        assert_eq!(engine.cursor(Zone::Main), cursor);
        assert_eq!(engine.layout_mode(), LayoutMode::Standard);
        let kinds: Vec<_> = out.primitives.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec!["circle", "text"]);
    }

    #[test]
    fn connect_returns_none_for_unknown_ids() {
        let mut engine = engine();
        let a = engine.write_text(TextRequest::new("A", Role::Body));
        let group = engine.create_group("G", Placement::Flow);

        assert!(engine.connect_elements(a.id(), "missing", None).is_none());
        assert!(engine.connect_elements("missing", a.id(), None).is_none());

        let arrow = engine
            .connect_elements(a.id(), group.id(), Some("leads to"))
            .unwrap();
        let kinds: Vec<_> = arrow.primitives.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec!["arrow", "text"]);

        engine.forget(group.id());
        assert!(engine.connect_elements(a.id(), group.id(), None).is_none());
    }

    #[test]
    fn ids_are_unique_across_resets() {
        let mut engine = engine();
        let a = engine.write_text(TextRequest::new("A", Role::Body));
        engine.reset();
        let b = engine.write_text(TextRequest::new("A", Role::Body));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn subject_change_only_affects_later_primitives() {
        let mut engine = engine();
        let before = engine.write_text(TextRequest::new("A", Role::Body));
        engine.set_subject(Subject::History);
        let after = engine.write_text(TextRequest::new("B", Role::Body));

        let color = |out: &LayoutOutput| match &out.primitives[0] {
            BoardCommand::Text { color, .. } => color.clone(),
            _ => unreachable!(),
        };
        assert_eq!(color(&before), Theme::for_subject(Subject::General).primary_color);
        assert_eq!(color(&after), Theme::for_subject(Subject::History).primary_color);
    }

    #[test]
    fn overflow_is_logged_not_fatal() {
        let sink = MemorySink::new();
        let mut engine = LayoutEngine::new(BoardConfig::default()).with_logger(Logger::new(sink.clone()));
        for _ in 0..20 {
            engine.write_text(TextRequest::new("A long line of lesson text", Role::Heading));
        }
        assert!(sink.messages().iter().any(|m| m == "zone_overflow"));
    }
}
