//! Built-in action handlers.
//!
//! Each handler turns a command into layout calls, records the result on the
//! board, and emits the primitives it produced.

use serde::Deserialize;

use crate::element::{ElementId, Zone};
use crate::error::{BoardError, Result, ValidationError};
use crate::layout::{
    Anchor, GridConstraints, Placement, Region, SHAPE_SIZE, ShapeKind, TextRequest,
    TimelineEvent, TreeNode,
};
use crate::primitive::BoardCommand;

use super::command::Command;
use super::core::{ActionHandler, HandlerContext};

const HIGHLIGHT_PADDING: f64 = 8.0;
const HIGHLIGHT_OPACITY: f64 = 0.3;

pub(super) fn builtin_handlers() -> Vec<Box<dyn ActionHandler>> {
    vec![
        Box::new(WriteText),
        Box::new(DrawShape),
        Box::new(DrawArrow),
        Box::new(CreateDiagram),
        Box::new(Highlight),
        Box::new(Erase),
        Box::new(Modify),
        Box::new(ClearRegion),
    ]
}

fn placement(command: &Command) -> std::result::Result<Placement, ValidationError> {
    match command.region() {
        None => Ok(Placement::Flow),
        Some(region) => Placement::from_region(region)
            .ok_or_else(|| command.invalid(format!("unknown region `{region}`"))),
    }
}

/// Resolve a description or id to a registered element id.
fn resolve(ctx: &HandlerContext<'_>, reference: &str) -> Option<ElementId> {
    ctx.board()
        .registry()
        .resolve(reference)
        .map(|element| element.id.clone())
}

fn resolve_required(ctx: &HandlerContext<'_>, reference: Option<&str>) -> Result<ElementId> {
    let reference = reference.unwrap_or_default();
    resolve(ctx, reference).ok_or_else(|| BoardError::Unresolved(reference.to_string()))
}

pub struct WriteText;

impl ActionHandler for WriteText {
    fn name(&self) -> &str {
        "write_text"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["content"]
    }

    fn validate(&self, command: &Command) -> std::result::Result<(), ValidationError> {
        command.require(self.required_fields())?;
        placement(command).map(|_| ())
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()> {
        let text = command
            .content_text()
            .ok_or_else(|| BoardError::Handler("content must be text".into()))?;
        let style = command.style();
        let role = style.role.unwrap_or_default();
        let mut request = TextRequest::new(text.clone(), role)
            .with_placement(placement(command)?)
            .with_style(style);

        // A reference naming a group places the text inside it.
        if let Some(anchor) = command.relative_to().and_then(|r| resolve(ctx, r)) {
            request = if ctx.board().engine().group(&anchor).is_some() {
                request.in_group(anchor)
            } else {
                request.relative_to(anchor)
            };
        }

        let board = ctx.board_mut();
        let output = board.engine_mut().write_text(request);
        let id = board.record(&output, Some(&text));
        ctx.emit_all(output.primitives);
        ctx.set_element(id);
        Ok(())
    }
}

pub struct DrawShape;

impl DrawShape {
    fn grid_constraints(
        command: &Command,
    ) -> std::result::Result<Option<GridConstraints>, ValidationError> {
        let Some(keyword) = command.align_with() else {
            return Ok(None);
        };
        let mut constraints = GridConstraints::new(SHAPE_SIZE);
        match keyword.parse::<Anchor>() {
            Ok(anchor) => constraints = constraints.with_anchor(anchor),
            // A region name is accepted in place of a keyword.
            Err(_) => match keyword.parse::<Region>() {
                Ok(region) => constraints = constraints.in_region(region),
                Err(reason) => return Err(command.invalid(reason)),
            },
        }
        if let Some(region) = command.region() {
            let region = region.parse::<Region>().map_err(|reason| command.invalid(reason))?;
            constraints = constraints.in_region(region);
        }
        if let Some(padding) = command.padding() {
            constraints = constraints.with_padding(padding);
        }
        Ok(Some(constraints))
    }
}

impl ActionHandler for DrawShape {
    fn name(&self) -> &str {
        "draw_shape"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["content"]
    }

    fn validate(&self, command: &Command) -> std::result::Result<(), ValidationError> {
        command.require(self.required_fields())?;
        let shape = command.content_text().unwrap_or_default();
        shape
            .parse::<ShapeKind>()
            .map_err(|reason| command.invalid(reason))?;
        if Self::grid_constraints(command)?.is_none() {
            placement(command)?;
        }
        Ok(())
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()> {
        let name = command.content_text().unwrap_or_default();
        let shape = name
            .parse::<ShapeKind>()
            .map_err(|reason| BoardError::from(command.invalid(reason)))?;
        let label = command.label.as_deref();
        let description = label.unwrap_or(name.as_str());

        let output = match Self::grid_constraints(command)? {
            Some(constraints) => {
                ctx.board_mut()
                    .place_shape(shape, label, &constraints, Some(description))
            }
            None => {
                let anchor = command.relative_to().and_then(|r| resolve(ctx, r));
                let board = ctx.board_mut();
                let output = board.engine_mut().draw_shape(
                    shape,
                    placement(command)?,
                    label,
                    anchor.as_deref(),
                );
                board.record(&output, Some(description));
                output
            }
        };
        ctx.set_element(output.element.id.clone());
        ctx.emit_all(output.primitives);
        Ok(())
    }
}

pub struct DrawArrow;

impl ActionHandler for DrawArrow {
    fn name(&self) -> &str {
        "draw_arrow"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["from", "to"]
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()> {
        let from = resolve_required(ctx, command.from.as_deref())?;
        let to = resolve_required(ctx, command.to.as_deref())?;
        let label = command.label.as_deref();

        let board = ctx.board_mut();
        let output = board
            .engine_mut()
            .connect_elements(&from, &to, label)
            .ok_or_else(|| BoardError::Unresolved(format!("{from} -> {to}")))?;
        let id = board.record(&output, label);
        board.registry_mut().add_relationship(&from, &to);

        ctx.emit_all(output.primitives);
        ctx.set_element(id);
        Ok(())
    }
}

/// `create_diagram` content, selected by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum DiagramSpec {
    Tree {
        root: TreeNode,
    },
    Timeline {
        events: Vec<TimelineEvent>,
    },
    Graph {
        #[serde(default)]
        title: Option<String>,
        equations: Vec<String>,
    },
    Group {
        title: String,
    },
}

impl DiagramSpec {
    fn from_command(command: &Command) -> std::result::Result<Self, ValidationError> {
        let content = command.content.clone().unwrap_or_default();
        serde_json::from_value(content).map_err(|err| command.invalid(err.to_string()))
    }
}

pub struct CreateDiagram;

impl ActionHandler for CreateDiagram {
    fn name(&self) -> &str {
        "create_diagram"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["content"]
    }

    fn validate(&self, command: &Command) -> std::result::Result<(), ValidationError> {
        command.require(self.required_fields())?;
        DiagramSpec::from_command(command)?;
        placement(command).map(|_| ())
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()> {
        let diagram = DiagramSpec::from_command(command)?;
        let placement = placement(command)?;
        let anchor = command.relative_to().and_then(|r| resolve(ctx, r));

        let board = ctx.board_mut();
        let engine = board.engine_mut();
        let (output, description) = match &diagram {
            DiagramSpec::Tree { root } => (engine.draw_tree(root, placement), root.label.clone()),
            DiagramSpec::Timeline { events } => {
                let output = engine.draw_timeline(events, placement);
                let description = output.element.text.clone().unwrap_or_default();
                (output, description)
            }
            DiagramSpec::Graph { title, equations } => {
                let output =
                    engine.draw_graph(title.as_deref(), equations, placement, anchor.as_deref())?;
                let description = output.element.text.clone().unwrap_or_default();
                (output, description)
            }
            DiagramSpec::Group { title } => (engine.create_group(title, placement), title.clone()),
        };
        let id = board.record(&output, Some(&description));

        ctx.emit_all(output.primitives);
        ctx.set_element(id);
        Ok(())
    }
}

pub struct Highlight;

impl ActionHandler for Highlight {
    fn name(&self) -> &str {
        "highlight"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["reference"]
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()> {
        let id = resolve_required(ctx, command.reference.as_deref())?;
        let board = ctx.board();
        let bbox = board
            .engine()
            .bounds_of(&id)
            .or_else(|| board.registry().find_element(&id).map(|e| e.bbox))
            .ok_or_else(|| BoardError::Unresolved(id.clone()))?
            .inflate(HIGHLIGHT_PADDING);
        let color = command
            .style()
            .color
            .unwrap_or_else(|| board.engine().theme().accent_color.to_string());

        ctx.emit(BoardCommand::Highlight {
            x: bbox.x,
            y: bbox.y,
            width: bbox.width,
            height: bbox.height,
            color,
            opacity: HIGHLIGHT_OPACITY,
        });
        ctx.set_element(id);
        Ok(())
    }
}

pub struct Erase;

impl ActionHandler for Erase {
    fn name(&self) -> &str {
        "erase"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["reference"]
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()> {
        let id = resolve_required(ctx, command.reference.as_deref())?;
        let removed = ctx.board_mut().remove_element(&id);
        let Some(primary) = removed.first().map(|element| element.bbox) else {
            return Err(BoardError::Unresolved(id));
        };

        ctx.emit(BoardCommand::erase(primary));
        for element in removed.iter().skip(1) {
            if !primary.contains_rect(&element.bbox) {
                ctx.emit(BoardCommand::erase(element.bbox));
            }
        }
        ctx.set_element(id);
        Ok(())
    }
}

pub struct Modify;

impl ActionHandler for Modify {
    fn name(&self) -> &str {
        "modify"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["reference"]
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()> {
        let id = resolve_required(ctx, command.reference.as_deref())?;
        let text = command
            .content_text()
            .ok_or_else(|| BoardError::Handler("modify needs text `content`".into()))?;

        let board = ctx.board_mut();
        let engine = board.engine_mut();
        let primitives = match engine.rewrite_text(&id, &text) {
            Some(primitives) => primitives,
            None if engine.bounds_of(&id).is_some() => {
                return Err(BoardError::Handler(format!(
                    "element `{id}` has no text of its own"
                )));
            }
            None => return Err(BoardError::Unresolved(id)),
        };
        let registry = board.registry_mut();
        registry.update_element(&id, |element| element.text = Some(text.clone()));
        registry.redescribe(&id, &text);

        ctx.emit_all(primitives);
        ctx.set_element(id);
        Ok(())
    }
}

pub struct ClearRegion;

impl ClearRegion {
    fn target(command: &Command) -> std::result::Result<Option<Zone>, ValidationError> {
        let region = command.region().unwrap_or_default().trim();
        if region.eq_ignore_ascii_case("all") {
            return Ok(None);
        }
        match region.parse::<Zone>() {
            Ok(Zone::Floating) => {
                Err(command.invalid("floating elements have no region to clear"))
            }
            Ok(zone) => Ok(Some(zone)),
            Err(reason) => Err(command.invalid(reason)),
        }
    }
}

impl ActionHandler for ClearRegion {
    fn name(&self) -> &str {
        "clear_region"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["position.region"]
    }

    fn validate(&self, command: &Command) -> std::result::Result<(), ValidationError> {
        command.require(self.required_fields())?;
        Self::target(command).map(|_| ())
    }

    fn handle(&mut self, ctx: &mut HandlerContext<'_>, command: &Command) -> Result<()> {
        let primitives = match Self::target(command)? {
            None => ctx.board_mut().reset(),
            Some(zone) => ctx.board_mut().clear_zone(zone),
        };
        ctx.emit_all(primitives);
        Ok(())
    }
}
