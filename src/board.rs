//! Session-scoped board state.
//!
//! A `Board` owns the layout engine, the entity registry and the occupancy
//! grid for exactly one session. Nothing here is shared or locked; separate
//! sessions get separate boards.

use crate::config::BoardConfig;
use crate::element::{Element, ElementId, Role, Zone};
use crate::error::Result;
use crate::geometry::{Rect, Size};
use crate::layout::{GridConstraints, GridPlacer, LayoutEngine, LayoutOutput, ShapeKind};
use crate::logging::Logger;
use crate::primitive::BoardCommand;
use crate::registry::EntityRegistry;

pub struct Board {
    config: BoardConfig,
    engine: LayoutEngine,
    registry: EntityRegistry,
    placer: GridPlacer,
}

impl Board {
    pub fn new(config: BoardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: LayoutEngine::new(config.clone()),
            registry: EntityRegistry::new(),
            placer: GridPlacer::new(config.canvas(), config.grid_cell_size),
            config,
        })
    }

    /// Route engine and registry logs through `logger`.
    pub fn set_logger(&mut self, logger: Option<Logger>) {
        self.engine.set_logger(logger.clone());
        self.registry.set_logger(logger);
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LayoutEngine {
        &mut self.engine
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn placer(&self) -> &GridPlacer {
        &self.placer
    }

    /// Register an engine placement and reserve its space in the occupancy
    /// grid. Members are registered under their own text. Returns the id of
    /// the main element.
    pub fn record(&mut self, output: &LayoutOutput, description: Option<&str>) -> ElementId {
        for member in &output.members {
            self.placer.mark_occupied(&member.bbox);
            self.registry
                .register_element(member.clone(), member.text.as_deref(), None);
        }
        self.placer.mark_occupied(&output.element.bbox);
        let id = self
            .registry
            .register_element(output.element.clone(), description, None);

        if let Some(group_id) = output.element.group_id.as_deref() {
            self.sync_group(group_id);
        }
        id
    }

    /// Place a shape with the occupancy grid instead of the zone cursors.
    pub fn place_shape(
        &mut self,
        shape: ShapeKind,
        label: Option<&str>,
        constraints: &GridConstraints,
        description: Option<&str>,
    ) -> LayoutOutput {
        let zone = constraints.region.unwrap_or_default().zone();
        let mut template = Element::new(String::new(), Role::Container, zone, Rect::default());
        if let Some(text) = label {
            template = template.with_text(text);
        }
        let placed =
            self.placer
                .place_element(template, constraints, &mut self.registry, description);
        self.engine.adopt_shape(shape, placed)
    }

    /// Remove an element everywhere. Groups take their members with them and
    /// diagrams their nodes. Returns every removed element, requested one
    /// first.
    pub fn remove_element(&mut self, id: &str) -> Vec<Element> {
        let dependents: Vec<ElementId> = self
            .registry
            .elements()
            .filter(|element| {
                element.group_id.as_deref() == Some(id)
                    || (element.ref_id.as_deref() == Some(id)
                        && matches!(element.role, Role::TreeNode | Role::Label)
                        && element.zone != Zone::Floating)
            })
            .map(|element| element.id.clone())
            .collect();

        let mut removed = Vec::new();
        for target in std::iter::once(id.to_string()).chain(dependents) {
            self.engine.forget(&target);
            if let Some(element) = self.registry.remove_element(&target) {
                self.placer.clear_rect(&element.bbox);
                removed.push(element);
            }
        }
        removed
    }

    /// Erase one zone: every element whose center lies inside it is removed
    /// and the zone's cursor rewinds.
    pub fn clear_zone(&mut self, zone: Zone) -> Vec<BoardCommand> {
        let area = self.engine.zone_bounds(zone);
        let inside: Vec<ElementId> = self
            .registry
            .elements()
            .filter(|element| area.contains_point(element.bbox.center()))
            .map(|element| element.id.clone())
            .collect();
        for id in inside {
            // Cascades may already have taken this one.
            if self.registry.find_element(&id).is_some() {
                self.remove_element(&id);
            }
        }
        self.placer.clear_rect(&area);
        self.engine.rewind(zone);
        vec![BoardCommand::erase(area)]
    }

    /// Wipe the whole board.
    pub fn reset(&mut self) -> Vec<BoardCommand> {
        self.registry.clear();
        self.placer.clear();
        self.engine.reset()
    }

    pub fn resize(&mut self, size: Size) -> Vec<BoardCommand> {
        self.config = self.config.clone().with_size(size);
        self.registry.clear();
        self.placer = GridPlacer::new(size, self.config.grid_cell_size);
        self.engine.resize(size)
    }

    fn sync_group(&mut self, group_id: &str) {
        if let Some(bbox) = self.engine.group(group_id).map(|group| group.bbox) {
            self.registry.update_element(group_id, |element| element.bbox = bbox);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Anchor, Placement, Region, TextRequest, TreeNode};

    fn board() -> Board {
        Board::new(BoardConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BoardConfig {
            split_ratio: 1.5,
            ..BoardConfig::default()
        };
        assert!(Board::new(config).is_err());
    }

    #[test]
    fn record_registers_and_reserves_space() {
        let mut board = board();
        let out = board
            .engine_mut()
            .write_text(TextRequest::new("Cells", Role::Heading));
        let id = board.record(&out, Some("Cells"));

        assert_eq!(id, out.element.id);
        assert_eq!(board.registry().find_element(&id), Some(&out.element));
        assert!(board.placer().is_occupied(&out.element.bbox));
    }

    #[test]
    fn group_bbox_in_registry_follows_children() {
        let mut board = board();
        let group = board.engine_mut().create_group("Forces", Placement::Flow);
        board.record(&group, Some("Forces"));

        let child = board
            .engine_mut()
            .write_text(TextRequest::new("Gravity", Role::Bullet).in_group(group.id()));
        board.record(&child, Some("Gravity"));

        let stored = board.registry().find_element(group.id()).unwrap();
        assert!(stored.bbox.contains_rect(&child.element.bbox));
    }

    #[test]
    fn removing_a_group_cascades_to_members() {
        let mut board = board();
        let group = board.engine_mut().create_group("Forces", Placement::Flow);
        board.record(&group, Some("Forces"));
        let mut children = Vec::new();
        for text in ["Gravity", "Friction"] {
            let child = board
                .engine_mut()
                .write_text(TextRequest::new(text, Role::Bullet).in_group(group.id()));
            board.record(&child, Some(text));
            children.push(child.element.id);
        }
        let outsider = board
            .engine_mut()
            .write_text(TextRequest::new("Summary", Role::Body));
        board.record(&outsider, Some("Summary"));

        let removed = board.remove_element(group.id());

        assert_eq!(removed.len(), 3);
        assert_eq!(removed[0].id, group.id());
        for id in &children {
            assert!(board.registry().find_element(id).is_none());
            assert!(board.engine().element(id).is_none());
        }
        assert!(board.engine().group(group.id()).is_none());
        assert!(board.registry().find_element(outsider.id()).is_some());
    }

    #[test]
    fn removing_a_tree_removes_its_nodes() {
        let mut board = board();
        let root = TreeNode::with_children("Root", vec![TreeNode::leaf("Leaf")]);
        let tree = board.engine_mut().draw_tree(&root, Placement::Flow);
        board.record(&tree, Some("Root"));
        assert_eq!(board.registry().len(), 3);

        board.remove_element(tree.id());
        assert!(board.registry().is_empty());
    }

    #[test]
    fn grid_shapes_avoid_engine_content() {
        let mut board = board();
        let heading = board
            .engine_mut()
            .write_text(TextRequest::new("A heading that spans the column", Role::Heading));
        board.record(&heading, None);

        let constraints = GridConstraints::new(crate::layout::SHAPE_SIZE).in_region(Region::Main);
        let shape = board.place_shape(ShapeKind::Rectangle, Some("Box"), &constraints, Some("box"));

        assert!(!shape.element.bbox.intersects(&heading.element.bbox));
        assert!(shape.id().starts_with("entity-"));
        assert_eq!(board.engine().bounds_of(shape.id()), Some(shape.element.bbox));
        assert_eq!(
            board.registry().find_element_by_description("box").map(|e| e.id.as_str()),
            Some(shape.id())
        );

        let next = board.place_shape(
            ShapeKind::Circle,
            None,
            &GridConstraints::new(crate::layout::SHAPE_SIZE).with_anchor(Anchor::BelowPrevious),
            None,
        );
        assert_eq!(next.element.bbox.x, shape.element.bbox.x);
        assert!(next.element.bbox.y > shape.element.bbox.bottom());
    }

    #[test]
    fn clearing_a_zone_removes_what_sits_inside() {
        let mut board = board();
        let title = board
            .engine_mut()
            .write_text(TextRequest::new("Title", Role::Title));
        board.record(&title, Some("Title"));
        let body = board
            .engine_mut()
            .write_text(TextRequest::new("Body", Role::Body));
        board.record(&body, Some("Body"));
        let start = board.engine().zone_bounds(Zone::Main).y;

        let primitives = board.clear_zone(Zone::Main);

        assert_eq!(primitives, vec![BoardCommand::erase(board.engine().zone_bounds(Zone::Main))]);
        assert!(board.registry().find_element(body.id()).is_none());
        assert!(board.registry().find_element(title.id()).is_some());
        assert_eq!(board.engine().cursor(Zone::Main).y, start);
    }

    #[test]
    fn reset_empties_everything() {
        let mut board = board();
        let out = board
            .engine_mut()
            .write_text(TextRequest::new("Body", Role::Body));
        board.record(&out, Some("Body"));

        let primitives = board.reset();

        assert_eq!(primitives.len(), 1);
        assert_eq!(primitives[0].kind(), "clear");
        assert!(board.registry().is_empty());
        assert!(!board.placer().is_occupied(&out.element.bbox));
    }

    #[test]
    fn resize_rebuilds_geometry() {
        let mut board = board();
        board.resize(Size::new(1280.0, 720.0));
        assert_eq!(board.engine().canvas(), Size::new(1280.0, 720.0));
        assert_eq!(board.placer().canvas(), Size::new(1280.0, 720.0));
        assert_eq!(board.engine().cursor(Zone::Main).width, 1280.0 - 120.0);
    }
}
