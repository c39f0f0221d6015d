//! Top-down tree diagrams.
//!
//! Subtree width is the sum of its children's widths, so siblings never
//! overlap and each parent sits centered over its own children.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId, Role, Zone};
use crate::geometry::{Point, Rect};
use crate::logging::{LogLevel, json_kv, json_str};
use crate::primitive::BoardCommand;
use crate::theme::Theme;

use super::core::{
    Appearance, BLOCK_SPACING, LayoutEngine, LayoutOutput, Placement, centered_text,
};
use super::typography::TextStyle;

const NODE_WIDTH: f64 = 140.0;
const NODE_HEIGHT: f64 = 50.0;
const SIBLING_GAP: f64 = 40.0;
const LEVEL_GAP: f64 = 90.0;
/// Vertical space reserved after a tree, whatever its depth.
pub const TREE_RESERVED_HEIGHT: f64 = 400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub label: String,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(label: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    pub fn subtree_width(&self) -> f64 {
        self.widths()[0]
    }

    /// Subtree width of every node in pre-order, computed in one pass.
    fn widths(&self) -> Vec<f64> {
        fn fill(node: &TreeNode, out: &mut Vec<f64>) -> f64 {
            let slot = out.len();
            out.push(0.0);
            let width = if node.children.is_empty() {
                NODE_WIDTH + SIBLING_GAP
            } else {
                node.children.iter().map(|child| fill(child, out)).sum()
            };
            out[slot] = width;
            width
        }
        let mut out = Vec::new();
        fill(self, &mut out);
        out
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeNode::depth).max().unwrap_or(0)
    }
}

struct TreeScratch {
    tree_id: ElementId,
    primitives: Vec<BoardCommand>,
    members: Vec<Element>,
    bottom: f64,
    /// Pre-order subtree widths and the index of the next node to place.
    widths: Vec<f64>,
    next: usize,
}

/// Outlined node box with its centered label.
pub(super) fn node_primitives(node_box: &Rect, label: &str, theme: &Theme) -> Vec<BoardCommand> {
    let style = TextStyle::for_role(Role::TreeNode, theme);
    let label_box = Rect::new(
        node_box.x,
        node_box.center().y - style.line_height() / 2.0,
        node_box.width,
        style.line_height(),
    );
    vec![
        BoardCommand::outline(*node_box, theme.secondary_color, 2.0),
        centered_text(label, &label_box, &style),
    ]
}

impl LayoutEngine {
    pub fn draw_tree(&mut self, root: &TreeNode, placement: Placement) -> LayoutOutput {
        let zone = self.zone_for(Role::TreeNode, placement);
        self.ensure_zone_mode(zone);
        let cursor = self.cursor(zone);

        let widths = root.widths();
        let total_width = widths[0];
        let left = cursor.x + ((cursor.width - total_width) / 2.0).max(0.0);
        let top = cursor.y;

        let tree_id = self.mint_id("el");
        let mut scratch = TreeScratch {
            tree_id: tree_id.clone(),
            primitives: Vec::new(),
            members: Vec::new(),
            bottom: top,
            widths,
            next: 0,
        };
        self.layout_subtree(root, left, top, zone, &mut scratch);

        let bbox = Rect::new(left, top, total_width, scratch.bottom - top);
        self.advance(zone, top + TREE_RESERVED_HEIGHT + BLOCK_SPACING);
        if root.depth() > 3 {
            // Deep trees run past the reserved band.
            self.log(
                LogLevel::Warn,
                "tree_exceeds_reserved_height",
                [
                    json_kv("depth", root.depth()),
                    json_kv("height", bbox.height),
                ],
            );
        }
        self.warn_on_overflow(zone, &bbox);

        let element = Element::new(tree_id, Role::Container, zone, bbox).with_text(&root.label);
        for member in &scratch.members {
            self.set_appearance(&member.id, Appearance::Node);
            self.insert_element(member.clone());
        }
        self.insert_element(element.clone());
        self.log(
            LogLevel::Debug,
            "tree_drawn",
            [
                json_str("id", element.id.as_str()),
                json_kv("nodes", scratch.members.len()),
            ],
        );

        LayoutOutput {
            element,
            primitives: scratch.primitives,
            members: scratch.members,
        }
    }

    /// Place `node` within the horizontal band starting at `left`; returns
    /// the node's top-center so the caller can draw the connecting edge.
    fn layout_subtree(
        &mut self,
        node: &TreeNode,
        left: f64,
        y: f64,
        zone: Zone,
        scratch: &mut TreeScratch,
    ) -> Point {
        let theme = self.theme();
        let width = scratch.widths[scratch.next];
        scratch.next += 1;
        let center_x = left + width / 2.0;
        let node_box = Rect::new(center_x - NODE_WIDTH / 2.0, y, NODE_WIDTH, NODE_HEIGHT);

        scratch
            .primitives
            .extend(node_primitives(&node_box, &node.label, theme));
        scratch.bottom = scratch.bottom.max(node_box.bottom());

        let member = Element::new(self.mint_id("el"), Role::TreeNode, zone, node_box)
            .with_text(&node.label)
            .referencing(Some(scratch.tree_id.clone()));
        scratch.members.push(member);

        let parent_bottom = Point::new(center_x, node_box.bottom());
        let child_y = y + NODE_HEIGHT + LEVEL_GAP;
        let mut child_left = left;
        for child in &node.children {
            let child_width = scratch.widths[scratch.next];
            let child_top = self.layout_subtree(child, child_left, child_y, zone, scratch);
            scratch.primitives.push(BoardCommand::line(
                parent_bottom,
                child_top,
                theme.primary_color,
                2.0,
            ));
            child_left += child_width;
        }

        Point::new(center_x, y)
    }
}
