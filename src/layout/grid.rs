//! Occupancy-grid placement for generic region and anchor constraints.
//!
//! The canvas is divided into square cells. Placements mark the cells they
//! touch; later searches only accept blocks whose cells are all free. This is
//! the secondary strategy beside the zone/cursor engine and knows nothing
//! about zones or roles.
//!
//! ```
//! use chalkboard::geometry::Size;
//! use chalkboard::layout::grid::{Anchor, GridConstraints, GridPlacer};
//!
//! let mut placer = GridPlacer::new(Size::new(1920.0, 1080.0), 20.0);
//! let constraints = GridConstraints::new(Size::new(300.0, 200.0)).with_anchor(Anchor::TopLeft);
//! let origin = placer.find_optimal_position(&constraints);
//! assert_eq!((origin.x, origin.y), (20.0, 20.0));
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId, Zone};
use crate::geometry::{Point, Rect, Size};
use crate::registry::EntityRegistry;

pub const DEFAULT_CELL_SIZE: f64 = 20.0;
pub const DEFAULT_PADDING: f64 = 20.0;

/// Named canvas region used by grid placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Main,
    Sidebar,
    Header,
    Footer,
}

impl Region {
    /// Fixed fraction of the canvas: header is the top 15%, footer the
    /// bottom 10%, main and sidebar split the middle 75% at 70/30.
    pub fn bounds(self, canvas: Size) -> Rect {
        let (w, h) = (canvas.width, canvas.height);
        let middle_top = h * 0.15;
        let middle_height = h * 0.75;
        match self {
            Region::Header => Rect::new(0.0, 0.0, w, h * 0.15),
            Region::Main => Rect::new(0.0, middle_top, w * 0.7, middle_height),
            Region::Sidebar => Rect::new(w * 0.7, middle_top, w * 0.3, middle_height),
            Region::Footer => Rect::new(0.0, h * 0.9, w, h * 0.1),
        }
    }

    pub fn zone(self) -> Zone {
        match self {
            Region::Main => Zone::Main,
            Region::Sidebar => Zone::Sidebar,
            Region::Header => Zone::Header,
            Region::Footer => Zone::Footer,
        }
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(Region::Main),
            "sidebar" | "aside" => Ok(Region::Sidebar),
            "header" => Ok(Region::Header),
            "footer" => Ok(Region::Footer),
            other => Err(format!("unknown region `{other}`")),
        }
    }
}

/// Keyword position resolved against the canvas or the last placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    BelowPrevious,
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "center" | "centre" => Ok(Anchor::Center),
            "top_left" => Ok(Anchor::TopLeft),
            "top_right" => Ok(Anchor::TopRight),
            "bottom_left" => Ok(Anchor::BottomLeft),
            "bottom_right" => Ok(Anchor::BottomRight),
            "below_previous" | "below" => Ok(Anchor::BelowPrevious),
            other => Err(format!("unknown anchor `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConstraints {
    pub region: Option<Region>,
    pub anchor: Option<Anchor>,
    pub size: Size,
    pub padding: Option<f64>,
}

impl GridConstraints {
    pub fn new(size: Size) -> Self {
        Self {
            region: None,
            anchor: None,
            size,
            padding: None,
        }
    }

    pub fn in_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = Some(padding);
        self
    }

    fn padding(&self) -> f64 {
        self.padding.unwrap_or(DEFAULT_PADDING)
    }
}

/// Boolean occupancy matrix over the canvas.
#[derive(Debug, Clone)]
pub struct GridPlacer {
    canvas: Size,
    cell: f64,
    cols: usize,
    rows: usize,
    occupied: Vec<bool>,
    last_placed: Option<Rect>,
}

impl GridPlacer {
    pub fn new(canvas: Size, cell_size: f64) -> Self {
        let cell = if cell_size >= 1.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        let cols = (canvas.width / cell).ceil().max(0.0) as usize;
        let rows = (canvas.height / cell).ceil().max(0.0) as usize;
        Self {
            canvas,
            cell,
            cols,
            rows,
            occupied: vec![false; cols * rows],
            last_placed: None,
        }
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn cell_size(&self) -> f64 {
        self.cell
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn last_placed(&self) -> Option<Rect> {
        self.last_placed
    }

    /// Flag every cell `rect` touches. Parts outside the canvas are ignored.
    pub fn mark_occupied(&mut self, rect: &Rect) {
        self.set_cells(rect, true);
    }

    pub fn clear_rect(&mut self, rect: &Rect) {
        self.set_cells(rect, false);
    }

    pub fn clear(&mut self) {
        self.occupied.fill(false);
        self.last_placed = None;
    }

    /// `true` when any cell `rect` touches is flagged.
    pub fn is_occupied(&self, rect: &Rect) -> bool {
        let Some((cols, rows)) = self.cell_span(rect) else {
            return false;
        };
        rows.into_iter()
            .any(|row| cols.clone().any(|col| self.occupied[row * self.cols + col]))
    }

    /// First free block of `size`, scanning top-left cells row-major.
    pub fn find_available_space(&self, size: Size) -> Option<Point> {
        let whole = Rect::new(0.0, 0.0, self.canvas.width, self.canvas.height);
        self.find_available_space_in(&whole, size)
    }

    /// Like [`find_available_space`](Self::find_available_space) but the
    /// block must lie entirely inside `region`.
    pub fn find_available_space_in(&self, region: &Rect, size: Size) -> Option<Point> {
        if size.width > region.width || size.height > region.height {
            return None;
        }
        let first_col = (region.x / self.cell).ceil().max(0.0) as usize;
        let first_row = (region.y / self.cell).ceil().max(0.0) as usize;

        for row in first_row..self.rows {
            let y = row as f64 * self.cell;
            if y + size.height > region.bottom() {
                break;
            }
            for col in first_col..self.cols {
                let x = col as f64 * self.cell;
                if x + size.width > region.right() {
                    break;
                }
                let candidate = Rect::new(x, y, size.width, size.height);
                if !self.is_occupied(&candidate) {
                    return Some(Point::new(x, y));
                }
            }
        }
        None
    }

    /// Top-left corner satisfying `constraints`. Anchors win over regions;
    /// a full region falls back to its centroid.
    pub fn find_optimal_position(&self, constraints: &GridConstraints) -> Point {
        let size = constraints.size;
        let pad = constraints.padding();
        let (w, h) = (self.canvas.width, self.canvas.height);

        match constraints.anchor {
            Some(Anchor::Center) => {
                return Point::new((w - size.width) / 2.0, (h - size.height) / 2.0);
            }
            Some(Anchor::TopLeft) => return Point::new(pad, pad),
            Some(Anchor::TopRight) => return Point::new(w - size.width - pad, pad),
            Some(Anchor::BottomLeft) => return Point::new(pad, h - size.height - pad),
            Some(Anchor::BottomRight) => {
                return Point::new(w - size.width - pad, h - size.height - pad);
            }
            Some(Anchor::BelowPrevious) => {
                if let Some(previous) = self.last_placed {
                    return Point::new(previous.x, previous.bottom() + pad);
                }
            }
            None => {}
        }

        let region = constraints.region.unwrap_or_default().bounds(self.canvas);
        self.find_available_space_in(&region, size)
            .unwrap_or_else(|| {
                let center = region.center();
                Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0)
            })
    }

    /// Position `element` per `constraints`, reserve its cells, and register
    /// it. Returns the element as stored.
    pub fn place_element(
        &mut self,
        mut element: Element,
        constraints: &GridConstraints,
        registry: &mut EntityRegistry,
        description: Option<&str>,
    ) -> Element {
        let origin = self.find_optimal_position(constraints);
        element.bbox = Rect::at(origin, constraints.size);
        self.mark_occupied(&element.bbox);
        self.last_placed = Some(element.bbox);

        let id: ElementId = registry.register_element(element.clone(), description, None);
        element.id = id;
        element
    }

    fn set_cells(&mut self, rect: &Rect, value: bool) {
        let Some((cols, rows)) = self.cell_span(rect) else {
            return;
        };
        for row in rows {
            for col in cols.clone() {
                self.occupied[row * self.cols + col] = value;
            }
        }
    }

    /// Column and row ranges of cells intersecting `rect`, clamped to the grid.
    fn cell_span(
        &self,
        rect: &Rect,
    ) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        if rect.width <= 0.0 || rect.height <= 0.0 || self.cols == 0 || self.rows == 0 {
            return None;
        }
        let clamp = |value: f64, max: usize| value.max(0.0).min(max as f64) as usize;
        let col_start = clamp((rect.x / self.cell).floor(), self.cols);
        let col_end = clamp((rect.right() / self.cell).ceil(), self.cols);
        let row_start = clamp((rect.y / self.cell).floor(), self.rows);
        let row_end = clamp((rect.bottom() / self.cell).ceil(), self.rows);
        if col_start >= col_end || row_start >= row_end {
            return None;
        }
        Some((col_start..col_end, row_start..row_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Role;

    fn placer() -> GridPlacer {
        GridPlacer::new(Size::new(1920.0, 1080.0), 20.0)
    }

    #[test]
    fn grid_dimensions_round_up() {
        let placer = GridPlacer::new(Size::new(1000.0, 510.0), 20.0);
        assert_eq!(placer.dimensions(), (50, 26));
    }

    #[test]
    fn marking_flags_every_touched_cell() {
        let mut placer = placer();
        placer.mark_occupied(&Rect::new(25.0, 25.0, 10.0, 10.0));

        assert!(placer.is_occupied(&Rect::new(20.0, 20.0, 20.0, 20.0)));
        assert!(placer.is_occupied(&Rect::new(0.0, 0.0, 30.0, 30.0)));
        assert!(!placer.is_occupied(&Rect::new(40.0, 0.0, 20.0, 20.0)));

        placer.clear_rect(&Rect::new(20.0, 20.0, 20.0, 20.0));
        assert!(!placer.is_occupied(&Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn search_skips_occupied_blocks_row_major() {
        let mut placer = placer();
        let size = Size::new(100.0, 100.0);
        assert_eq!(placer.find_available_space(size), Some(Point::new(0.0, 0.0)));

        placer.mark_occupied(&Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(placer.find_available_space(size), Some(Point::new(100.0, 0.0)));

        placer.mark_occupied(&Rect::new(0.0, 0.0, 1920.0, 1080.0));
        assert_eq!(placer.find_available_space(size), None);
    }

    #[test]
    fn keyword_anchors_are_inset_by_padding() {
        let placer = placer();
        let size = Size::new(300.0, 200.0);
        let at = |anchor| placer.find_optimal_position(&GridConstraints::new(size).with_anchor(anchor));

        assert_eq!(at(Anchor::Center), Point::new(810.0, 440.0));
        assert_eq!(at(Anchor::TopRight), Point::new(1600.0, 20.0));
        assert_eq!(at(Anchor::BottomLeft), Point::new(20.0, 860.0));
        assert_eq!(
            placer.find_optimal_position(
                &GridConstraints::new(size)
                    .with_anchor(Anchor::BottomRight)
                    .with_padding(0.0)
            ),
            Point::new(1620.0, 880.0)
        );
    }

    #[test]
    fn regions_map_to_canvas_fractions() {
        let canvas = Size::new(1920.0, 1080.0);
        assert_eq!(Region::Header.bounds(canvas), Rect::new(0.0, 0.0, 1920.0, 162.0));
        assert_eq!(Region::Main.bounds(canvas), Rect::new(0.0, 162.0, 1344.0, 810.0));
        assert_eq!(Region::Sidebar.bounds(canvas), Rect::new(1344.0, 162.0, 576.0, 810.0));
        assert_eq!(Region::Footer.bounds(canvas), Rect::new(0.0, 972.0, 1920.0, 108.0));
    }

    #[test]
    fn full_region_falls_back_to_centroid() {
        let mut placer = placer();
        let sidebar = Region::Sidebar.bounds(placer.canvas());
        placer.mark_occupied(&sidebar);

        let size = Size::new(200.0, 100.0);
        let origin =
            placer.find_optimal_position(&GridConstraints::new(size).in_region(Region::Sidebar));
        let center = sidebar.center();
        assert_eq!(origin, Point::new(center.x - 100.0, center.y - 50.0));
    }

    #[test]
    fn place_element_reserves_space_and_registers() {
        let mut placer = placer();
        let mut registry = EntityRegistry::new();
        let constraints = GridConstraints::new(Size::new(300.0, 200.0)).in_region(Region::Main);
        let template = Element::new("", Role::Container, Zone::Main, Rect::default());

        let first = placer.place_element(template.clone(), &constraints, &mut registry, Some("box one"));
        let second = placer.place_element(template, &constraints, &mut registry, Some("box two"));

        assert!(!first.bbox.intersects(&second.bbox));
        assert_eq!(registry.find_element(&first.id), Some(&first));
        assert_eq!(
            registry.find_element_by_description("box two").map(|e| e.id.as_str()),
            Some(second.id.as_str())
        );

        let below = placer.find_optimal_position(
            &GridConstraints::new(Size::new(100.0, 50.0)).with_anchor(Anchor::BelowPrevious),
        );
        assert_eq!(below, Point::new(second.bbox.x, second.bbox.bottom() + DEFAULT_PADDING));
    }

    #[test]
    fn below_previous_without_history_searches_region() {
        let placer = placer();
        let origin = placer.find_optimal_position(
            &GridConstraints::new(Size::new(100.0, 50.0)).with_anchor(Anchor::BelowPrevious),
        );
        // main region starts at y = 162, first aligned row is 180
        assert_eq!(origin, Point::new(0.0, 180.0));
    }

    #[test]
    fn keywords_parse_loosely() {
        assert_eq!("top-left".parse::<Anchor>(), Ok(Anchor::TopLeft));
        assert_eq!("Below_Previous".parse::<Anchor>(), Ok(Anchor::BelowPrevious));
        assert_eq!("aside".parse::<Region>(), Ok(Region::Sidebar));
        assert!("nowhere".parse::<Region>().is_err());
    }
}
