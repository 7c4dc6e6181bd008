//! Laid-out overview boards (value chain, SIPOC)

use std::collections::BTreeMap;

use serde::Serialize;

use crate::plugins::process::Point;

/// Which overview a board shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    ValueChain,
    Sipoc,
}

/// Fill and border colour pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardColor {
    pub fill: &'static str,
    pub border: &'static str,
}

impl BoardColor {
    pub const fn new(fill: &'static str, border: &'static str) -> Self {
        Self { fill, border }
    }
}

/// A positioned rectangle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardShape {
    pub id: String,
    pub content: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: BoardColor,
    pub font_size: u32,
    /// Macroprocess the shape stands for, when it links to a deeper board
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macroprocess_id: Option<String>,
}

impl BoardShape {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether two shapes overlap with positive area
    pub fn overlaps(&self, other: &BoardShape) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Straight arrow between two shapes on the same row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardConnector {
    pub source_id: String,
    pub target_id: String,
    pub color: &'static str,
    pub waypoints: Vec<Point>,
}

impl BoardConnector {
    /// Right-centre of `source` to left-centre of `target`
    pub fn between(source: &BoardShape, target: &BoardShape, color: &'static str) -> Self {
        Self {
            source_id: source.id.clone(),
            target_id: target.id.clone(),
            color,
            waypoints: vec![
                Point::new(source.right(), source.center().y),
                Point::new(target.x, target.center().y),
            ],
        }
    }
}

/// Everything the canvas needs to draw one overview board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardDiagram {
    pub kind: BoardKind,
    pub name: String,
    pub description: String,
    /// Shapes in drawing order; containers come before their content
    pub shapes: Vec<BoardShape>,
    pub connectors: Vec<BoardConnector>,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl BoardDiagram {
    pub fn shape(&self, id: &str) -> Option<&BoardShape> {
        self.shapes.iter().find(|s| s.id == id)
    }
}
