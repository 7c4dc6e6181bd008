//! Grid to pixel conversion and connector routing
//!
//! Turns a [`GridLayout`] into absolute canvas geometry: lane bands,
//! element boxes and orthogonal connector polylines.

use serde::Serialize;
use tracing::{debug, span, trace, Level};

use super::database::ProcessDatabase;
use super::layout::GridLayout;
use crate::core::{Database, ElementKind, LayoutConfig, LineStyle, ProcessElement, TaskKind};

pub const TASK_SIZE: (f64, f64) = (160.0, 80.0);
pub const GATEWAY_SIZE: (f64, f64) = (60.0, 60.0);
pub const EVENT_SIZE: (f64, f64) = (50.0, 50.0);
pub const ANNOTATION_SIZE: (f64, f64) = (200.0, 100.0);

/// Shape size for an element kind
pub fn element_size(kind: &ElementKind) -> (f64, f64) {
    match kind {
        ElementKind::Task { .. } => TASK_SIZE,
        ElementKind::Gateway { .. } => GATEWAY_SIZE,
        ElementKind::Annotation => ANNOTATION_SIZE,
        _ => EVENT_SIZE,
    }
}

/// Icon path relative to the icon library root
pub fn builtin_icon_path(kind: &ElementKind) -> Option<&'static str> {
    match kind {
        ElementKind::Task { subtype } => Some(match subtype {
            TaskKind::Generic => "tasks/task.svg",
            TaskKind::User => "tasks/user.svg",
            TaskKind::Manual => "tasks/manual.svg",
            TaskKind::Service => "tasks/service.svg",
        }),
        _ => None,
    }
}

/// Join the icon library base URL and a relative path with exactly one `/`
pub fn icon_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Background band of one swimlane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneBand {
    pub index: usize,
    pub actor: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A positioned element. `x`/`y` is the top-left corner of the shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualElement {
    pub element_id: String,
    pub kind: ElementKind,
    pub label: String,
    pub lane: usize,
    pub column: usize,
    pub row: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Label drawn under the shape instead of inside it
    pub label_below: bool,
}

impl VisualElement {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    fn right_center(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height / 2.0)
    }

    fn left_center(&self) -> Point {
        Point::new(self.x, self.y + self.height / 2.0)
    }
}

/// A routed sequence flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualConnector {
    /// Index of the flow in the process document
    pub flow_index: usize,
    pub source_id: String,
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Drawn against the flow direction (broken cycle)
    pub reverse: bool,
    pub style: LineStyle,
    pub waypoints: Vec<Point>,
}

/// Everything the canvas needs to draw one process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagram {
    pub name: String,
    pub description: String,
    pub lanes: Vec<LaneBand>,
    pub elements: Vec<VisualElement>,
    pub connectors: Vec<VisualConnector>,
    pub width: f64,
    pub height: f64,
}

impl Diagram {
    pub fn element(&self, element_id: &str) -> Option<&VisualElement> {
        self.elements.iter().find(|e| e.element_id == element_id)
    }
}

/// Converts grid positions into pixels
#[derive(Debug, Clone, Default)]
pub struct GeometryEmitter {
    config: LayoutConfig,
}

impl GeometryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Slot height of an element: shape plus the label strip for events
    fn slot_height(&self, kind: &ElementKind) -> f64 {
        let (_, height) = element_size(kind);
        if kind.is_event() {
            height + self.config.label_below_height
        } else {
            height
        }
    }

    fn resolve_icon(&self, element: &ProcessElement) -> Option<String> {
        let base = self.config.icon_base_url.as_deref().filter(|b| !b.is_empty())?;
        let path = element
            .hint("icon")
            .or_else(|| builtin_icon_path(&element.kind))?;
        Some(icon_url(base, path))
    }

    /// Emit the diagram for a database and its grid
    pub fn emit(&self, db: &ProcessDatabase, grid: &GridLayout) -> Diagram {
        let span = span!(
            Level::DEBUG,
            "emit_geometry",
            lane_count = grid.lanes.len(),
            column_count = grid.column_count
        );
        let _enter = span.enter();
        let cfg = &self.config;

        let kind_of = |id: &str| db.get_element(id).map(|e| e.kind).unwrap_or_default();

        // Column bands
        let mut column_widths = vec![0.0f64; grid.column_count];
        for cell in &grid.cells {
            let (width, _) = element_size(&kind_of(&cell.element_id));
            column_widths[cell.column] = column_widths[cell.column].max(width);
        }
        let first_x = cfg
            .content_offset_x
            .max(cfg.margin_left + cfg.lane_label_width + cfg.lane_padding);
        let mut column_x = Vec::with_capacity(grid.column_count);
        let mut x = first_x;
        for width in &column_widths {
            column_x.push(x);
            x += width + cfg.column_spacing;
        }

        // Stacked height of every lane/column cell
        let stack_height = |lane: usize, column: usize| -> f64 {
            let cells = grid.cells_in(lane, column);
            if cells.is_empty() {
                return 0.0;
            }
            let slots: f64 = cells.iter().map(|c| self.slot_height(&kind_of(&c.element_id))).sum();
            slots + cfg.row_spacing * (cells.len() - 1) as f64
        };

        let mut lane_heights = Vec::with_capacity(grid.lanes.len());
        for lane in &grid.lanes {
            let tallest = (0..grid.column_count)
                .map(|column| stack_height(lane.index, column))
                .fold(0.0f64, f64::max);
            lane_heights.push(cfg.lane_height.max(tallest + 2.0 * cfg.lane_padding));
        }
        let mut lane_y = Vec::with_capacity(grid.lanes.len());
        let mut y = cfg.margin_top;
        for height in &lane_heights {
            lane_y.push(y);
            y += height;
        }
        let lanes_bottom = y;

        // Elements in insertion order
        let mut elements = Vec::with_capacity(grid.cells.len());
        for element in db.elements() {
            let Some(cell) = grid.cell(&element.id) else {
                continue;
            };
            let (width, height) = element_size(&element.kind);
            let band_top = lane_y[cell.lane]
                + (lane_heights[cell.lane] - stack_height(cell.lane, cell.column)) / 2.0;
            let offset: f64 = grid
                .cells_in(cell.lane, cell.column)
                .iter()
                .take_while(|c| c.row < cell.row)
                .map(|c| self.slot_height(&kind_of(&c.element_id)) + cfg.row_spacing)
                .sum();
            let visual = VisualElement {
                element_id: element.id.clone(),
                kind: element.kind,
                label: element.label.clone(),
                lane: cell.lane,
                column: cell.column,
                row: cell.row,
                x: column_x[cell.column] + (column_widths[cell.column] - width) / 2.0,
                y: band_top + offset,
                width,
                height,
                icon_url: self.resolve_icon(element),
                label_below: element.kind.is_event(),
            };
            trace!(
                element_id = %visual.element_id,
                x = visual.x,
                y = visual.y,
                "Element placed"
            );
            elements.push(visual);
        }

        // x of the free gap left of `column`; `column_count` is the gap after the last
        let gap_before = |column: usize| -> f64 {
            if column == 0 {
                column_x[0] - cfg.lane_padding / 2.0
            } else if column >= grid.column_count {
                let last = grid.column_count - 1;
                column_x[last] + column_widths[last] + cfg.column_spacing / 2.0
            } else {
                (column_x[column - 1] + column_widths[column - 1] + column_x[column]) / 2.0
            }
        };
        let top_channel = |lane: usize| lane_y[lane] + cfg.lane_padding / 2.0;
        let bottom_channel =
            |lane: usize| lane_y[lane] + lane_heights[lane] - cfg.lane_padding / 2.0;

        let find = |id: &str| elements.iter().find(|e| e.element_id == id);
        let mut connectors = Vec::with_capacity(db.flow_count());
        for (flow_index, flow) in db.flows().enumerate() {
            let (Some(source), Some(target)) = (find(&flow.source), find(&flow.target)) else {
                continue;
            };
            let reverse = grid.is_back_edge(flow_index);
            let lower = source.lane.max(target.lane);
            let route = if reverse {
                Route::Channel {
                    exit_x: gap_before(source.column + 1),
                    entry_x: gap_before(target.column),
                    channel_y: bottom_channel(lower),
                }
            } else if target.column == source.column + 1 {
                Route::Gap {
                    x: gap_before(target.column),
                }
            } else {
                Route::Channel {
                    exit_x: gap_before(source.column + 1),
                    entry_x: gap_before(target.column),
                    channel_y: top_channel(lower),
                }
            };
            connectors.push(VisualConnector {
                flow_index,
                source_id: flow.source.clone(),
                target_id: flow.target.clone(),
                condition: flow.condition.clone(),
                reverse,
                style: if reverse { LineStyle::Dashed } else { LineStyle::Solid },
                waypoints: route.waypoints(source, target),
            });
        }

        let content_right = elements
            .iter()
            .map(|e| e.x + e.width)
            .fold(first_x, f64::max);
        let width = cfg.min_canvas_width.max(content_right + cfg.canvas_margin);
        let height = cfg.min_canvas_height.max(lanes_bottom + cfg.canvas_margin);

        let lanes = grid
            .lanes
            .iter()
            .map(|lane| LaneBand {
                index: lane.index,
                actor: lane.actor.clone(),
                x: cfg.margin_left,
                y: lane_y[lane.index],
                width: width - 2.0 * cfg.margin_left,
                height: lane_heights[lane.index],
            })
            .collect();

        debug!(
            element_count = elements.len(),
            connector_count = connectors.len(),
            width,
            height,
            "Geometry emitted"
        );

        Diagram {
            name: db.name().to_string(),
            description: db.description().to_string(),
            lanes,
            elements,
            connectors,
            width,
            height,
        }
    }
}

/// Orthogonal connector path between two placed elements.
///
/// Every connector leaves the right-centre of its source and enters the
/// left-centre of its target. Vertical runs only happen inside the free gaps
/// between columns and horizontal runs across columns only inside a lane's
/// padding band, so no segment crosses an unrelated shape.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Route {
    /// Adjacent columns: one vertical run in the gap between them
    Gap { x: f64 },
    /// Skipped columns or back-edges: out to a gap, along a padding band,
    /// back up or down in the gap before the target
    Channel {
        exit_x: f64,
        entry_x: f64,
        channel_y: f64,
    },
}

impl Route {
    fn waypoints(self, source: &VisualElement, target: &VisualElement) -> Vec<Point> {
        let start = source.right_center();
        let end = target.left_center();
        match self {
            Route::Gap { .. } if start.y == end.y => vec![start, end],
            Route::Gap { x } => vec![start, Point::new(x, start.y), Point::new(x, end.y), end],
            Route::Channel {
                exit_x,
                entry_x,
                channel_y,
            } => vec![
                start,
                Point::new(exit_x, start.y),
                Point::new(exit_x, channel_y),
                Point::new(entry_x, channel_y),
                Point::new(entry_x, end.y),
                end,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::process::ProcessLayoutAlgorithm;

    fn emit(db: &ProcessDatabase, config: LayoutConfig) -> Diagram {
        let grid = ProcessLayoutAlgorithm::with_config(config.clone())
            .layout_grid(db)
            .unwrap();
        GeometryEmitter::with_config(config).emit(db, &grid)
    }

    fn two_lanes() -> ProcessDatabase {
        let mut db = ProcessDatabase::with_name("Two lanes");
        db.add_start("s", "A").unwrap();
        db.add_task("t1", "Draft", "A").unwrap();
        db.add_task("t2", "Approve", "B").unwrap();
        db.add_end("e", "B").unwrap();
        db.add_simple_flow("s", "t1").unwrap();
        db.add_simple_flow("t1", "t2").unwrap();
        db.add_simple_flow("t2", "e").unwrap();
        db
    }

    #[test]
    fn test_sizes_by_kind() {
        let diagram = emit(&two_lanes(), LayoutConfig::default());
        let s = diagram.element("s").unwrap();
        let t1 = diagram.element("t1").unwrap();
        assert_eq!((s.width, s.height), (50.0, 50.0));
        assert_eq!((t1.width, t1.height), (160.0, 80.0));
        assert!(s.label_below);
        assert!(!t1.label_below);
    }

    #[test]
    fn test_columns_and_centering() {
        let diagram = emit(&two_lanes(), LayoutConfig::default());
        let s = diagram.element("s").unwrap();
        let t1 = diagram.element("t1").unwrap();
        let t2 = diagram.element("t2").unwrap();
        // column 0 is 50 wide at x = 250
        assert_eq!(s.x, 250.0);
        // column 1 starts after 50 + 150
        assert_eq!(t1.x, 450.0);
        // column 2 starts after 160 + 150
        assert_eq!(t2.x, 760.0);
    }

    #[test]
    fn test_lane_bands_are_contiguous() {
        let diagram = emit(&two_lanes(), LayoutConfig::default());
        assert_eq!(diagram.lanes.len(), 2);
        assert_eq!(diagram.lanes[0].y, 100.0);
        assert_eq!(diagram.lanes[0].height, 200.0);
        assert_eq!(diagram.lanes[1].y, 300.0);
        assert_eq!(diagram.lanes[0].x, 50.0);
        assert_eq!(diagram.lanes[0].width, diagram.width - 100.0);
    }

    #[test]
    fn test_elements_vertically_centred() {
        let diagram = emit(&two_lanes(), LayoutConfig::default());
        let t1 = diagram.element("t1").unwrap();
        // task: (200 - 80) / 2 below the lane top
        assert_eq!(t1.y, 160.0);
        let s = diagram.element("s").unwrap();
        // event slot is 50 + 40
        assert_eq!(s.y, 100.0 + (200.0 - 90.0) / 2.0);
    }

    #[test]
    fn test_forward_connector_routes() {
        let diagram = emit(&two_lanes(), LayoutConfig::default());
        let t1_t2 = &diagram.connectors[1];
        assert!(!t1_t2.reverse);
        assert_eq!(t1_t2.style, LineStyle::Solid);
        assert_eq!(t1_t2.waypoints.len(), 4);
        let t1 = diagram.element("t1").unwrap();
        let t2 = diagram.element("t2").unwrap();
        assert_eq!(t1_t2.waypoints[0], Point::new(t1.x + t1.width, t1.y + 40.0));
        assert_eq!(t1_t2.waypoints[1].x, 610.0 + 75.0);
        assert_eq!(t1_t2.waypoints[3], Point::new(t2.x, t2.y + 40.0));
    }

    #[test]
    fn test_same_height_connector_is_straight() {
        let mut db = ProcessDatabase::new();
        db.add_start("s", "A").unwrap();
        db.add_task("a", "A", "A").unwrap();
        db.add_task("b", "B", "A").unwrap();
        db.add_end("e", "A").unwrap();
        db.add_simple_flow("s", "a").unwrap();
        db.add_simple_flow("a", "b").unwrap();
        db.add_simple_flow("b", "e").unwrap();
        let diagram = emit(&db, LayoutConfig::default());
        assert_eq!(diagram.connectors[1].waypoints.len(), 2);
    }

    #[test]
    fn test_reverse_connector_is_dashed_through_channel() {
        let mut db = two_lanes();
        db.add_simple_flow("t2", "t1").unwrap();
        let diagram = emit(&db, LayoutConfig::default());
        let back = diagram.connectors.iter().find(|c| c.reverse).unwrap();
        assert_eq!(back.source_id, "t2");
        assert_eq!(back.style, LineStyle::Dashed);
        assert_eq!(back.waypoints.len(), 6);
        let t1 = diagram.element("t1").unwrap();
        let t2 = diagram.element("t2").unwrap();
        assert_eq!(back.waypoints[0], Point::new(t2.x + t2.width, t2.y + 40.0));
        // gap after column 2: (920 + 1070) / 2
        assert_eq!(back.waypoints[1].x, 995.0);
        // lower lane is B: 300 + 200 - 10
        assert_eq!(back.waypoints[2].y, 490.0);
        assert_eq!(back.waypoints[3].y, 490.0);
        // gap before column 1: (300 + 450) / 2
        assert_eq!(back.waypoints[3].x, 375.0);
        assert_eq!(back.waypoints[5], Point::new(t1.x, t1.y + 40.0));
    }

    #[test]
    fn test_skipping_connector_uses_top_channel() {
        // g -> a -> b -> j and g -> j, all in one lane
        let mut db = ProcessDatabase::new();
        db.add_start("s", "X").unwrap();
        db.add_gateway("g", "Skip?", "X").unwrap();
        db.add_task("a", "First", "X").unwrap();
        db.add_task("b", "Second", "X").unwrap();
        db.add_task("j", "Merge", "X").unwrap();
        db.add_end("e", "X").unwrap();
        db.add_simple_flow("s", "g").unwrap();
        db.add_conditional_flow("g", "a", "no").unwrap();
        db.add_simple_flow("a", "b").unwrap();
        db.add_simple_flow("b", "j").unwrap();
        db.add_conditional_flow("g", "j", "yes").unwrap();
        db.add_simple_flow("j", "e").unwrap();

        let diagram = emit(&db, LayoutConfig::default());
        let skip = diagram.connectors.iter().find(|c| c.flow_index == 4).unwrap();
        assert!(!skip.reverse);
        assert_eq!(skip.waypoints.len(), 6);
        // lane X top padding band: 100 + 20 / 2
        assert_eq!(skip.waypoints[2].y, 110.0);
        assert_eq!(skip.waypoints[3].y, 110.0);
        for id in ["a", "b"] {
            let element = diagram.element(id).unwrap();
            assert!(skip.waypoints[2].y < element.y);
        }
    }

    #[test]
    fn test_self_loop_wraps_its_own_column() {
        let mut db = ProcessDatabase::new();
        db.add_start("s", "A").unwrap();
        db.add_task("t", "Poll", "A").unwrap();
        db.add_end("e", "A").unwrap();
        db.add_simple_flow("s", "t").unwrap();
        db.add_simple_flow("t", "t").unwrap();
        db.add_simple_flow("t", "e").unwrap();

        let diagram = emit(&db, LayoutConfig::default());
        let t = diagram.element("t").unwrap();
        let lane = &diagram.lanes[0];
        let loop_back = &diagram.connectors[1];
        assert!(loop_back.reverse);
        assert!(loop_back.waypoints[1].x > t.x + t.width);
        assert_eq!(loop_back.waypoints[2].y, lane.y + lane.height - 10.0);
        assert!(loop_back.waypoints[4].x < t.x);
        assert_eq!(loop_back.waypoints[5], Point::new(t.x, t.y + 40.0));
    }

    #[test]
    fn test_stacked_cell_grows_lane() {
        // four parallel tasks in one cell: 4*80 + 3*30 + 40 = 450 > 200
        let mut db = ProcessDatabase::new();
        db.add_start("s", "A").unwrap();
        db.add_kind(
            "g",
            ElementKind::gateway(crate::core::GatewayKind::Parallel),
            "Fork",
            "A",
        )
        .unwrap();
        db.add_end("e", "A").unwrap();
        db.add_simple_flow("s", "g").unwrap();
        for id in ["a", "b", "c", "d"] {
            db.add_task(id, id, "A").unwrap();
            db.add_simple_flow("g", id).unwrap();
            db.add_simple_flow(id, "e").unwrap();
        }
        let diagram = emit(&db, LayoutConfig::default());
        assert_eq!(diagram.lanes[0].height, 450.0);
        let a = diagram.element("a").unwrap();
        let b = diagram.element("b").unwrap();
        assert_eq!(b.y - a.y, 110.0);
        assert_eq!(a.y, 120.0);
    }

    #[test]
    fn test_canvas_minimum_and_growth() {
        let diagram = emit(&two_lanes(), LayoutConfig::default());
        assert_eq!(diagram.width, 4000.0);
        assert_eq!(diagram.height, 3000.0);

        let small = LayoutConfig {
            min_canvas_width: 0.0,
            min_canvas_height: 0.0,
            ..LayoutConfig::default()
        };
        let diagram = emit(&two_lanes(), small);
        let e = diagram.element("e").unwrap();
        assert_eq!(diagram.width, e.x + e.width + 100.0);
        assert_eq!(diagram.height, 500.0 + 100.0);
    }

    #[test]
    fn test_icons() {
        let mut db = two_lanes();
        db.add_element(
            ProcessElement::new("u", ElementKind::task(TaskKind::User), "Check").with_actor("B"),
        )
        .unwrap();
        db.add_simple_flow("t2", "u").unwrap();
        db.add_simple_flow("u", "e").unwrap();

        let without = emit(&db, LayoutConfig::default());
        assert!(without.elements.iter().all(|e| e.icon_url.is_none()));

        let config = LayoutConfig {
            icon_base_url: Some("https://cdn.example.com/icons/".to_string()),
            ..LayoutConfig::default()
        };
        let with = emit(&db, config);
        assert_eq!(
            with.element("u").unwrap().icon_url.as_deref(),
            Some("https://cdn.example.com/icons/tasks/user.svg")
        );
        assert!(with.element("s").unwrap().icon_url.is_none());
    }

    #[test]
    fn test_icon_hint_overrides_builtin() {
        let element = ProcessElement::task("t", "Pay", "A").with_hint("icon", "/custom/pay.png");
        let emitter = GeometryEmitter::with_config(LayoutConfig {
            icon_base_url: Some("https://x.test".to_string()),
            ..LayoutConfig::default()
        });
        assert_eq!(
            emitter.resolve_icon(&element).as_deref(),
            Some("https://x.test/custom/pay.png")
        );
    }

    #[test]
    fn test_deterministic() {
        let first = emit(&two_lanes(), LayoutConfig::default());
        let second = emit(&two_lanes(), LayoutConfig::default());
        assert_eq!(first, second);
    }
}
