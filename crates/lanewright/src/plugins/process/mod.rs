//! Process diagram plugin
//!
//! Swimlane/BPMN layout of business processes: storage, validation, lane
//! assignment, layered layout and geometry.

mod database;
mod geometry;
pub mod layering;
mod layout;
pub mod ordering;
mod swimlane;
mod validator;

pub use database::*;
pub use geometry::*;
pub use layering::FlowGraph;
pub use layout::*;
pub use swimlane::*;
pub use validator::*;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::core::{Database, LayoutAlgorithm, LayoutConfig, LineStyle, Process};

    const ORDER_TO_CASH: &str = r#"{
        "name": "Order to cash",
        "description": "From customer order to payment",
        "actors": ["Sales", "Warehouse", "Finance"],
        "elements": [
            {"id": "start", "type": "start_event", "subtype": "message", "label": "Order received", "actor": "Sales"},
            {"id": "check", "type": "task", "subtype": "user", "label": "Check order", "actor": "Sales"},
            {"id": "ok", "type": "gateway", "label": "Complete?", "actor": "Sales"},
            {"id": "pick", "type": "task", "subtype": "manual", "label": "Pick items", "actor": "Warehouse"},
            {"id": "invoice", "type": "task", "subtype": "service", "label": "Send invoice", "actor": "Finance"},
            {"id": "end", "type": "end_event", "label": "Paid", "actor": "Finance"}
        ],
        "flows": [
            {"source": "start", "target": "check"},
            {"source": "check", "target": "ok"},
            {"source": "ok", "target": "pick", "condition": "yes"},
            {"source": "ok", "target": "check", "condition": "no"},
            {"source": "pick", "target": "invoice"},
            {"source": "invoice", "target": "end"}
        ]
    }"#;

    #[test]
    fn test_full_pipeline() {
        let process = Process::from_json(ORDER_TO_CASH).unwrap();
        let db = ProcessDatabase::from_process(&process);
        assert_eq!(db.element_count(), 6);

        let grid = ProcessLayoutAlgorithm::new().layout(&db).unwrap();
        assert_eq!(grid.cells.len(), 6);
        assert_eq!(grid.back_edges, vec![3]);
        assert!(grid.warnings.is_empty());

        let diagram = GeometryEmitter::new().emit(&db, &grid);
        assert_eq!(diagram.name, "Order to cash");
        assert_eq!(diagram.lanes.len(), 3);
        assert_eq!(diagram.elements.len(), 6);
        assert_eq!(diagram.connectors.len(), 6);

        let rework = &diagram.connectors[3];
        assert!(rework.reverse);
        assert_eq!(rework.style, LineStyle::Dashed);
        assert_eq!(rework.condition.as_deref(), Some("no"));
    }

    #[test]
    fn test_every_forward_connector_goes_right() {
        let process = Process::from_json(ORDER_TO_CASH).unwrap();
        let db = ProcessDatabase::from_process(&process);
        let grid = ProcessLayoutAlgorithm::with_config(LayoutConfig::default())
            .layout_grid(&db)
            .unwrap();
        let diagram = GeometryEmitter::new().emit(&db, &grid);
        for connector in diagram.connectors.iter().filter(|c| !c.reverse) {
            let first = connector.waypoints.first().unwrap();
            let last = connector.waypoints.last().unwrap();
            assert!(last.x > first.x, "{} -> {}", connector.source_id, connector.target_id);
        }
    }
}
