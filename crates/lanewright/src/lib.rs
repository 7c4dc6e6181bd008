//! Lanewright - Swimlane layout for business process diagrams
//!
//! Takes a process document (elements, flows and the actors performing
//! them) and computes a left-to-right layered layout with one horizontal
//! lane per actor. The resulting diagram can be published to a whiteboard
//! service, with one task created per task element.
//!
//! Organization hierarchy documents (value chain, macroprocesses, SIPOC
//! tables) lay out as overview boards through the same publisher.
//!
//! # Quick Start
//!
//! ```rust
//! use lanewright::layout;
//!
//! let json = r#"{
//!     "name": "Expense claim",
//!     "elements": [
//!         {"id": "s", "type": "start_event", "label": "Submitted", "actor": "Employee"},
//!         {"id": "r", "type": "task", "subtype": "user", "label": "Review", "actor": "Manager"},
//!         {"id": "e", "type": "end_event", "label": "Paid", "actor": "Manager"}
//!     ],
//!     "flows": [
//!         {"source": "s", "target": "r"},
//!         {"source": "r", "target": "e"}
//!     ]
//! }"#;
//!
//! let diagram = layout(json).unwrap();
//! assert_eq!(diagram.lanes.len(), 2);
//! assert_eq!(diagram.elements.len(), 3);
//! ```
//!
//! # Advanced Usage
//!
//! For more control, run the stages yourself:
//!
//! ```rust
//! use lanewright::prelude::*;
//!
//! let mut db = ProcessDatabase::with_name("Intake");
//! db.add_start("s", "Desk").unwrap();
//! db.add_task("t", "Register", "Desk").unwrap();
//! db.add_end("e", "Desk").unwrap();
//! db.add_simple_flow("s", "t").unwrap();
//! db.add_simple_flow("t", "e").unwrap();
//!
//! let grid = ProcessLayoutAlgorithm::new().layout(&db).unwrap();
//! assert_eq!(grid.cell("t").unwrap().column, 1);
//!
//! let diagram = GeometryEmitter::new().emit(&db, &grid);
//! assert_eq!(diagram.connectors.len(), 2);
//! ```

pub mod core;
pub mod plugins;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Database, ElementKind, HierarchyConfig, LayoutAlgorithm, LayoutConfig, PipelineConfig,
        Process, ProcessElement, ProcessError, ProcessFlow,
    };
    pub use crate::plugins::hierarchy::{
        BoardDiagram, OrganizationHierarchy, SipocLayout, ValueChainLayout,
    };
    pub use crate::plugins::orchestrator::Pipeline;
    pub use crate::plugins::process::{
        Diagram, GeometryEmitter, GridLayout, ProcessDatabase, ProcessLayoutAlgorithm,
        ProcessValidator, SwimlaneAssigner,
    };
    pub use crate::plugins::remote::{CanvasClient, Publisher, TaskClient};
}

/// Parse a JSON process document
///
/// # Example
/// ```rust
/// use lanewright::parse;
///
/// let process = parse(r#"{"name": "Empty"}"#).unwrap();
/// assert_eq!(process.name, "Empty");
/// assert!(process.elements.is_empty());
/// ```
pub fn parse(input: &str) -> anyhow::Result<crate::core::Process> {
    Ok(crate::core::Process::from_json(input)?)
}

/// Parse and lay out a JSON process document with the default configuration
///
/// Typed layout failures can be recovered with
/// `err.downcast_ref::<ProcessError>()`.
pub fn layout(input: &str) -> anyhow::Result<plugins::process::Diagram> {
    let process = parse(input)?;
    layout_with_config(&process, &crate::core::PipelineConfig::default())
}

/// Lay out a parsed process with an explicit configuration
pub fn layout_with_config(
    process: &crate::core::Process,
    config: &crate::core::PipelineConfig,
) -> anyhow::Result<plugins::process::Diagram> {
    use crate::plugins::orchestrator::Pipeline;

    Ok(Pipeline::new(config.clone()).layout(process)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAIM: &str = r#"{
        "name": "Claim",
        "elements": [
            {"id": "s", "type": "start_event", "label": "Start", "actor": "Clerk"},
            {"id": "t", "type": "task", "label": "File", "actor": "Clerk"},
            {"id": "e", "type": "end_event", "label": "End", "actor": "Clerk"}
        ],
        "flows": [
            {"source": "s", "target": "t"},
            {"source": "t", "target": "e"}
        ]
    }"#;

    #[test]
    fn test_parse() {
        let process = parse(CLAIM).unwrap();
        assert_eq!(process.elements.len(), 3);
        assert_eq!(process.flows.len(), 2);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse("{ not json").is_err());
    }

    #[test]
    fn test_layout() {
        let diagram = layout(CLAIM).unwrap();
        assert_eq!(diagram.name, "Claim");
        assert_eq!(diagram.elements.len(), 3);
    }

    #[test]
    fn test_layout_error_downcasts() {
        let json = r#"{
            "name": "Lost",
            "elements": [{"id": "t", "type": "task", "label": "Alone", "actor": "A"}]
        }"#;
        let err = layout(json).unwrap_err();
        assert!(err.downcast_ref::<ProcessError>().is_some());
    }

    #[test]
    fn test_layout_with_config_default_actor() {
        let mut process = parse(CLAIM).unwrap();
        process.elements[1].actor = None;
        let mut config = PipelineConfig::default();
        config.layout.default_actor = Some("Clerk".to_string());
        let diagram = layout_with_config(&process, &config).unwrap();
        assert_eq!(diagram.lanes.len(), 1);
    }
}
