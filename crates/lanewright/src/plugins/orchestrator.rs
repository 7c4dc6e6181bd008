//! Pipeline orchestrator for process documents
//!
//! The pipeline runs every stage in order:
//! Process → Database → Validation → Swimlanes → Layout → Geometry → Publish
//!
//! Hierarchy documents take a shorter path to an overview board:
//! Hierarchy → Value chain or SIPOC layout → Publish
//!
//! Configuration is owned by the pipeline instance; nothing is read from
//! global state once it is constructed.

use tracing::{debug, info, span, warn, Level};

use crate::core::{PipelineConfig, Process, ProcessError};
use crate::plugins::hierarchy::{BoardDiagram, OrganizationHierarchy, SipocLayout, ValueChainLayout};
use crate::plugins::process::{
    Diagram, GeometryEmitter, GridLayout, ProcessDatabase, ProcessLayoutAlgorithm,
    ProcessValidator, Swimlane, SwimlaneAssigner, ValidationReport,
};
use crate::plugins::remote::{CanvasClient, Publisher, SyncReport, TaskClient};

/// Runs process documents through layout and publishing
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build a publisher for the given clients using this pipeline's
    /// retry policy, board prefix and task list
    pub fn publisher<C: CanvasClient, T: TaskClient>(&self, canvas: C, tasks: T) -> Publisher<C, T> {
        Publisher::new(canvas, tasks)
            .with_policy(self.config.retry.clone())
            .with_board_prefix(self.config.canvas.board_prefix.clone())
            .with_task_list(self.config.tasks.list_id.clone())
    }

    /// Collect every validation finding without failing
    pub fn validate(&self, process: &Process) -> ValidationReport {
        let db = ProcessDatabase::from_process(process);
        ProcessValidator::new().inspect(&db)
    }

    /// Validate and group elements into lanes
    pub fn lanes(&self, process: &Process) -> Result<Vec<Swimlane>, ProcessError> {
        let db = ProcessDatabase::from_process(process);
        ProcessValidator::new().validate(&db)?;
        let assignment = SwimlaneAssigner::new()
            .with_default_actor(self.config.layout.default_actor.clone())
            .with_empty_lanes(self.config.layout.include_empty_lanes)
            .assign(&db)?;
        Ok(assignment.lanes)
    }

    /// Grid positions without geometry
    pub fn layout_grid(&self, process: &Process) -> Result<GridLayout, ProcessError> {
        let db = ProcessDatabase::from_process(process);
        self.algorithm().layout_grid(&db)
    }

    /// Full layout: validation, lanes, layering, ordering and geometry
    pub fn layout(&self, process: &Process) -> Result<Diagram, ProcessError> {
        let span = span!(Level::INFO, "pipeline_layout", process = %process.name);
        let _enter = span.enter();

        let db = ProcessDatabase::from_process(process);
        debug!(
            elements = process.elements.len(),
            flows = process.flows.len(),
            "Database loaded"
        );

        let grid = self.algorithm().layout_grid(&db)?;

        let emit_span = span!(Level::DEBUG, "pipeline_geometry");
        let _emit_enter = emit_span.enter();
        let diagram = GeometryEmitter::with_config(self.config.layout.clone()).emit(&db, &grid);
        drop(_emit_enter);

        info!(
            width = diagram.width,
            height = diagram.height,
            "Pipeline layout completed"
        );
        Ok(diagram)
    }

    /// Lay out and publish one document
    pub fn run<C, T>(
        &self,
        process: &Process,
        publisher: &mut Publisher<C, T>,
    ) -> Result<SyncReport, ProcessError>
    where
        C: CanvasClient,
        T: TaskClient,
    {
        let span = span!(Level::INFO, "pipeline_run", process = %process.name);
        let _enter = span.enter();

        let diagram = self.layout(process)?;
        let report = publisher.publish(&diagram, process)?;
        info!(
            board = %report.board.id,
            shapes = report.shape_count(),
            connectors = report.connector_count(),
            tasks = report.task_count(),
            "Pipeline run completed"
        );
        Ok(report)
    }

    /// Lay out independent documents; one failure does not stop the rest
    pub fn layout_all(&self, processes: &[Process]) -> Vec<Result<Diagram, ProcessError>> {
        processes
            .iter()
            .map(|process| {
                let result = self.layout(process);
                if let Err(e) = &result {
                    warn!(process = %process.name, error = %e, "Layout failed");
                }
                result
            })
            .collect()
    }

    /// Value chain board of a hierarchy document
    pub fn value_chain(&self, hierarchy: &OrganizationHierarchy) -> Result<BoardDiagram, ProcessError> {
        ValueChainLayout::from_config(&self.config.hierarchy).layout_hierarchy(hierarchy)
    }

    /// SIPOC board of one macroprocess
    pub fn sipoc(
        &self,
        hierarchy: &OrganizationHierarchy,
        macroprocess_id: &str,
    ) -> Result<BoardDiagram, ProcessError> {
        SipocLayout::from_config(&self.config.hierarchy).layout_macroprocess(hierarchy, macroprocess_id)
    }

    fn algorithm(&self) -> ProcessLayoutAlgorithm {
        ProcessLayoutAlgorithm::with_config(self.config.layout.clone())
    }
}
