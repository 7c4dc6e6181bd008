//! Swimlane layout implementation
//!
//! Places every process element on a (lane, column, row) grid using a
//! Sugiyama-style layered layout: validation, lane assignment, cycle
//! breaking, longest-path columns, then median row ordering.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, span, Level};

use super::database::ProcessDatabase;
use super::layering::FlowGraph;
use super::ordering::{initial_layers, order_rows};
use super::swimlane::{Swimlane, SwimlaneAssigner};
use super::validator::{ProcessValidator, ValidationWarning};
use crate::core::{Database, LayoutAlgorithm, LayoutConfig, ProcessError};

/// Grid position of one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridCell {
    pub element_id: String,
    pub lane: usize,
    pub column: usize,
    /// Position inside the lane/column cell, top first
    pub row: usize,
}

/// Layout output: every element exactly once, plus the flow classification
#[derive(Debug, Clone, Serialize)]
pub struct GridLayout {
    /// Lanes with element lists in column, then row order
    pub lanes: Vec<Swimlane>,
    /// Cells in element insertion order
    pub cells: Vec<GridCell>,
    /// Indices of flows reversed to break cycles, ascending
    pub back_edges: Vec<usize>,
    pub column_count: usize,
    /// Crossings left between forward flows
    pub crossings: usize,
    pub warnings: Vec<ValidationWarning>,
}

impl GridLayout {
    /// Look up the cell of an element
    pub fn cell(&self, element_id: &str) -> Option<&GridCell> {
        self.cells.iter().find(|c| c.element_id == element_id)
    }

    /// Whether the flow at `flow_index` was reversed
    pub fn is_back_edge(&self, flow_index: usize) -> bool {
        self.back_edges.binary_search(&flow_index).is_ok()
    }

    /// Cells of one lane/column, in row order
    pub fn cells_in(&self, lane: usize, column: usize) -> Vec<&GridCell> {
        let mut cells: Vec<&GridCell> = self
            .cells
            .iter()
            .filter(|c| c.lane == lane && c.column == column)
            .collect();
        cells.sort_by_key(|c| c.row);
        cells
    }
}

/// Swimlane layout algorithm implementation
#[derive(Debug, Clone, Default)]
pub struct ProcessLayoutAlgorithm {
    config: LayoutConfig,
}

impl ProcessLayoutAlgorithm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Run the grid layout with typed errors
    pub fn layout_grid(&self, db: &ProcessDatabase) -> Result<GridLayout, ProcessError> {
        let span = span!(
            Level::INFO,
            "layout_process",
            process = %db.name(),
            element_count = db.element_count(),
            flow_count = db.flow_count()
        );
        let _enter = span.enter();

        self.config.validate()?;
        let warnings = ProcessValidator::new().validate(db)?;

        let mut assignment = SwimlaneAssigner::new()
            .with_default_actor(self.config.default_actor.clone())
            .with_empty_lanes(self.config.include_empty_lanes)
            .assign(db)?;

        let mut graph = FlowGraph::new(db);
        graph.break_cycles()?;
        graph.assign_columns();

        let lanes: Vec<usize> = (0..graph.len())
            .map(|node| {
                let id = graph.id(node);
                assignment
                    .lane_of(id)
                    .ok_or_else(|| ProcessError::unassigned_actor(id))
            })
            .collect::<Result<_, _>>()?;

        let mut layers = initial_layers(&graph, &lanes);
        let crossings = order_rows(&graph, &lanes, &mut layers, self.config.ordering_passes);

        // Rows count per lane cell inside each column
        let mut rows = vec![0usize; graph.len()];
        for layer in &layers {
            let mut next_row: Vec<usize> = vec![0; assignment.lanes.len()];
            for &node in layer {
                rows[node] = next_row[lanes[node]];
                next_row[lanes[node]] += 1;
            }
        }

        let cells: Vec<GridCell> = (0..graph.len())
            .map(|node| GridCell {
                element_id: graph.id(node).to_string(),
                lane: lanes[node],
                column: graph.column(node),
                row: rows[node],
            })
            .collect();

        for lane in &mut assignment.lanes {
            lane.elements.sort_by_key(|id| {
                graph
                    .node(id)
                    .map_or((usize::MAX, usize::MAX), |n| (graph.column(n), rows[n]))
            });
        }

        let layout = GridLayout {
            lanes: assignment.lanes,
            cells,
            back_edges: graph.back_edges().iter().copied().collect(),
            column_count: graph.column_count(),
            crossings,
            warnings,
        };

        debug!(
            lane_count = layout.lanes.len(),
            column_count = layout.column_count,
            back_edges = layout.back_edges.len(),
            crossings = layout.crossings,
            "Grid computed"
        );
        info!(process = %db.name(), "Layout completed");
        Ok(layout)
    }
}

impl LayoutAlgorithm<ProcessDatabase> for ProcessLayoutAlgorithm {
    type Output = GridLayout;

    fn layout(&self, database: &ProcessDatabase) -> Result<Self::Output> {
        Ok(self.layout_grid(database)?)
    }

    fn name(&self) -> &'static str {
        "swimlane-sugiyama"
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }
}
