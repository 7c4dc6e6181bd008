//! Ordered publishing of a diagram and its tasks
//!
//! Order contract: board, lane backgrounds, element shapes, connectors,
//! tasks. Connectors reference the remote ids of shapes, so every shape of
//! the diagram exists before the first connector is requested. A failed
//! call aborts the run without rollback; publishing again is the recovery.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, span, trace, Level};

use super::{
    BoardRef, CanvasClient, ConnectorRequest, RemoteId, ShapeRequest, ShapeRole, TaskClient,
    TaskRequest,
};
use crate::core::{
    with_retry, Clock, Jitter, LineStyle, Process, ProcessError, RandomJitter, RemoteApiError,
    RetryPolicy, ShapeKind, SystemClock,
};
use crate::plugins::hierarchy::BoardDiagram;
use crate::plugins::process::Diagram;

/// Alternating lane background colours
pub const LANE_COLORS: [&str; 2] = ["#F5F6F8", "#FFFFFF"];

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub board: BoardRef,
    /// Lane background shapes, in lane order
    pub lane_shape_ids: Vec<RemoteId>,
    /// Element id to remote shape id
    pub shape_ids: BTreeMap<String, RemoteId>,
    /// Connector ids, in flow order
    pub connector_ids: Vec<RemoteId>,
    /// Element id to remote task id
    pub task_ids: BTreeMap<String, RemoteId>,
}

impl SyncReport {
    pub fn shape_count(&self) -> usize {
        self.lane_shape_ids.len() + self.shape_ids.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connector_ids.len()
    }

    pub fn task_count(&self) -> usize {
        self.task_ids.len()
    }
}

/// Drives the canvas and task clients for one diagram at a time
pub struct Publisher<C, T> {
    canvas: C,
    tasks: T,
    policy: RetryPolicy,
    clock: Box<dyn Clock>,
    jitter: Box<dyn Jitter>,
    board_prefix: Option<String>,
    task_list: Option<String>,
}

impl<C: CanvasClient, T: TaskClient> Publisher<C, T> {
    pub fn new(canvas: C, tasks: T) -> Self {
        Self {
            canvas,
            tasks,
            policy: RetryPolicy::default(),
            clock: Box::new(SystemClock),
            jitter: Box::new(RandomJitter),
            board_prefix: None,
            task_list: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_jitter(mut self, jitter: impl Jitter + 'static) -> Self {
        self.jitter = Box::new(jitter);
        self
    }

    /// Prefix added to every board name
    pub fn with_board_prefix(mut self, prefix: Option<String>) -> Self {
        self.board_prefix = prefix;
        self
    }

    /// Task list the tasks are created in
    pub fn with_task_list(mut self, list_id: Option<String>) -> Self {
        self.task_list = list_id;
        self
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn tasks(&self) -> &T {
        &self.tasks
    }

    pub fn into_clients(self) -> (C, T) {
        (self.canvas, self.tasks)
    }

    /// Publish a diagram and create one task per task element
    pub fn publish(&mut self, diagram: &Diagram, process: &Process) -> Result<SyncReport, ProcessError> {
        let span = span!(
            Level::INFO,
            "publish",
            process = %diagram.name,
            elements = diagram.elements.len(),
            connectors = diagram.connectors.len()
        );
        let _enter = span.enter();

        let board_name = match &self.board_prefix {
            Some(prefix) => format!("{} {}", prefix, diagram.name),
            None => diagram.name.clone(),
        };
        let board = self.retry("create_board", &board_name, |canvas| {
            canvas.create_board(&board_name, &diagram.description)
        })?;
        let board_url = self.canvas.board_url(&board);
        debug!(board_id = %board.id, "Board created");

        let mut lane_shape_ids = Vec::with_capacity(diagram.lanes.len());
        for lane in &diagram.lanes {
            let request = ShapeRequest {
                role: ShapeRole::LaneBackground { lane: lane.index },
                shape: ShapeKind::Rectangle,
                content: lane.actor.clone(),
                x: lane.x + lane.width / 2.0,
                y: lane.y + lane.height / 2.0,
                width: lane.width,
                height: lane.height,
                fill_color: Some(LANE_COLORS[lane.index % LANE_COLORS.len()].to_string()),
                icon_url: None,
                symbol: None,
            };
            let id = self.create_shape(&board, &request)?;
            lane_shape_ids.push(id);
        }

        let mut shape_ids: BTreeMap<String, RemoteId> = BTreeMap::new();
        for element in &diagram.elements {
            let center = element.center();
            let fill_color = process
                .elements
                .iter()
                .find(|e| e.id == element.element_id)
                .and_then(|e| e.hint("color"))
                .map(str::to_string);
            let request = ShapeRequest {
                role: ShapeRole::Element {
                    element_id: element.element_id.clone(),
                },
                shape: element.kind.shape(),
                content: element.label.clone(),
                x: center.x,
                y: center.y,
                width: element.width,
                height: element.height,
                fill_color,
                icon_url: element.icon_url.clone(),
                symbol: Some(element.kind.symbol())
                    .filter(|symbol| !symbol.is_empty())
                    .map(str::to_string),
            };
            let id = self.create_shape(&board, &request)?;
            trace!(element_id = %element.element_id, remote_id = %id, "Shape created");
            shape_ids.insert(element.element_id.clone(), id);
        }
        debug!(shapes = shape_ids.len() + lane_shape_ids.len(), "All shapes created");

        let mut connector_ids = Vec::with_capacity(diagram.connectors.len());
        for connector in &diagram.connectors {
            let (Some(start), Some(end)) = (
                shape_ids.get(&connector.source_id),
                shape_ids.get(&connector.target_id),
            ) else {
                continue;
            };
            let request = ConnectorRequest {
                start_item: start.clone(),
                end_item: end.clone(),
                caption: connector.condition.clone(),
                style: connector.style,
                waypoints: connector.waypoints.clone(),
            };
            let echo = serde_json::to_string(&request).unwrap_or_default();
            let id = self.retry("create_connector", &echo, |canvas| {
                canvas.create_connector(&board, &request)
            })?;
            connector_ids.push(id);
        }
        debug!(connectors = connector_ids.len(), "All connectors created");

        let mut task_ids: BTreeMap<String, RemoteId> = BTreeMap::new();
        for element in process.elements.iter().filter(|e| e.kind.is_task()) {
            let mut description = element.description.clone().unwrap_or_default();
            if let Some(reference) = &element.documentation_ref {
                if !description.is_empty() {
                    description.push_str("\n\n");
                }
                description.push_str(&format!("Procedure: {}", reference));
            }
            let request = TaskRequest {
                element_id: element.id.clone(),
                name: element.label.clone(),
                description,
                list_id: self.task_list.clone(),
            };
            let echo = serde_json::to_string(&request).unwrap_or_default();
            let task_id = self.retry_tasks("create_task", &echo, |tasks| tasks.create_task(&request))?;
            let comment = format!("Process diagram: {}", board_url);
            self.retry_tasks("add_comment", &comment, |tasks| tasks.add_comment(&task_id, &comment))?;
            trace!(element_id = %element.id, task_id = %task_id, "Task created");
            task_ids.insert(element.id.clone(), task_id);
        }

        let report = SyncReport {
            board,
            lane_shape_ids,
            shape_ids,
            connector_ids,
            task_ids,
        };
        info!(
            shapes = report.shape_count(),
            connectors = report.connector_count(),
            tasks = report.task_count(),
            "Publish completed"
        );
        Ok(report)
    }

    /// Publish a value chain or SIPOC board: shapes in drawing order, then
    /// connectors. No tasks are created.
    pub fn publish_board(&mut self, diagram: &BoardDiagram) -> Result<SyncReport, ProcessError> {
        let span = span!(
            Level::INFO,
            "publish",
            board_kind = ?diagram.kind,
            shapes = diagram.shapes.len(),
            connectors = diagram.connectors.len()
        );
        let _enter = span.enter();

        let board_name = match &self.board_prefix {
            Some(prefix) => format!("{} {}", prefix, diagram.name),
            None => diagram.name.clone(),
        };
        let board = self.retry("create_board", &board_name, |canvas| {
            canvas.create_board(&board_name, &diagram.description)
        })?;

        let mut shape_ids: BTreeMap<String, RemoteId> = BTreeMap::new();
        for shape in &diagram.shapes {
            let center = shape.center();
            let request = ShapeRequest {
                role: ShapeRole::BoardShape {
                    shape_id: shape.id.clone(),
                },
                shape: ShapeKind::Rectangle,
                content: shape.content.clone(),
                x: center.x,
                y: center.y,
                width: shape.width,
                height: shape.height,
                fill_color: Some(shape.color.fill.to_string()),
                icon_url: None,
                symbol: None,
            };
            let id = self.create_shape(&board, &request)?;
            shape_ids.insert(shape.id.clone(), id);
        }

        let mut connector_ids = Vec::with_capacity(diagram.connectors.len());
        for connector in &diagram.connectors {
            let (Some(start), Some(end)) = (
                shape_ids.get(&connector.source_id),
                shape_ids.get(&connector.target_id),
            ) else {
                continue;
            };
            let request = ConnectorRequest {
                start_item: start.clone(),
                end_item: end.clone(),
                caption: None,
                style: LineStyle::Solid,
                waypoints: connector.waypoints.clone(),
            };
            let echo = serde_json::to_string(&request).unwrap_or_default();
            let id = self.retry("create_connector", &echo, |canvas| {
                canvas.create_connector(&board, &request)
            })?;
            connector_ids.push(id);
        }

        let report = SyncReport {
            board,
            lane_shape_ids: Vec::new(),
            shape_ids,
            connector_ids,
            task_ids: BTreeMap::new(),
        };
        info!(
            shapes = report.shape_count(),
            connectors = report.connector_count(),
            "Board publish completed"
        );
        Ok(report)
    }

    fn create_shape(&mut self, board: &BoardRef, request: &ShapeRequest) -> Result<RemoteId, ProcessError> {
        let echo = serde_json::to_string(request).unwrap_or_default();
        self.retry("create_shape", &echo, |canvas| canvas.create_shape(board, request))
    }

    fn retry<R, F>(&mut self, operation: &str, echo: &str, mut call: F) -> Result<R, ProcessError>
    where
        F: FnMut(&mut C) -> Result<R, RemoteApiError>,
    {
        let canvas = &mut self.canvas;
        with_retry(&self.policy, self.clock.as_ref(), self.jitter.as_ref(), operation, || {
            call(canvas)
        })
        .map_err(|e| ProcessError::from(e.with_request(format!("{}: {}", operation, echo))))
    }

    fn retry_tasks<R, F>(&mut self, operation: &str, echo: &str, mut call: F) -> Result<R, ProcessError>
    where
        F: FnMut(&mut T) -> Result<R, RemoteApiError>,
    {
        let tasks = &mut self.tasks;
        with_retry(&self.policy, self.clock.as_ref(), self.jitter.as_ref(), operation, || {
            call(tasks)
        })
        .map_err(|e| ProcessError::from(e.with_request(format!("{}: {}", operation, echo))))
    }
}
