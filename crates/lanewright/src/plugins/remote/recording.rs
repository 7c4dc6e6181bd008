//! In-memory canvas and task clients
//!
//! Both clients hand out sequential ids and keep a log of every call. A
//! queue of injected failures lets tests script remote errors.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::trace;

use super::{BoardRef, CanvasClient, ConnectorRequest, RemoteId, ShapeRequest, TaskClient, TaskRequest};
use crate::core::RemoteApiError;

/// One call received by [`RecordingCanvas`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum CanvasCall {
    CreateBoard {
        name: String,
        description: String,
        id: RemoteId,
    },
    CreateShape {
        board_id: RemoteId,
        request: ShapeRequest,
        id: RemoteId,
    },
    CreateConnector {
        board_id: RemoteId,
        request: ConnectorRequest,
        id: RemoteId,
    },
}

/// Canvas client that records instead of calling a service
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    calls: Vec<CanvasCall>,
    failures: VecDeque<RemoteApiError>,
    attempts: usize,
    next_id: usize,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call with `error` (queued, one per call)
    pub fn fail_next(&mut self, error: RemoteApiError) {
        self.failures.push_back(error);
    }

    /// Successful calls in order
    pub fn calls(&self) -> &[CanvasCall] {
        &self.calls
    }

    /// Every call received, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    fn begin(&mut self) -> Result<RemoteId, RemoteApiError> {
        self.attempts += 1;
        if let Some(error) = self.failures.pop_front() {
            trace!(error = %error, "Injected canvas failure");
            return Err(error);
        }
        self.next_id += 1;
        Ok(self.next_id.to_string())
    }
}

impl CanvasClient for RecordingCanvas {
    fn create_board(&mut self, name: &str, description: &str) -> Result<BoardRef, RemoteApiError> {
        let id = format!("board-{}", self.begin()?);
        self.calls.push(CanvasCall::CreateBoard {
            name: name.to_string(),
            description: description.to_string(),
            id: id.clone(),
        });
        Ok(BoardRef {
            url: format!("https://canvas.invalid/board/{}", id),
            id,
        })
    }

    fn create_shape(
        &mut self,
        board: &BoardRef,
        request: &ShapeRequest,
    ) -> Result<RemoteId, RemoteApiError> {
        let id = format!("shape-{}", self.begin()?);
        self.calls.push(CanvasCall::CreateShape {
            board_id: board.id.clone(),
            request: request.clone(),
            id: id.clone(),
        });
        Ok(id)
    }

    fn create_connector(
        &mut self,
        board: &BoardRef,
        request: &ConnectorRequest,
    ) -> Result<RemoteId, RemoteApiError> {
        let id = format!("connector-{}", self.begin()?);
        self.calls.push(CanvasCall::CreateConnector {
            board_id: board.id.clone(),
            request: request.clone(),
            id: id.clone(),
        });
        Ok(id)
    }
}

/// One call received by [`RecordingTaskClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum TaskCall {
    CreateTask { request: TaskRequest, id: RemoteId },
    AddComment { task_id: RemoteId, text: String, id: RemoteId },
}

/// Task client that records instead of calling a service
#[derive(Debug, Default)]
pub struct RecordingTaskClient {
    calls: Vec<TaskCall>,
    failures: VecDeque<RemoteApiError>,
    attempts: usize,
    next_id: usize,
}

impl RecordingTaskClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&mut self, error: RemoteApiError) {
        self.failures.push_back(error);
    }

    pub fn calls(&self) -> &[TaskCall] {
        &self.calls
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    fn begin(&mut self) -> Result<usize, RemoteApiError> {
        self.attempts += 1;
        if let Some(error) = self.failures.pop_front() {
            trace!(error = %error, "Injected task failure");
            return Err(error);
        }
        self.next_id += 1;
        Ok(self.next_id)
    }
}

impl TaskClient for RecordingTaskClient {
    fn create_task(&mut self, request: &TaskRequest) -> Result<RemoteId, RemoteApiError> {
        let id = format!("task-{}", self.begin()?);
        self.calls.push(TaskCall::CreateTask {
            request: request.clone(),
            id: id.clone(),
        });
        Ok(id)
    }

    fn add_comment(&mut self, task_id: &str, text: &str) -> Result<RemoteId, RemoteApiError> {
        let id = format!("comment-{}", self.begin()?);
        self.calls.push(TaskCall::AddComment {
            task_id: task_id.to_string(),
            text: text.to_string(),
            id: id.clone(),
        });
        Ok(id)
    }
}
