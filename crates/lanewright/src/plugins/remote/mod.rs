//! Remote publishing
//!
//! The canvas (whiteboard) and task services are reached through the
//! [`CanvasClient`] and [`TaskClient`] traits. [`Publisher`] drives them in
//! the required order; the recording clients stand in for the real
//! services in dry runs and tests.

use serde::Serialize;

use crate::core::{LineStyle, RemoteApiError, ShapeKind};
use crate::plugins::process::Point;

mod publisher;
mod recording;

pub use publisher::*;
pub use recording::*;

/// Identifier assigned by a remote service
pub type RemoteId = String;

/// A board created on the canvas service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardRef {
    pub id: RemoteId,
    pub url: String,
}

/// What a shape stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ShapeRole {
    LaneBackground { lane: usize },
    Element { element_id: String },
    /// Title, frame, header or cell of an overview board
    BoardShape { shape_id: String },
}

/// Input of a shape creation. Positions are shape centres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeRequest {
    pub role: ShapeRole,
    pub shape: ShapeKind,
    pub content: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Marker drawn inside the shape (`X`, `+`, `⏱`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// Input of a connector creation, between two already created shapes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorRequest {
    pub start_item: RemoteId,
    pub end_item: RemoteId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub style: LineStyle,
    pub waypoints: Vec<Point>,
}

/// Input of a task creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRequest {
    pub element_id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
}

/// Whiteboard service
pub trait CanvasClient {
    fn create_board(&mut self, name: &str, description: &str) -> Result<BoardRef, RemoteApiError>;

    fn create_shape(
        &mut self,
        board: &BoardRef,
        request: &ShapeRequest,
    ) -> Result<RemoteId, RemoteApiError>;

    fn create_connector(
        &mut self,
        board: &BoardRef,
        request: &ConnectorRequest,
    ) -> Result<RemoteId, RemoteApiError>;

    /// Public link to a board
    fn board_url(&self, board: &BoardRef) -> String {
        board.url.clone()
    }
}

/// Task-management service
pub trait TaskClient {
    fn create_task(&mut self, request: &TaskRequest) -> Result<RemoteId, RemoteApiError>;

    fn add_comment(&mut self, task_id: &str, text: &str) -> Result<RemoteId, RemoteApiError>;
}
