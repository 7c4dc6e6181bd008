//! Core error types for process layout and publishing
//!
//! `ProcessError` covers everything that can abort a pipeline run: structural
//! problems in the process graph, configuration problems, and failures of the
//! remote canvas/task services (`RemoteApiError`).

use std::fmt;
use thiserror::Error;

/// Core error types for process layout
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Element '{element_id}' has no actor and no default actor is configured")]
    UnassignedActor { element_id: String },

    #[error("Element '{element_id}' is not reachable from any start event")]
    DisconnectedElement { element_id: String },

    #[error("Malformed flow at '{element_id}': expected {expected}, found {actual}")]
    MalformedFlow {
        element_id: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid hierarchy item '{item_id}': {reason}")]
    InvalidHierarchy { item_id: String, reason: String },

    #[error("Remote API error: {0}")]
    RemoteApi(#[from] RemoteApiError),

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Create a new unassigned actor error
    pub fn unassigned_actor(element_id: impl Into<String>) -> Self {
        Self::UnassignedActor {
            element_id: element_id.into(),
        }
    }

    /// Create a new disconnected element error
    pub fn disconnected(element_id: impl Into<String>) -> Self {
        Self::DisconnectedElement {
            element_id: element_id.into(),
        }
    }

    /// Create a new malformed flow error
    pub fn malformed_flow(
        element_id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::MalformedFlow {
            element_id: element_id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new invalid hierarchy error
    pub fn invalid_hierarchy(item_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHierarchy {
            item_id: item_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new config error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Element the error points at, if any
    pub fn element_id(&self) -> Option<&str> {
        match self {
            Self::UnassignedActor { element_id }
            | Self::DisconnectedElement { element_id }
            | Self::MalformedFlow { element_id, .. } => Some(element_id),
            Self::InvalidHierarchy { item_id, .. } => Some(item_id),
            _ => None,
        }
    }
}

/// Remote collaborator that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteService {
    /// Whiteboard service holding the diagram
    Canvas,
    /// Task-management service holding the activities
    Tasks,
}

impl fmt::Display for RemoteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteService::Canvas => write!(f, "canvas"),
            RemoteService::Tasks => write!(f, "tasks"),
        }
    }
}

/// Failure category reported by a remote client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// Connection refused, reset, timed out
    Transport,
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    Server(u16),
    /// HTTP 401/403
    Authentication,
    /// Any other 4xx
    MalformedRequest(u16),
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteErrorKind::Transport => write!(f, "transport failure"),
            RemoteErrorKind::RateLimited => write!(f, "rate limited"),
            RemoteErrorKind::Server(status) => write!(f, "server error {}", status),
            RemoteErrorKind::Authentication => write!(f, "authentication failed"),
            RemoteErrorKind::MalformedRequest(status) => {
                write!(f, "malformed request {}", status)
            }
        }
    }
}

/// Error returned by a canvas or task client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} {kind}: {message}")]
pub struct RemoteApiError {
    pub service: RemoteService,
    pub kind: RemoteErrorKind,
    pub message: String,
    /// Rendering of the call input that failed
    pub request: Option<String>,
}

impl RemoteApiError {
    pub fn new(service: RemoteService, kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
            request: None,
        }
    }

    /// Classify an HTTP status code
    pub fn from_status(service: RemoteService, status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => RemoteErrorKind::Authentication,
            429 => RemoteErrorKind::RateLimited,
            500..=599 => RemoteErrorKind::Server(status),
            _ => RemoteErrorKind::MalformedRequest(status),
        };
        Self::new(service, kind, message)
    }

    /// Attach the failing call's input
    pub fn with_request(mut self, request: impl Into<String>) -> Self {
        self.request = Some(request.into());
        self
    }

    /// Transport failures, rate limits and 5xx responses are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            RemoteErrorKind::Transport | RemoteErrorKind::RateLimited | RemoteErrorKind::Server(_)
        )
    }
}
