//! Core type definitions for process diagrams
//!
//! This module contains the fundamental types used throughout Lanewright:
//! element kinds and their BPMN subtypes, process elements, sequence flows,
//! and the process document exchanged with the extraction step.

use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Task subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Plain task with no specific performer
    #[default]
    #[serde(alias = "task")]
    Generic,
    /// Task performed by a person using a system
    User,
    /// Task performed by hand, outside any system
    Manual,
    /// Task performed automatically by a system
    Service,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Generic => write!(f, "task"),
            TaskKind::User => write!(f, "user"),
            TaskKind::Manual => write!(f, "manual"),
            TaskKind::Service => write!(f, "service"),
        }
    }
}

/// Gateway subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// Exactly one branch is taken: `X`
    #[default]
    Exclusive,
    /// One or more branches are taken: `O`
    Inclusive,
    /// All branches are taken: `+`
    Parallel,
    /// The branch is picked by the first event that occurs
    EventBased,
}

impl GatewayKind {
    /// Symbol drawn inside the diamond
    pub fn symbol(&self) -> &'static str {
        match self {
            GatewayKind::Exclusive => "X",
            GatewayKind::Inclusive => "O",
            GatewayKind::Parallel => "+",
            GatewayKind::EventBased => "◇",
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayKind::Exclusive => write!(f, "exclusive"),
            GatewayKind::Inclusive => write!(f, "inclusive"),
            GatewayKind::Parallel => write!(f, "parallel"),
            GatewayKind::EventBased => write!(f, "event_based"),
        }
    }
}

/// What triggers (or is thrown by) an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTrigger {
    #[default]
    None,
    Timer,
    Message,
    Signal,
    Error,
    Conditional,
    Multiple,
    Link,
}

impl EventTrigger {
    /// Symbol drawn inside the event circle (empty for plain events)
    pub fn symbol(&self) -> &'static str {
        match self {
            EventTrigger::None => "",
            EventTrigger::Timer => "⏱",
            EventTrigger::Message => "✉",
            EventTrigger::Signal => "△",
            EventTrigger::Error => "⚡",
            EventTrigger::Conditional => "≡",
            EventTrigger::Multiple => "⬠",
            EventTrigger::Link => "→",
        }
    }
}

impl fmt::Display for EventTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTrigger::None => write!(f, "none"),
            EventTrigger::Timer => write!(f, "timer"),
            EventTrigger::Message => write!(f, "message"),
            EventTrigger::Signal => write!(f, "signal"),
            EventTrigger::Error => write!(f, "error"),
            EventTrigger::Conditional => write!(f, "conditional"),
            EventTrigger::Multiple => write!(f, "multiple"),
            EventTrigger::Link => write!(f, "link"),
        }
    }
}

/// Closed set of process element kinds
///
/// Serialized with a `type` tag and an optional `subtype`:
/// `{"type": "task", "subtype": "user"}`, `{"type": "start_event"}`.
/// Annotations are free notes: they take no part in the flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Task {
        #[serde(default)]
        subtype: TaskKind,
    },
    Gateway {
        #[serde(default)]
        subtype: GatewayKind,
    },
    StartEvent {
        #[serde(default)]
        subtype: EventTrigger,
    },
    EndEvent {
        #[serde(default)]
        subtype: EventTrigger,
    },
    IntermediateEvent {
        #[serde(default)]
        subtype: EventTrigger,
    },
    Annotation,
}

impl Default for ElementKind {
    fn default() -> Self {
        ElementKind::task(TaskKind::Generic)
    }
}

impl ElementKind {
    pub fn task(subtype: TaskKind) -> Self {
        ElementKind::Task { subtype }
    }

    pub fn gateway(subtype: GatewayKind) -> Self {
        ElementKind::Gateway { subtype }
    }

    pub fn start(subtype: EventTrigger) -> Self {
        ElementKind::StartEvent { subtype }
    }

    pub fn end(subtype: EventTrigger) -> Self {
        ElementKind::EndEvent { subtype }
    }

    pub fn intermediate(subtype: EventTrigger) -> Self {
        ElementKind::IntermediateEvent { subtype }
    }

    /// Returns true for tasks (activity-level elements)
    pub fn is_task(&self) -> bool {
        matches!(self, ElementKind::Task { .. })
    }

    /// Returns true for gateways
    pub fn is_gateway(&self) -> bool {
        matches!(self, ElementKind::Gateway { .. })
    }

    /// Returns true for any event
    pub fn is_event(&self) -> bool {
        matches!(
            self,
            ElementKind::StartEvent { .. }
                | ElementKind::EndEvent { .. }
                | ElementKind::IntermediateEvent { .. }
        )
    }

    /// Returns true for start events
    pub fn is_start(&self) -> bool {
        matches!(self, ElementKind::StartEvent { .. })
    }

    /// Returns true for end events
    pub fn is_end(&self) -> bool {
        matches!(self, ElementKind::EndEvent { .. })
    }

    /// Returns true for annotations, which sit outside the flow graph
    pub fn is_annotation(&self) -> bool {
        matches!(self, ElementKind::Annotation)
    }

    /// Visual shape used on the canvas
    pub fn shape(&self) -> ShapeKind {
        match self {
            ElementKind::Task { .. } => ShapeKind::Rectangle,
            ElementKind::Gateway { .. } => ShapeKind::Diamond,
            ElementKind::Annotation => ShapeKind::StickyNote,
            _ => ShapeKind::Circle,
        }
    }

    /// Symbol rendered inside the shape, if any
    pub fn symbol(&self) -> &'static str {
        match self {
            ElementKind::Task { .. } | ElementKind::Annotation => "",
            ElementKind::Gateway { subtype } => subtype.symbol(),
            ElementKind::StartEvent { subtype }
            | ElementKind::EndEvent { subtype }
            | ElementKind::IntermediateEvent { subtype } => subtype.symbol(),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Task { subtype } => write!(f, "task:{}", subtype),
            ElementKind::Gateway { subtype } => write!(f, "gateway:{}", subtype),
            ElementKind::StartEvent { subtype } => write!(f, "start_event:{}", subtype),
            ElementKind::EndEvent { subtype } => write!(f, "end_event:{}", subtype),
            ElementKind::IntermediateEvent { subtype } => {
                write!(f, "intermediate_event:{}", subtype)
            }
            ElementKind::Annotation => write!(f, "annotation"),
        }
    }
}

/// Shapes available on the remote canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Diamond,
    Circle,
    StickyNote,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Rectangle => write!(f, "rectangle"),
            ShapeKind::Diamond => write!(f, "rhombus"),
            ShapeKind::Circle => write!(f, "circle"),
            ShapeKind::StickyNote => write!(f, "sticky_note"),
        }
    }
}

/// Connector stroke style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

impl fmt::Display for LineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineStyle::Solid => write!(f, "normal"),
            LineStyle::Dashed => write!(f, "dashed"),
        }
    }
}

/// A step of a business process with all its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ElementDocument")]
pub struct ProcessElement {
    /// Unique identifier for the element
    pub id: String,
    /// Element kind and BPMN subtype
    #[serde(flatten)]
    pub kind: ElementKind,
    /// Display label
    pub label: String,
    /// Responsible actor, used as the swimlane key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Free documentation text (task descriptions come from here)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reference to a procedure document, e.g. `POP-001`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_ref: Option<String>,
    /// Open rendering hints (`icon`, `color`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hints: BTreeMap<String, String>,
}

impl ProcessElement {
    /// Create a new element of the given kind without an actor
    pub fn new(id: impl Into<String>, kind: ElementKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            actor: None,
            description: None,
            documentation_ref: None,
            hints: BTreeMap::new(),
        }
    }

    /// Create a generic task owned by `actor`
    pub fn task(id: impl Into<String>, label: impl Into<String>, actor: impl Into<String>) -> Self {
        Self::new(id, ElementKind::task(TaskKind::Generic), label).with_actor(actor)
    }

    /// Create an exclusive gateway owned by `actor`
    pub fn gateway(
        id: impl Into<String>,
        label: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self::new(id, ElementKind::gateway(GatewayKind::Exclusive), label).with_actor(actor)
    }

    /// Create a plain start event owned by `actor`
    pub fn start(id: impl Into<String>, label: impl Into<String>, actor: impl Into<String>) -> Self {
        Self::new(id, ElementKind::start(EventTrigger::None), label).with_actor(actor)
    }

    /// Create a plain end event owned by `actor`
    pub fn end(id: impl Into<String>, label: impl Into<String>, actor: impl Into<String>) -> Self {
        Self::new(id, ElementKind::end(EventTrigger::None), label).with_actor(actor)
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_documentation_ref(mut self, reference: impl Into<String>) -> Self {
        self.documentation_ref = Some(reference.into());
        self
    }

    pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hints.insert(key.into(), value.into());
        self
    }

    /// Look up a rendering hint
    pub fn hint(&self, key: &str) -> Option<&str> {
        self.hints.get(key).map(String::as_str)
    }

    /// Actor with surrounding whitespace removed; blank counts as none
    pub fn assigned_actor(&self) -> Option<&str> {
        self.actor.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }

    /// Element an annotation is attached to (`attached_to` hint)
    pub fn attached_to(&self) -> Option<&str> {
        self.hint(ATTACHED_TO_HINT).map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Hint naming the element an annotation comments on
pub const ATTACHED_TO_HINT: &str = "attached_to";

/// Metadata keys that select the kind rather than carry a hint
const KIND_METADATA_KEYS: [&str; 4] = ["event_type", "event_subtype", "task_type", "gateway_type"];

/// Wire form of an element.
///
/// Accepts the typed form (`type` + `subtype`, `label`) and the extraction
/// tool's form (`type: "event"` with `metadata.event_type`, `name`, kind
/// details and notes inside a free `metadata` object).
#[derive(Deserialize)]
struct ElementDocument {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(alias = "name")]
    label: String,
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    documentation_ref: Option<String>,
    #[serde(default)]
    hints: BTreeMap<String, String>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

impl ElementDocument {
    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// `subtype` is strict; the free-form metadata falls back to the default
    fn subtype<T: DeserializeOwned + Default>(&self, metadata_key: &str) -> Result<T, String> {
        match (self.subtype.as_deref(), self.metadata_str(metadata_key)) {
            (Some(name), _) => parse_variant(name)
                .map_err(|e| format!("element '{}': invalid subtype: {}", self.id.trim(), e)),
            (None, Some(name)) => Ok(parse_variant(name).unwrap_or_default()),
            (None, None) => Ok(T::default()),
        }
    }

    fn element_kind(&self) -> Result<ElementKind, String> {
        let kind = match self.kind.as_str() {
            "task" => ElementKind::task(self.subtype("task_type")?),
            "gateway" => ElementKind::gateway(self.subtype("gateway_type")?),
            "start_event" => ElementKind::start(self.subtype("event_subtype")?),
            "end_event" => ElementKind::end(self.subtype("event_subtype")?),
            "intermediate_event" => ElementKind::intermediate(self.subtype("event_subtype")?),
            "annotation" => ElementKind::Annotation,
            "event" => {
                let trigger: EventTrigger = self.subtype("event_subtype")?;
                match self.metadata_str("event_type") {
                    Some("start") => ElementKind::start(trigger),
                    Some("end") => ElementKind::end(trigger),
                    // `event_type: "timer"` names the trigger of an intermediate event
                    Some(other) if trigger == EventTrigger::None => {
                        ElementKind::intermediate(parse_variant(other).unwrap_or_default())
                    }
                    _ => ElementKind::intermediate(trigger),
                }
            }
            other => {
                return Err(format!(
                    "element '{}': unknown element type '{}'",
                    self.id.trim(),
                    other
                ))
            }
        };
        Ok(kind)
    }
}

impl TryFrom<ElementDocument> for ProcessElement {
    type Error = String;

    fn try_from(document: ElementDocument) -> Result<Self, Self::Error> {
        let kind = document.element_kind()?;
        let mut hints: BTreeMap<String, String> = document
            .metadata
            .iter()
            .filter(|(key, _)| !KIND_METADATA_KEYS.contains(&key.as_str()))
            .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
            .collect();
        hints.extend(document.hints);
        Ok(Self {
            id: document.id.trim().to_string(),
            kind,
            label: document.label.trim().to_string(),
            actor: document
                .actor
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            description: document.description,
            documentation_ref: document.documentation_ref,
            hints,
        })
    }
}

/// Unit variant of a snake_case enum from its name
fn parse_variant<T: DeserializeOwned>(name: &str) -> Result<T, serde::de::value::Error> {
    T::deserialize(name.trim().into_deserializer())
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

/// A sequence flow between two elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessFlow {
    /// Source element ID
    #[serde(alias = "from_element", deserialize_with = "trimmed")]
    pub source: String,
    /// Target element ID
    #[serde(alias = "to_element", deserialize_with = "trimmed")]
    pub target: String,
    /// Branch condition (gateway outputs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ProcessFlow {
    /// Create an unconditional flow
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: None,
        }
    }

    /// Create a flow guarded by a condition label
    pub fn with_condition(
        source: impl Into<String>,
        target: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: Some(condition.into()),
        }
    }
}

/// A complete process as produced by the extraction step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Declared actors, in the order the transcript lists them
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub elements: Vec<ProcessElement>,
    #[serde(default)]
    pub flows: Vec<ProcessFlow>,
}

impl Process {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a process document from JSON
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}
