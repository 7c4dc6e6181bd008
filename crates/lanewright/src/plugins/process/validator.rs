//! Structural validation of a process graph
//!
//! Runs before any layout or remote call. Hard errors abort the pipeline;
//! warnings are logged and carried in the [`ValidationReport`].

use std::collections::{HashSet, VecDeque};
use std::fmt;

use serde::Serialize;
use tracing::{debug, span, warn, Level};

use super::database::ProcessDatabase;
use crate::core::{Database, GatewayKind, ElementKind, ProcessError};

/// Non-fatal findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// More than one start event
    MultipleStarts { count: usize },
    /// No end event at all
    MissingEndEvent,
    /// Decision gateway branch without a condition label
    UnlabeledGatewayFlow { gateway_id: String, target_id: String },
    /// Element actor missing from the declared actor list
    UndeclaredActor { actor: String, element_id: String },
    /// Declared actor that owns no element
    UnusedActor { actor: String },
    /// Annotation attached to an element that does not exist
    DanglingAnnotation { annotation_id: String, target_id: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleStarts { count } => write!(f, "process has {} start events", count),
            Self::MissingEndEvent => write!(f, "process has no end event"),
            Self::UnlabeledGatewayFlow {
                gateway_id,
                target_id,
            } => write!(
                f,
                "flow {} -> {} leaves a gateway without a condition",
                gateway_id, target_id
            ),
            Self::UndeclaredActor { actor, element_id } => write!(
                f,
                "actor '{}' of element '{}' is not declared",
                actor, element_id
            ),
            Self::UnusedActor { actor } => write!(f, "declared actor '{}' is never used", actor),
            Self::DanglingAnnotation {
                annotation_id,
                target_id,
            } => write!(
                f,
                "annotation '{}' is attached to unknown element '{}'",
                annotation_id, target_id
            ),
        }
    }
}

/// Everything validation found, in check order
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ProcessError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consume the report, keeping only warnings if there are no errors
    pub fn into_result(mut self) -> Result<Vec<ValidationWarning>, ProcessError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(self.errors.swap_remove(0))
        }
    }
}

/// Checks the structural invariants of a process graph
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessValidator;

impl ProcessValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate and fail on the first hard error
    pub fn validate(&self, db: &ProcessDatabase) -> Result<Vec<ValidationWarning>, ProcessError> {
        self.inspect(db).into_result()
    }

    /// Run every check and collect all findings
    pub fn inspect(&self, db: &ProcessDatabase) -> ValidationReport {
        let span = span!(
            Level::DEBUG,
            "validate_process",
            element_count = db.element_count(),
            flow_count = db.flow_count()
        );
        let _enter = span.enter();

        let mut report = ValidationReport::default();

        for id in db.duplicate_ids() {
            report.errors.push(ProcessError::malformed_flow(
                id.clone(),
                "unique element id",
                "duplicate definition",
            ));
        }

        for (position, element) in db.elements().enumerate() {
            if element.id.trim().is_empty() {
                report.errors.push(ProcessError::malformed_flow(
                    format!("element #{}", position + 1),
                    "non-empty element id",
                    format!("blank id on '{}'", element.label.trim()),
                ));
            }
            if element.label.trim().is_empty() {
                report.errors.push(ProcessError::malformed_flow(
                    element.id.clone(),
                    "non-empty label",
                    "blank label",
                ));
            }
        }

        for flow in db.flows() {
            for endpoint in [&flow.source, &flow.target] {
                match db.get_element(endpoint) {
                    None => report.errors.push(ProcessError::malformed_flow(
                        endpoint.clone(),
                        "flow endpoint referencing an existing element",
                        format!("unknown element in flow {} -> {}", flow.source, flow.target),
                    )),
                    Some(element) if element.kind.is_annotation() => {
                        report.errors.push(ProcessError::malformed_flow(
                            endpoint.clone(),
                            "annotation outside the sequence flow",
                            format!("flow {} -> {}", flow.source, flow.target),
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        let starts = db.start_elements();
        if starts.is_empty() {
            report.errors.push(ProcessError::malformed_flow(
                db.name().to_string(),
                "at least 1 start event",
                "0",
            ));
        } else if starts.len() > 1 {
            report.warnings.push(ValidationWarning::MultipleStarts {
                count: starts.len(),
            });
        }
        if db.end_elements().is_empty() {
            report.warnings.push(ValidationWarning::MissingEndEvent);
        }

        if !starts.is_empty() {
            let reachable = reachable_from_starts(db);
            for element in db.elements().filter(|e| !e.kind.is_annotation()) {
                if !reachable.contains(element.id.as_str()) {
                    report.errors.push(ProcessError::disconnected(element.id.clone()));
                }
            }
        }

        for element in db.elements() {
            let out = db.out_degree(&element.id);
            match element.kind {
                ElementKind::Gateway { subtype } => {
                    if out < 2 {
                        report.errors.push(ProcessError::malformed_flow(
                            element.id.clone(),
                            "at least 2 outgoing flows",
                            out.to_string(),
                        ));
                    }
                    if matches!(subtype, GatewayKind::Exclusive | GatewayKind::Inclusive) {
                        for (_, flow) in db.outgoing(&element.id) {
                            if flow.condition.as_deref().map_or(true, str::is_empty) {
                                report.warnings.push(ValidationWarning::UnlabeledGatewayFlow {
                                    gateway_id: element.id.clone(),
                                    target_id: flow.target.clone(),
                                });
                            }
                        }
                    }
                }
                ElementKind::EndEvent { .. } => {}
                ElementKind::Annotation => {
                    if let Some(target) = element.attached_to() {
                        if !db.has_element(target) {
                            report.warnings.push(ValidationWarning::DanglingAnnotation {
                                annotation_id: element.id.clone(),
                                target_id: target.to_string(),
                            });
                        }
                    }
                }
                _ => {
                    if out == 0 {
                        report.errors.push(ProcessError::malformed_flow(
                            element.id.clone(),
                            "at least 1 outgoing flow",
                            "0",
                        ));
                    }
                }
            }
        }

        let declared = db.declared_actors();
        if !declared.is_empty() {
            for element in db.elements() {
                if let Some(actor) = element.assigned_actor() {
                    if !declared.iter().any(|d| d == actor) {
                        report.warnings.push(ValidationWarning::UndeclaredActor {
                            actor: actor.to_string(),
                            element_id: element.id.clone(),
                        });
                    }
                }
            }
            let used = db.used_actors();
            for actor in declared {
                if !used.contains(&actor.as_str()) {
                    report.warnings.push(ValidationWarning::UnusedActor {
                        actor: actor.clone(),
                    });
                }
            }
        }

        for warning in &report.warnings {
            warn!(process = %db.name(), "{}", warning);
        }
        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Validation completed"
        );
        report
    }
}

/// Breadth-first reachability over all flows
fn reachable_from_starts(db: &ProcessDatabase) -> HashSet<&str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for start in db.start_elements() {
        if seen.insert(start.id.as_str()) {
            queue.push_back(start.id.as_str());
        }
    }
    while let Some(id) = queue.pop_front() {
        for next in db.successors(id) {
            if db.has_element(next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}
