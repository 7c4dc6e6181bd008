//! Swimlane assignment
//!
//! Lanes are keyed by actor. Lane order follows the first appearance of
//! each actor in a breadth-first walk from the start events, so the lane
//! that starts the process sits on top.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::{debug, span, trace, Level};

use super::database::ProcessDatabase;
use crate::core::{Database, ProcessElement, ProcessError};

/// A horizontal band owned by one actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swimlane {
    /// Position from the top, starting at 0
    pub index: usize,
    pub actor: String,
    /// Element IDs in layout column order, then row order
    pub elements: Vec<String>,
}

/// Result of lane assignment
#[derive(Debug, Clone, Default)]
pub struct LaneAssignment {
    pub lanes: Vec<Swimlane>,
    lane_of: HashMap<String, usize>,
}

impl LaneAssignment {
    /// Lane index of an element
    pub fn lane_of(&self, element_id: &str) -> Option<usize> {
        self.lane_of.get(element_id).copied()
    }

    /// Actor names in lane order
    pub fn actors(&self) -> Vec<&str> {
        self.lanes.iter().map(|l| l.actor.as_str()).collect()
    }
}

/// Groups elements into actor lanes
#[derive(Debug, Clone, Default)]
pub struct SwimlaneAssigner {
    default_actor: Option<String>,
    include_empty_lanes: bool,
}

impl SwimlaneAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actor given to elements that carry none; blank means no default
    pub fn with_default_actor(mut self, actor: Option<String>) -> Self {
        self.default_actor = actor
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        self
    }

    /// Append declared actors that own no element
    pub fn with_empty_lanes(mut self, include: bool) -> Self {
        self.include_empty_lanes = include;
        self
    }

    /// Assign every element to a lane
    ///
    /// Lane element lists come out in traversal order; the layout rewrites
    /// them in column/row order once positions are known.
    pub fn assign(&self, db: &ProcessDatabase) -> Result<LaneAssignment, ProcessError> {
        let span = span!(Level::DEBUG, "assign_swimlanes", element_count = db.element_count());
        let _enter = span.enter();

        // Resolve actors up front so the first unassigned element in input order fails
        let mut actor_of: HashMap<&str, &str> = HashMap::new();
        for element in db.elements() {
            // Annotations without an actor follow the element they comment on
            let attached_actor = || {
                element
                    .attached_to()
                    .and_then(|target| db.get_element(target))
                    .and_then(ProcessElement::assigned_actor)
            };
            let actor = element
                .assigned_actor()
                .or_else(|| element.kind.is_annotation().then(attached_actor).flatten())
                .or(self.default_actor.as_deref())
                .ok_or_else(|| ProcessError::unassigned_actor(element.id.clone()))?;
            actor_of.insert(element.id.as_str(), actor);
        }

        let mut lanes: Vec<Swimlane> = Vec::new();
        let mut lane_of: HashMap<String, usize> = HashMap::new();

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for start in db.start_elements() {
            if visited.insert(start.id.as_str()) {
                queue.push_back(start.id.as_str());
            }
        }
        while let Some(id) = queue.pop_front() {
            if let Some(actor) = actor_of.get(id) {
                place(&mut lanes, &mut lane_of, id, actor);
            }
            for next in db.successors(id) {
                if actor_of.contains_key(next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        // Elements the walk never reached keep input order
        for element in db.elements() {
            if !visited.contains(element.id.as_str()) {
                if let Some(actor) = actor_of.get(element.id.as_str()) {
                    place(&mut lanes, &mut lane_of, &element.id, actor);
                }
            }
        }

        if self.include_empty_lanes {
            for actor in db.declared_actors() {
                if !lanes.iter().any(|l| &l.actor == actor) {
                    lanes.push(Swimlane {
                        index: lanes.len(),
                        actor: actor.clone(),
                        elements: Vec::new(),
                    });
                }
            }
        }

        debug!(lane_count = lanes.len(), "Swimlanes assigned");
        Ok(LaneAssignment { lanes, lane_of })
    }
}

/// Put an element into its actor's lane, opening the lane on first use
fn place(lanes: &mut Vec<Swimlane>, lane_of: &mut HashMap<String, usize>, id: &str, actor: &str) {
    let index = match lanes.iter().position(|l| l.actor == actor) {
        Some(index) => index,
        None => {
            trace!(actor, lane = lanes.len(), "Opening lane");
            lanes.push(Swimlane {
                index: lanes.len(),
                actor: actor.to_string(),
                elements: Vec::new(),
            });
            lanes.len() - 1
        }
    };
    lanes[index].elements.push(id.to_string());
    lane_of.insert(id.to_string(), index);
}
