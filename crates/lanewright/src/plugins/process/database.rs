//! Process database implementation
//!
//! Stores process elements with their kinds and actors, sequence flows with
//! their conditions, and the document metadata (name, declared actors).

use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::core::{Database, ElementKind, Process, ProcessElement, ProcessFlow};

/// Process database implementation
///
/// Maintains insertion order of elements and flows for deterministic layout.
#[derive(Debug, Default, Clone)]
pub struct ProcessDatabase {
    /// Process name (used as the board name)
    name: String,
    description: String,
    /// Declared actors in document order
    declared_actors: Vec<String>,
    /// Elements indexed by ID
    elements: HashMap<String, ProcessElement>,
    /// Element IDs in insertion order
    element_order: Vec<String>,
    /// Flows in insertion order
    flows: Vec<ProcessFlow>,
    /// IDs that were added more than once (first definition wins)
    duplicate_ids: Vec<String>,
}

impl ProcessDatabase {
    /// Create a new empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty database for a named process
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load a whole process document
    pub fn from_process(process: &Process) -> Self {
        let mut db = Self::with_name(process.name.clone());
        db.description = process.description.clone();
        db.declared_actors = process.actors.clone();
        for element in &process.elements {
            db.insert_element(element.clone());
        }
        for flow in &process.flows {
            db.insert_flow(flow.clone());
        }
        debug!(
            process = %db.name,
            element_count = db.element_count(),
            flow_count = db.flow_count(),
            "Process loaded into database"
        );
        db
    }

    /// Rebuild a process document (duplicates are dropped)
    pub fn to_process(&self) -> Process {
        Process {
            name: self.name.clone(),
            description: self.description.clone(),
            actors: self.declared_actors.clone(),
            elements: self.elements().cloned().collect(),
            flows: self.flows.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declare an actor (keeps the first declaration)
    pub fn declare_actor(&mut self, actor: impl Into<String>) {
        let actor = actor.into();
        if !self.declared_actors.contains(&actor) {
            self.declared_actors.push(actor);
        }
    }

    pub fn declared_actors(&self) -> &[String] {
        &self.declared_actors
    }

    /// IDs seen more than once, in the order the repeats were added
    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicate_ids
    }

    /// Check if an element exists
    pub fn has_element(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Position of an element in insertion order
    pub fn element_index(&self, id: &str) -> Option<usize> {
        self.element_order.iter().position(|e| e == id)
    }

    /// Get in-degree (number of incoming flows) for an element
    pub fn in_degree(&self, id: &str) -> usize {
        self.flows.iter().filter(|f| f.target == id).count()
    }

    /// Get out-degree (number of outgoing flows) for an element
    pub fn out_degree(&self, id: &str) -> usize {
        self.flows.iter().filter(|f| f.source == id).count()
    }

    /// Get IDs of elements this element flows to, in flow order
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.flows
            .iter()
            .filter(|f| f.source == id)
            .map(|f| f.target.as_str())
            .collect()
    }

    /// Get IDs of elements flowing into this element, in flow order
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.flows
            .iter()
            .filter(|f| f.target == id)
            .map(|f| f.source.as_str())
            .collect()
    }

    /// Outgoing flows with their flow indices
    pub fn outgoing(&self, id: &str) -> Vec<(usize, &ProcessFlow)> {
        self.flows
            .iter()
            .enumerate()
            .filter(|(_, f)| f.source == id)
            .collect()
    }

    /// Flow by index
    pub fn flow(&self, index: usize) -> Option<&ProcessFlow> {
        self.flows.get(index)
    }

    /// Start events in insertion order
    pub fn start_elements(&self) -> Vec<&ProcessElement> {
        self.elements().filter(|e| e.kind.is_start()).collect()
    }

    /// End events in insertion order
    pub fn end_elements(&self) -> Vec<&ProcessElement> {
        self.elements().filter(|e| e.kind.is_end()).collect()
    }

    /// Actors referenced by elements, first use order
    pub fn used_actors(&self) -> Vec<&str> {
        let mut actors: Vec<&str> = Vec::new();
        for actor in self.elements().filter_map(|e| e.assigned_actor()) {
            if !actors.contains(&actor) {
                actors.push(actor);
            }
        }
        actors
    }

    fn insert_element(&mut self, element: ProcessElement) {
        trace!(
            element_id = %element.id,
            element_kind = %element.kind,
            actor = ?element.actor,
            "Adding element to database"
        );
        if self.elements.contains_key(&element.id) {
            debug!(element_id = %element.id, "Duplicate element id");
            self.duplicate_ids.push(element.id);
            return;
        }
        self.element_order.push(element.id.clone());
        self.elements.insert(element.id.clone(), element);
    }

    fn insert_flow(&mut self, flow: ProcessFlow) {
        trace!(
            source = %flow.source,
            target = %flow.target,
            condition = ?flow.condition,
            "Adding flow to database"
        );
        self.flows.push(flow);
    }
}

impl Database for ProcessDatabase {
    type Element = ProcessElement;
    type Flow = ProcessFlow;

    fn add_element(&mut self, element: ProcessElement) -> Result<()> {
        self.insert_element(element);
        debug!(element_count = self.element_count(), "Element added");
        Ok(())
    }

    fn add_flow(&mut self, flow: ProcessFlow) -> Result<()> {
        self.insert_flow(flow);
        debug!(flow_count = self.flow_count(), "Flow added");
        Ok(())
    }

    fn get_element(&self, id: &str) -> Option<&ProcessElement> {
        self.elements.get(id)
    }

    fn elements(&self) -> impl Iterator<Item = &ProcessElement> {
        self.element_order
            .iter()
            .filter_map(|id| self.elements.get(id))
    }

    fn flows(&self) -> impl Iterator<Item = &ProcessFlow> {
        self.flows.iter()
    }

    fn clear(&mut self) {
        self.elements.clear();
        self.element_order.clear();
        self.flows.clear();
        self.duplicate_ids.clear();
        self.declared_actors.clear();
    }

    fn element_count(&self) -> usize {
        self.elements.len()
    }

    fn flow_count(&self) -> usize {
        self.flows.len()
    }
}

// Convenience methods for building processes in code
impl ProcessDatabase {
    /// Add an element of any kind owned by `actor`
    pub fn add_kind(&mut self, id: &str, kind: ElementKind, label: &str, actor: &str) -> Result<()> {
        self.add_element(ProcessElement::new(id, kind, label).with_actor(actor))
    }

    /// Add a generic task
    pub fn add_task(&mut self, id: &str, label: &str, actor: &str) -> Result<()> {
        self.add_element(ProcessElement::task(id, label, actor))
    }

    /// Add an exclusive gateway
    pub fn add_gateway(&mut self, id: &str, label: &str, actor: &str) -> Result<()> {
        self.add_element(ProcessElement::gateway(id, label, actor))
    }

    /// Add a plain start event
    pub fn add_start(&mut self, id: &str, actor: &str) -> Result<()> {
        self.add_element(ProcessElement::start(id, "Start", actor))
    }

    /// Add a plain end event
    pub fn add_end(&mut self, id: &str, actor: &str) -> Result<()> {
        self.add_element(ProcessElement::end(id, "End", actor))
    }

    /// Add an unconditional flow
    pub fn add_simple_flow(&mut self, source: &str, target: &str) -> Result<()> {
        self.add_flow(ProcessFlow::new(source, target))
    }

    /// Add a flow guarded by a condition
    pub fn add_conditional_flow(&mut self, source: &str, target: &str, condition: &str) -> Result<()> {
        self.add_flow(ProcessFlow::with_condition(source, target, condition))
    }
}
