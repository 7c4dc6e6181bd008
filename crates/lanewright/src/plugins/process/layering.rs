//! Cycle breaking and column assignment
//!
//! Processes loop back ("rework the order"), so the flow graph is not a DAG.
//! Cycles are broken by reversing one flow per cycle, picked by breadth-first
//! depth from the start events, and the remaining forward flows are layered
//! by longest path. Annotations hang off the flow graph: they take the
//! column of the element they are attached to.

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::{debug, span, trace, Level};

use super::database::ProcessDatabase;
use crate::core::{Database, ProcessError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Index-based view of the flow graph used by the layering phases
///
/// Nodes are numbered in element insertion order. Flows keep their
/// insertion index so a back-edge can be reported against the input.
#[derive(Debug, Clone)]
pub struct FlowGraph<'a> {
    ids: Vec<&'a str>,
    index: HashMap<&'a str, usize>,
    starts: Vec<usize>,
    /// (flow index, target) per node, in flow order
    outgoing: Vec<Vec<(usize, usize)>>,
    /// (flow index, source) per node, in flow order
    incoming: Vec<Vec<(usize, usize)>>,
    /// (source, target) per flow index; `None` for dangling flows
    flow_ends: Vec<Option<(usize, usize)>>,
    /// Annotation nodes and the node each one is attached to
    annotations: HashMap<usize, Option<usize>>,
    depths: Vec<Option<usize>>,
    back_edges: BTreeSet<usize>,
    columns: Vec<usize>,
}

impl<'a> FlowGraph<'a> {
    /// Build the graph; flows with unknown endpoints are ignored
    pub fn new(db: &'a ProcessDatabase) -> Self {
        let ids: Vec<&str> = db.elements().map(|e| e.id.as_str()).collect();
        let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut outgoing = vec![Vec::new(); ids.len()];
        let mut incoming = vec![Vec::new(); ids.len()];
        let mut flow_ends = Vec::with_capacity(db.flow_count());
        for (flow_index, flow) in db.flows().enumerate() {
            let ends = match (
                index.get(flow.source.as_str()),
                index.get(flow.target.as_str()),
            ) {
                (Some(&source), Some(&target)) => {
                    outgoing[source].push((flow_index, target));
                    incoming[target].push((flow_index, source));
                    Some((source, target))
                }
                _ => None,
            };
            flow_ends.push(ends);
        }
        let annotations = db
            .elements()
            .enumerate()
            .filter(|(_, e)| e.kind.is_annotation())
            .map(|(i, e)| (i, e.attached_to().and_then(|t| index.get(t).copied())))
            .collect();
        let starts = db
            .elements()
            .enumerate()
            .filter(|(_, e)| e.kind.is_start())
            .map(|(i, _)| i)
            .collect();
        let len = ids.len();
        Self {
            ids,
            index,
            starts,
            outgoing,
            incoming,
            flow_ends,
            annotations,
            depths: vec![None; len],
            back_edges: BTreeSet::new(),
            columns: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Element ID of a node
    pub fn id(&self, node: usize) -> &'a str {
        self.ids[node]
    }

    /// Node of an element ID
    pub fn node(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// True for annotation nodes
    pub fn is_annotation(&self, node: usize) -> bool {
        self.annotations.contains_key(&node)
    }

    /// Breadth-first depth from the nearest start event
    pub fn depth(&self, node: usize) -> Option<usize> {
        self.depths[node]
    }

    /// Column after [`FlowGraph::assign_columns`]
    pub fn column(&self, node: usize) -> usize {
        self.columns[node]
    }

    /// Flow indices marked as back-edges, ascending
    pub fn back_edges(&self) -> &BTreeSet<usize> {
        &self.back_edges
    }

    pub fn is_back_edge(&self, flow_index: usize) -> bool {
        self.back_edges.contains(&flow_index)
    }

    /// Sources of non-reversed incoming flows, in flow order
    pub fn forward_predecessors(&self, node: usize) -> Vec<usize> {
        self.incoming[node]
            .iter()
            .filter(|(flow, _)| !self.back_edges.contains(flow))
            .map(|&(_, source)| source)
            .collect()
    }

    /// Targets of non-reversed outgoing flows, in flow order
    pub fn forward_successors(&self, node: usize) -> Vec<usize> {
        self.outgoing[node]
            .iter()
            .filter(|(flow, _)| !self.back_edges.contains(flow))
            .map(|&(_, target)| target)
            .collect()
    }

    /// Non-reversed flows as (flow index, source, target)
    pub fn forward_flows(&self) -> Vec<(usize, usize, usize)> {
        let mut flows: Vec<(usize, usize, usize)> = self
            .outgoing
            .iter()
            .enumerate()
            .flat_map(|(source, out)| out.iter().map(move |&(flow, target)| (flow, source, target)))
            .filter(|(flow, _, _)| !self.back_edges.contains(flow))
            .collect();
        flows.sort_unstable();
        flows
    }

    /// Compute depths and mark one back-edge per cycle until the forward
    /// graph is acyclic
    ///
    /// Fails with `DisconnectedElement` for the first element (in insertion
    /// order) that no start event reaches. Annotations are exempt.
    pub fn break_cycles(&mut self) -> Result<(), ProcessError> {
        let span = span!(Level::DEBUG, "break_cycles", node_count = self.len());
        let _enter = span.enter();

        self.compute_depths();
        if let Some(orphan) =
            (0..self.len()).find(|&n| self.depths[n].is_none() && !self.is_annotation(n))
        {
            debug!(element_id = %self.ids[orphan], "Element unreachable from start events");
            return Err(ProcessError::disconnected(self.ids[orphan]));
        }

        self.back_edges.clear();
        while let Some(cycle) = self.find_cycle() {
            let chosen = cycle
                .iter()
                .copied()
                .min_by_key(|&flow| (self.flow_target_depth(flow), flow));
            let Some(flow) = chosen else {
                break;
            };
            trace!(flow_index = flow, cycle_len = cycle.len(), "Reversing flow to break cycle");
            self.back_edges.insert(flow);
        }

        debug!(back_edges = self.back_edges.len(), "Cycles broken");
        Ok(())
    }

    /// Longest-path layering over the forward flows
    pub fn assign_columns(&mut self) -> &[usize] {
        let span = span!(Level::DEBUG, "assign_columns", node_count = self.len());
        let _enter = span.enter();

        let mut in_degree: Vec<usize> = (0..self.len())
            .map(|n| self.forward_predecessors(n).len())
            .collect();
        let mut columns = vec![0usize; self.len()];
        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&n| in_degree[n] == 0).collect();
        let mut processed = 0;

        while let Some(node) = queue.pop_front() {
            processed += 1;
            for next in self.forward_successors(node) {
                columns[next] = columns[next].max(columns[node] + 1);
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if processed < self.len() {
            debug!(
                processed,
                total = self.len(),
                "Forward graph still cyclic; unprocessed nodes keep partial columns"
            );
        }

        for (&note, &attached) in &self.annotations {
            columns[note] = attached.map_or(0, |node| columns[node]);
        }

        self.columns = columns;
        debug!(
            column_count = self.column_count(),
            "Columns assigned"
        );
        &self.columns
    }

    /// Number of columns in use
    pub fn column_count(&self) -> usize {
        self.columns.iter().max().map_or(0, |&c| c + 1)
    }

    fn compute_depths(&mut self) {
        let mut depths = vec![None; self.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for &start in &self.starts {
            if depths[start].is_none() {
                depths[start] = Some(0);
                queue.push_back(start);
            }
        }
        while let Some(node) = queue.pop_front() {
            let depth = depths[node].unwrap_or(0);
            for &(_, next) in &self.outgoing[node] {
                if depths[next].is_none() {
                    depths[next] = Some(depth + 1);
                    queue.push_back(next);
                }
            }
        }
        self.depths = depths;
    }

    fn flow_target_depth(&self, flow: usize) -> usize {
        self.flow_ends
            .get(flow)
            .copied()
            .flatten()
            .and_then(|(_, target)| self.depths[target])
            .unwrap_or(usize::MAX)
    }

    /// Depth-first search over forward flows; returns the flow indices of
    /// the first cycle found
    fn find_cycle(&self) -> Option<Vec<usize>> {
        let mut state = vec![Visit::New; self.len()];
        for root in 0..self.len() {
            if state[root] != Visit::New {
                continue;
            }
            state[root] = Visit::Active;
            // (node, next outgoing position, flow used to enter)
            let mut frames: Vec<(usize, usize, Option<usize>)> = vec![(root, 0, None)];
            while let Some(frame) = frames.last_mut() {
                let node = frame.0;
                let Some(&(flow, next)) = self.outgoing[node].get(frame.1) else {
                    state[node] = Visit::Done;
                    frames.pop();
                    continue;
                };
                frame.1 += 1;
                if self.back_edges.contains(&flow) {
                    continue;
                }
                match state[next] {
                    Visit::New => {
                        state[next] = Visit::Active;
                        frames.push((next, 0, Some(flow)));
                    }
                    Visit::Active => {
                        let start = frames.iter().position(|f| f.0 == next)?;
                        let mut cycle: Vec<usize> =
                            frames[start + 1..].iter().filter_map(|f| f.2).collect();
                        cycle.push(flow);
                        return Some(cycle);
                    }
                    Visit::Done => {}
                }
            }
        }
        None
    }
}
