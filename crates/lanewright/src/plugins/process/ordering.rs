//! Median ordering of rows for crossing minimization
//!
//! Implements the ordering phase of the layered layout. A column is the
//! concatenation of its lane cells, top lane first; reordering only ever
//! happens inside a cell, so elements never leave their lane.

use tracing::{debug, span, trace, Level};

use super::layering::FlowGraph;

/// Group nodes into columns, each sorted by lane then insertion order
pub fn initial_layers(graph: &FlowGraph, lanes: &[usize]) -> Vec<Vec<usize>> {
    let column_count = (0..graph.len()).map(|n| graph.column(n) + 1).max().unwrap_or(0);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); column_count];
    for node in 0..graph.len() {
        layers[graph.column(node)].push(node);
    }
    for layer in &mut layers {
        layer.sort_by_key(|&node| (lanes[node], node));
    }
    layers
}

/// Position of every node inside its column
pub fn positions(layers: &[Vec<usize>], node_count: usize) -> Vec<usize> {
    let mut pos = vec![0; node_count];
    for layer in layers {
        for (i, &node) in layer.iter().enumerate() {
            pos[node] = i;
        }
    }
    pos
}

/// Count crossings between forward flows.
///
/// Two flows spanning the same pair of columns cross when their sources
/// and targets appear in opposite order. Flows spanning different column
/// pairs are not compared.
pub fn cross_count(layers: &[Vec<usize>], graph: &FlowGraph) -> usize {
    let pos = positions(layers, graph.len());
    let flows: Vec<(usize, usize, usize, usize)> = graph
        .forward_flows()
        .into_iter()
        .map(|(_, s, t)| (graph.column(s), graph.column(t), pos[s], pos[t]))
        .collect();

    let mut crossings = 0;
    for i in 0..flows.len() {
        for j in (i + 1)..flows.len() {
            let (sc1, tc1, s1, t1) = flows[i];
            let (sc2, tc2, s2, t2) = flows[j];
            if sc1 != sc2 || tc1 != tc2 {
                continue;
            }
            if (s1 < s2 && t1 > t2) || (s1 > s2 && t1 < t2) {
                crossings += 1;
            }
        }
    }
    crossings
}

/// Direction for median calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    /// Look at predecessors (earlier columns)
    Forward,
    /// Look at successors (later columns)
    Backward,
}

/// Median position of each node's neighbours. None when it has none.
pub fn compute_medians(
    layer: &[usize],
    pos: &[usize],
    graph: &FlowGraph,
    direction: SweepDirection,
) -> Vec<Option<f64>> {
    layer
        .iter()
        .map(|&node| {
            let neighbors = match direction {
                SweepDirection::Forward => graph.forward_predecessors(node),
                SweepDirection::Backward => graph.forward_successors(node),
            };
            let mut positions: Vec<usize> = neighbors.iter().map(|&n| pos[n]).collect();
            median(&mut positions)
        })
        .collect()
}

fn median(values: &mut [usize]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid] as f64)
    } else {
        Some((values[mid - 1] + values[mid]) as f64 / 2.0)
    }
}

/// Order a column by lane, then median.
///
/// Nodes without a median go after the ones that have one within their
/// lane cell. Ties keep the current order.
pub fn order_layer_by_median(layer: &mut Vec<usize>, medians: &[Option<f64>], lanes: &[usize]) {
    let mut entries: Vec<(usize, Option<f64>, usize)> = layer
        .iter()
        .enumerate()
        .map(|(i, &node)| (node, medians.get(i).copied().flatten(), i))
        .collect();

    entries.sort_by(|a, b| {
        lanes[a.0].cmp(&lanes[b.0]).then_with(|| match (&a.1, &b.1) {
            (Some(ma), Some(mb)) => ma
                .partial_cmp(mb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.2.cmp(&b.2)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.2.cmp(&b.2),
        })
    });

    *layer = entries.into_iter().map(|(node, _, _)| node).collect();
}

/// Apply alternating median sweeps to reduce crossings.
///
/// Runs at most `passes` sweeps (forward first) and stops once a forward
/// and a backward sweep in a row leave the order unchanged. The ordering
/// with the fewest crossings seen is kept. Returns its crossing count.
pub fn order_rows(
    graph: &FlowGraph,
    lanes: &[usize],
    layers: &mut Vec<Vec<usize>>,
    passes: usize,
) -> usize {
    let span = span!(Level::DEBUG, "order_rows", column_count = layers.len(), passes);
    let _enter = span.enter();

    if layers.len() < 2 {
        return 0;
    }

    let mut best_layers = layers.clone();
    let mut best_cc = cross_count(layers, graph);
    let mut unchanged = 0;

    for pass in 0..passes {
        let before = layers.clone();
        let forward = pass % 2 == 0;
        let (indices, direction): (Vec<usize>, SweepDirection) = if forward {
            ((1..layers.len()).collect(), SweepDirection::Forward)
        } else {
            ((0..layers.len() - 1).rev().collect(), SweepDirection::Backward)
        };

        for index in indices {
            let pos = positions(layers, graph.len());
            let medians = compute_medians(&layers[index], &pos, graph, direction);
            order_layer_by_median(&mut layers[index], &medians, lanes);
        }

        let cc = cross_count(layers, graph);
        trace!(pass, crossings = cc, "Ordering sweep finished");
        if cc < best_cc {
            best_layers = layers.clone();
            best_cc = cc;
        }

        if *layers == before {
            unchanged += 1;
            if unchanged >= 2 {
                debug!(pass, "Row order stabilized");
                break;
            }
        } else {
            unchanged = 0;
        }
    }

    *layers = best_layers;
    debug!(crossings = best_cc, "Rows ordered");
    best_cc
}
