//! Group-reference graph: cycle detection and resolution ordering.
//!
//! Group references form a directed graph where an edge `a -> b` means group
//! `a` splices in group `b`'s resources. Resolution requires this graph to be
//! acyclic; a cycle must fail loudly with the offending reference path rather
//! than silently truncating or recursing without bound.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::{BundleError, Result};

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently on the DFS path.
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Directed graph of group-to-group references.
pub struct GroupGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl GroupGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Add a group node if it does not already exist.
    pub fn ensure_group(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// Record that `from` references `to`.
    pub fn add_reference(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_group(from);
        let to_idx = self.ensure_group(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Detect reference cycles.
    ///
    /// Returns [`BundleError::RecursiveGroup`] carrying the reference path
    /// that closes the cycle. The DFS keeps its own explicit stack so a deep
    /// or wide declaration graph cannot overflow the call stack.
    pub fn detect_cycles(&self) -> Result<()> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();

        for start in self.graph.node_indices() {
            if colors[&start] != Color::White {
                continue;
            }
            // frame: (node, outgoing neighbors, cursor into them)
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            colors.insert(start, Color::Gray);
            let neighbors: Vec<_> = self.graph.neighbors(start).collect();
            stack.push((start, neighbors, 0));

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if frame.2 < frame.1.len() {
                    let next = frame.1[frame.2];
                    frame.2 += 1;
                    match colors[&next] {
                        Color::Gray => {
                            // Gray neighbor is on the current path: cycle found
                            let offender = self.graph[next].clone();
                            let mut path: Vec<String> =
                                stack.iter().map(|(n, _, _)| self.graph[*n].clone()).collect();
                            let cycle_start =
                                path.iter().position(|n| *n == offender).unwrap_or(0);
                            path.drain(..cycle_start);
                            path.push(offender.clone());
                            return Err(BundleError::RecursiveGroup {
                                group: offender,
                                path,
                            });
                        }
                        Color::White => {
                            colors.insert(next, Color::Gray);
                            let neighbors: Vec<_> = self.graph.neighbors(next).collect();
                            stack.push((next, neighbors, 0));
                        }
                        Color::Black => {}
                    }
                } else {
                    colors.insert(node, Color::Black);
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    /// Order in which groups can be flattened: referenced groups first.
    ///
    /// Checks for cycles before sorting, so the error carries a reference
    /// path instead of petgraph's bare cycle node.
    pub fn resolution_order(&self) -> Result<Vec<String>> {
        self.detect_cycles()?;
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices.into_iter().rev().map(|idx| self.graph[idx].clone()).collect()),
            // unreachable after detect_cycles, kept as a typed failure
            Err(_) => Err(BundleError::ModelParse {
                reason: "unable to determine group resolution order".to_string(),
            }),
        }
    }

    /// Number of groups in the graph.
    pub fn group_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl Default for GroupGraph {
    fn default() -> Self {
        Self::new()
    }
}
