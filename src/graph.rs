//! Layered policy graph compilation.
//!
//! Turns a policy collection into a multipartite node/edge graph: nodes are
//! aggregated per (field, value) pair, policies that configure nothing in a
//! category get that category's sentinel node, and edges connect each
//! policy's nodes across adjacent category layers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::extraction::extract_field_values;
use crate::policy::Policy;
use crate::taxonomy::{Category, FieldName, Subcategory};

/// One graph node, identified by its (field, value) pair.
///
/// The policy list holds every code that produced this node, each at most
/// once. Category and subcategory are looked up from the taxonomy when the
/// node is created and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: FieldName,
    pub value: String,
    pub policies: Vec<String>,
    pub category: Category,
    pub subcategory: Subcategory,
}

/// One edge between two nodes in adjacent category layers, referencing the
/// nodes by index into [`Graph::nodes`].
///
/// Edges are intentionally not deduplicated: every (policy, node, node)
/// combination yields one edge, so multiplicity carries how many policies
/// share the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub node1: usize,
    pub node2: usize,
}

/// Compiled policy graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Compile a policy collection into a graph, skipping any (field, value)
/// pair whose subcategory is in `ignored_subcategories`.
///
/// Policies without a derivable code are excluded entirely. Every call starts
/// from fresh collections; recomputation is idempotent.
pub fn from_policy_collection(
    policies: &[Policy],
    ignored_subcategories: &[Subcategory],
) -> Graph {
    let mut builder = GraphBuilder::new(ignored_subcategories);

    // Node phase: extracted pairs first, then sentinels for untouched
    // categories, tracking which nodes each policy landed in per layer.
    let mut memberships: Vec<[Vec<usize>; 6]> = Vec::new();
    for policy in policies {
        let Some(code) = policy.code.as_deref() else { continue };

        let mut by_layer: [Vec<usize>; 6] = Default::default();
        for (field, values) in extract_field_values(policy) {
            for value in values {
                if let Some((layer, node)) = builder.upsert(field, value, code) {
                    by_layer[layer].push(node);
                }
            }
        }
        for category in Category::ORDER {
            if by_layer[category.position()].is_empty() {
                let (field, value) = category.sentinel();
                if let Some((layer, node)) = builder.upsert(field, value.to_string(), code) {
                    by_layer[layer].push(node);
                }
            }
        }
        memberships.push(by_layer);
    }

    // Edge phase, after all nodes exist: per policy, connect every node in a
    // layer to every node of the same policy in the next layer.
    let mut edges = Vec::new();
    for by_layer in &memberships {
        for pair in by_layer.windows(2) {
            for &node1 in &pair[0] {
                for &node2 in &pair[1] {
                    edges.push(GraphEdge { node1, node2 });
                }
            }
        }
    }

    Graph {
        nodes: builder.nodes,
        edges,
    }
}

struct GraphBuilder<'a> {
    nodes: Vec<GraphNode>,
    index: HashMap<(FieldName, String), usize>,
    ignored: &'a [Subcategory],
}

impl<'a> GraphBuilder<'a> {
    fn new(ignored: &'a [Subcategory]) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            ignored,
        }
    }

    /// Add or update the node keyed by (field, value) with a policy code.
    ///
    /// Returns the node's layer position and index, or `None` when the
    /// field's subcategory is ignored.
    fn upsert(&mut self, field: FieldName, value: String, code: &str) -> Option<(usize, usize)> {
        let (category, subcategory) = field.taxonomy();
        if self.ignored.contains(&subcategory) {
            return None;
        }

        let id = match self.index.get(&(field, value.clone())) {
            Some(&id) => {
                let node = &mut self.nodes[id];
                if !node.policies.iter().any(|existing| existing == code) {
                    node.policies.push(code.to_string());
                }
                id
            }
            None => {
                let id = self.nodes.len();
                self.nodes.push(GraphNode {
                    name: field,
                    value: value.clone(),
                    policies: vec![code.to_string()],
                    category,
                    subcategory,
                });
                self.index.insert((field, value), id);
                id
            }
        };
        Some((category.position(), id))
    }
}
