/// Graph model: per-execution view of a workflow definition
///
/// `build_graph` turns persisted nodes and edges into an immutable
/// `WorkflowGraph` used for exactly one run. Construction validates the
/// invariants the runtime relies on (known edge endpoints, unique node ids,
/// acyclicity via petgraph toposort) so the traversal never has to.

use crate::workflow::types::{Edge, Node, NodeType};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use thiserror::Error;

/// Errors detectable from the node/edge lists alone
///
/// These are configuration errors in the sense of the error taxonomy: they
/// are rejected synchronously at graph construction, before a single node
/// executes.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("edge references unknown node: {0}")]
    UnknownNode(String),

    #[error("workflow contains a cycle and cannot be executed")]
    Cycle,
}

/// Read-only view of one workflow's automation definition for a single run
///
/// `adjacency` preserves edge declaration order, which is the child execution
/// order. Duplicate edges are kept: each occurrence produces its own child
/// invocation in the aggregated output. `order` retains node declaration
/// order so "the first trigger node" is well defined.
#[derive(Debug)]
pub struct WorkflowGraph {
    nodes: HashMap<String, Node>,
    adjacency: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

impl WorkflowGraph {
    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Child node ids of `id` in edge declaration order
    pub fn children(&self, id: &str) -> &[String] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first node declared with type `trigger`, if any
    pub fn trigger_node(&self) -> Option<&Node> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .find(|node| node.node_type == NodeType::Trigger)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Build an execution-ready graph from persisted node/edge records
///
/// Pure function, no I/O. Rejects duplicate node ids, edges naming unknown
/// nodes, and cyclic edge sets. Cycle detection runs over a petgraph DiGraph
/// because parallel edges are legal there and must not count as cycles.
pub fn build_graph(nodes: &[Node], edges: &[Edge]) -> Result<WorkflowGraph, GraphError> {
    let mut node_map = HashMap::with_capacity(nodes.len());
    let mut order = Vec::with_capacity(nodes.len());

    let mut digraph: DiGraph<&str, ()> = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::with_capacity(nodes.len());

    for node in nodes {
        if node_map.insert(node.id.clone(), node.clone()).is_some() {
            return Err(GraphError::DuplicateNode(node.id.clone()));
        }
        order.push(node.id.clone());
        indices.insert(node.id.as_str(), digraph.add_node(node.id.as_str()));
    }

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for edge in edges {
        let from = indices
            .get(edge.from.as_str())
            .ok_or_else(|| GraphError::UnknownNode(edge.from.clone()))?;
        let to = indices
            .get(edge.to.as_str())
            .ok_or_else(|| GraphError::UnknownNode(edge.to.clone()))?;

        digraph.add_edge(*from, *to, ());
        adjacency
            .entry(edge.from.clone())
            .or_default()
            .push(edge.to.clone());
    }

    if toposort(&digraph, None).is_err() {
        return Err(GraphError::Cycle);
    }

    tracing::debug!(
        "📊 Built workflow graph: {} nodes, {} edges",
        nodes.len(),
        edges.len()
    );

    Ok(WorkflowGraph {
        nodes: node_map,
        adjacency,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn node(id: &str, node_type: NodeType) -> Node {
        Node {
            id: id.to_string(),
            node_type,
            title: String::new(),
            config: Value::Null,
        }
    }

    fn edge(from: &str, to: &str) -> Edge {
        Edge {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn children_preserve_edge_declaration_order() {
        let nodes = vec![
            node("t", NodeType::Trigger),
            node("b", NodeType::Action),
            node("c", NodeType::Action),
        ];
        let edges = vec![edge("t", "b"), edge("t", "c")];
        let graph = build_graph(&nodes, &edges).unwrap();
        assert_eq!(graph.children("t"), ["b", "c"]);

        let reversed = vec![edge("t", "c"), edge("t", "b")];
        let graph = build_graph(&nodes, &reversed).unwrap();
        assert_eq!(graph.children("t"), ["c", "b"]);
    }

    #[test]
    fn duplicate_edges_are_kept() {
        let nodes = vec![node("t", NodeType::Trigger), node("a", NodeType::Action)];
        let edges = vec![edge("t", "a"), edge("t", "a")];
        let graph = build_graph(&nodes, &edges).unwrap();
        assert_eq!(graph.children("t"), ["a", "a"]);
    }

    #[test]
    fn unknown_edge_endpoint_is_rejected() {
        let nodes = vec![node("t", NodeType::Trigger)];
        let edges = vec![edge("t", "ghost")];
        assert!(matches!(
            build_graph(&nodes, &edges),
            Err(GraphError::UnknownNode(id)) if id == "ghost"
        ));
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let nodes = vec![node("t", NodeType::Trigger), node("t", NodeType::Action)];
        assert!(matches!(
            build_graph(&nodes, &[]),
            Err(GraphError::DuplicateNode(id)) if id == "t"
        ));
    }

    #[test]
    fn cycle_is_rejected_at_construction() {
        let nodes = vec![
            node("t", NodeType::Trigger),
            node("a", NodeType::Action),
            node("b", NodeType::Action),
        ];
        let edges = vec![edge("t", "a"), edge("a", "b"), edge("b", "a")];
        assert!(matches!(build_graph(&nodes, &edges), Err(GraphError::Cycle)));
    }

    #[test]
    fn diamond_with_parallel_paths_is_not_a_cycle() {
        let nodes = vec![
            node("t", NodeType::Trigger),
            node("a", NodeType::Action),
            node("b", NodeType::Action),
            node("join", NodeType::Action),
        ];
        let edges = vec![
            edge("t", "a"),
            edge("t", "b"),
            edge("a", "join"),
            edge("b", "join"),
        ];
        assert!(build_graph(&nodes, &edges).is_ok());
    }

    #[test]
    fn trigger_node_is_first_declared_trigger() {
        let nodes = vec![
            node("a", NodeType::Action),
            node("t1", NodeType::Trigger),
            node("t2", NodeType::Trigger),
        ];
        let graph = build_graph(&nodes, &[]).unwrap();
        assert_eq!(graph.trigger_node().map(|n| n.id.as_str()), Some("t1"));
    }

    #[test]
    fn graph_without_trigger_reports_none() {
        let nodes = vec![node("a", NodeType::Action)];
        let graph = build_graph(&nodes, &[]).unwrap();
        assert!(graph.trigger_node().is_none());
    }
}
