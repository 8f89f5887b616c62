use super::error::ValidationError;
use std::collections::HashSet;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub seq: String,
}

/// Directed sequence graph of a single locus.
///
/// Nodes live in a table indexed by their id and adjacency is stored as data,
/// so repeat units are expressed as self-edges rather than cyclic references.
/// A graph is never modified after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: HashSet<(NodeId, NodeId)>,
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl Graph {
    pub fn new<S, E>(seqs: S, edges: E) -> Result<Self, ValidationError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
        E: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let nodes: Vec<Node> = seqs
            .into_iter()
            .enumerate()
            .map(|(id, seq)| Node {
                id,
                seq: seq.into(),
            })
            .collect();

        let num_nodes = nodes.len();
        let mut edge_set = HashSet::new();
        let mut successors = vec![Vec::new(); num_nodes];
        let mut predecessors = vec![Vec::new(); num_nodes];
        for (from, to) in edges {
            for node in [from, to] {
                if node >= num_nodes {
                    return Err(ValidationError::NodeOutOfRange { node, num_nodes });
                }
            }
            if edge_set.insert((from, to)) {
                successors[from].push(to);
                predecessors[to].push(from);
            }
        }
        successors.iter_mut().for_each(|s| s.sort_unstable());
        predecessors.iter_mut().for_each(|p| p.sort_unstable());

        Ok(Graph {
            nodes,
            edges: edge_set,
            successors,
            predecessors,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node)
    }

    pub fn node_seq(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|n| n.seq.as_str())
    }

    /// Sequence of a node that is known to exist, or a range error.
    pub fn checked_seq(&self, node: NodeId) -> Result<&str, ValidationError> {
        self.node_seq(node).ok_or(ValidationError::NodeOutOfRange {
            node,
            num_nodes: self.num_nodes(),
        })
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn has_self_loop(&self, node: NodeId) -> bool {
        self.has_edge(node, node)
    }

    /// Sorted successors of a node; empty for unknown ids.
    pub fn successors(&self, node: NodeId) -> &[NodeId] {
        self.successors.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted predecessors of a node; empty for unknown ids.
    pub fn predecessors(&self, node: NodeId) -> &[NodeId] {
        self.predecessors.get(node).map(Vec::as_slice).unwrap_or(&[])
    }
}
