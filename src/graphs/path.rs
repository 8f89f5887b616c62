use super::error::ValidationError;
use super::graph::{Graph, NodeId};
use itertools::Itertools;
use std::fmt;

/// A walk through a graph.
///
/// `start_offset` is the position of the first covered base in the first
/// node and `end_offset` is the position of the last covered base in the last
/// node; both bounds are inclusive.
#[derive(Clone)]
pub struct GraphPath<'g> {
    graph: &'g Graph,
    start_offset: usize,
    node_ids: Vec<NodeId>,
    end_offset: usize,
}

impl<'g> GraphPath<'g> {
    pub fn new(
        graph: &'g Graph,
        start_offset: usize,
        node_ids: Vec<NodeId>,
        end_offset: usize,
    ) -> Result<Self, ValidationError> {
        let (first, last) = match (node_ids.first(), node_ids.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(ValidationError::EmptyPath),
        };

        for &node in &node_ids {
            graph.checked_seq(node)?;
        }

        if let Some((from, to)) = node_ids
            .iter()
            .tuple_windows()
            .find(|(from, to)| !graph.has_edge(**from, **to))
        {
            return Err(ValidationError::MissingEdge {
                from: *from,
                to: *to,
            });
        }

        check_offset(graph, first, start_offset)?;
        check_offset(graph, last, end_offset)?;
        if node_ids.len() == 1 && start_offset > end_offset {
            return Err(ValidationError::InvertedOffsets {
                start: start_offset,
                end: end_offset,
            });
        }

        Ok(GraphPath {
            graph,
            start_offset,
            node_ids,
            end_offset,
        })
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn start_offset(&self) -> usize {
        self.start_offset
    }

    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    pub fn num_nodes(&self) -> usize {
        self.node_ids.len()
    }

    pub fn first_node(&self) -> NodeId {
        self.node_ids[0]
    }

    pub fn last_node(&self) -> NodeId {
        self.node_ids[self.node_ids.len() - 1]
    }

    /// Number of graph bases covered by the path.
    pub fn len(&self) -> usize {
        if self.node_ids.len() == 1 {
            return self.end_offset - self.start_offset + 1;
        }
        let node_len = |node: &NodeId| self.graph.nodes()[*node].seq.len();
        let interior: usize = self.node_ids[1..self.node_ids.len() - 1]
            .iter()
            .map(node_len)
            .sum();
        node_len(&self.first_node()) - self.start_offset + interior + self.end_offset + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Concatenated graph sequence covered by the path.
    pub fn seq(&self) -> String {
        let last_index = self.node_ids.len() - 1;
        self.node_ids
            .iter()
            .enumerate()
            .map(|(index, &node)| {
                let seq = self.graph.nodes()[node].seq.as_str();
                let start = if index == 0 { self.start_offset } else { 0 };
                let end = if index == last_index {
                    self.end_offset + 1
                } else {
                    seq.len()
                };
                &seq[start..end]
            })
            .collect()
    }
}

fn check_offset(graph: &Graph, node: NodeId, offset: usize) -> Result<(), ValidationError> {
    let node_len = graph.nodes()[node].seq.len();
    if offset >= node_len {
        return Err(ValidationError::OffsetOutOfNode {
            node,
            offset,
            node_len,
        });
    }
    Ok(())
}

impl PartialEq for GraphPath<'_> {
    fn eq(&self, other: &Self) -> bool {
        (std::ptr::eq(self.graph, other.graph) || self.graph == other.graph)
            && self.start_offset == other.start_offset
            && self.node_ids == other.node_ids
            && self.end_offset == other.end_offset
    }
}

impl Eq for GraphPath<'_> {}

impl fmt::Debug for GraphPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphPath")
            .field("start_offset", &self.start_offset)
            .field("node_ids", &self.node_ids)
            .field("end_offset", &self.end_offset)
            .finish()
    }
}

impl fmt::Display for GraphPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}@{})-{}-({}@{})",
            self.first_node(),
            self.start_offset,
            self.node_ids.iter().join("-"),
            self.last_node(),
            self.end_offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::builders::{make_deletion_graph, make_str_graph};

    #[test]
    fn path_through_all_nodes_has_expected_length() {
        let graph = make_deletion_graph("AAAA", "TTGG", "TTTT").unwrap();
        let path = GraphPath::new(&graph, 3, vec![0, 1, 2], 3).unwrap();
        assert_eq!(path.len(), 9);
        assert_eq!(path.seq(), "ATTGGTTTT");
        assert_eq!(path.node_ids(), &[0, 1, 2]);
    }

    #[test]
    fn single_node_path_covers_inclusive_range() {
        let graph = make_deletion_graph("AAAA", "TTGG", "TTTT").unwrap();
        let path = GraphPath::new(&graph, 2, vec![1], 2).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.seq(), "G");
    }

    #[test]
    fn path_may_loop_on_repeat_unit() {
        let graph = make_str_graph("AAAACC", "CCG", "ATTT").unwrap();
        let path = GraphPath::new(&graph, 4, vec![0, 1, 1, 2], 1).unwrap();
        assert_eq!(path.len(), 10);
        assert_eq!(path.seq(), "CCCCGCCGAT");
        assert_eq!(path.to_string(), "(0@4)-0-1-1-2-(2@1)");
    }

    #[test]
    fn path_without_edge_is_rejected() {
        let graph = make_deletion_graph("AAAA", "TTGG", "TTTT").unwrap();
        assert_eq!(
            GraphPath::new(&graph, 0, vec![0, 1, 1], 0),
            Err(ValidationError::MissingEdge { from: 1, to: 1 })
        );
        assert_eq!(
            GraphPath::new(&graph, 0, vec![2, 0], 0),
            Err(ValidationError::MissingEdge { from: 2, to: 0 })
        );
    }

    #[test]
    fn path_with_unknown_node_is_rejected() {
        let graph = make_deletion_graph("AAAA", "TTGG", "TTTT").unwrap();
        assert_eq!(
            GraphPath::new(&graph, 0, vec![0, 3], 0),
            Err(ValidationError::NodeOutOfRange {
                node: 3,
                num_nodes: 3
            })
        );
    }

    #[test]
    fn path_with_bad_offsets_is_rejected() {
        let graph = make_deletion_graph("AAAA", "TTGG", "TTTT").unwrap();
        assert!(matches!(
            GraphPath::new(&graph, 4, vec![0, 1], 0),
            Err(ValidationError::OffsetOutOfNode { node: 0, offset: 4, .. })
        ));
        assert!(matches!(
            GraphPath::new(&graph, 0, vec![0, 1], 4),
            Err(ValidationError::OffsetOutOfNode { node: 1, offset: 4, .. })
        ));
        assert_eq!(
            GraphPath::new(&graph, 3, vec![1], 1),
            Err(ValidationError::InvertedOffsets { start: 3, end: 1 })
        );
        assert_eq!(
            GraphPath::new(&graph, 0, vec![], 0),
            Err(ValidationError::EmptyPath)
        );
    }

    #[test]
    fn paths_compare_by_value() {
        let graph = make_str_graph("AAAACC", "CCG", "ATTT").unwrap();
        let copy = graph.clone();
        let path = GraphPath::new(&graph, 1, vec![0, 1], 2).unwrap();
        assert_eq!(path, GraphPath::new(&copy, 1, vec![0, 1], 2).unwrap());
        assert_ne!(path, GraphPath::new(&graph, 1, vec![0, 1], 1).unwrap());
    }
}
