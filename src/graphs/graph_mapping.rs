//! Alignment of a read to a locus graph.
//!
//! A [`GraphMapping`] pairs a [`GraphPath`] with one [`Mapping`] per visited
//! node. The textual form concatenates `<node>[<operations>]` segments, one
//! per visit, e.g. `0[2M]1[3M]1[3M]2[2M]`.

use super::error::{ParseError, Result, ValidationError};
use super::graph::{Graph, NodeId};
use super::mapping::{parse_length, parse_operations, total_len, Mapping};
use super::path::GraphPath;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphMapping<'g> {
    path: GraphPath<'g>,
    mappings: Vec<Mapping>,
    node_indexes: HashMap<NodeId, Vec<usize>>,
}

impl<'g> GraphMapping<'g> {
    pub fn new(
        path: GraphPath<'g>,
        mappings: Vec<Mapping>,
    ) -> std::result::Result<Self, ValidationError> {
        check_consistency(&path, &mappings)?;

        let mut node_indexes: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (index, &node) in path.node_ids().iter().enumerate() {
            node_indexes.entry(node).or_default().push(index);
        }

        Ok(GraphMapping {
            path,
            mappings,
            node_indexes,
        })
    }

    /// Decodes an alignment from its textual form.
    ///
    /// `first_node_start` is the position in the first node where the
    /// alignment starts. The query is consumed from its first base and every
    /// base must be accounted for by the operations.
    pub fn decode(
        first_node_start: usize,
        encoding: &str,
        query: &str,
        graph: &'g Graph,
    ) -> Result<Self> {
        let segments = parse_segments(encoding)?;

        let mut node_ids = Vec::with_capacity(segments.len());
        let mut mappings = Vec::with_capacity(segments.len());
        let mut query_pos = 0;
        for (index, (node, ops_encoding)) in segments.into_iter().enumerate() {
            let node_seq = graph.checked_seq(node)?;
            let ops = parse_operations(ops_encoding)?;
            let query_end = total_len(&ops, |kind| kind.consumes_query())?
                .checked_add(query_pos)
                .ok_or(ParseError::LengthOverflow)?;
            if query_end > query.len() {
                return Err(ParseError::QueryExhausted {
                    needed: query_end,
                    available: query.len(),
                }
                .into());
            }
            let query_bases = query
                .get(query_pos..query_end)
                .ok_or(ParseError::NonAsciiSequence)?;

            let reference_start = if index == 0 { first_node_start } else { 0 };
            mappings.push(Mapping::from_operations(
                reference_start,
                &ops,
                query_bases,
                node_seq,
            )?);
            node_ids.push(node);
            query_pos = query_end;
        }

        if query_pos != query.len() {
            return Err(ParseError::UnconsumedQuery {
                consumed: query_pos,
                query_len: query.len(),
            }
            .into());
        }

        let (Some(&last_node), Some(last_mapping)) = (node_ids.last(), mappings.last()) else {
            return Err(ParseError::Empty.into());
        };
        let end_offset = last_mapping
            .reference_end()
            .checked_sub(1)
            .ok_or(ValidationError::EmptyLastMapping { node: last_node })?;

        let path = GraphPath::new(graph, first_node_start, node_ids, end_offset)?;
        Ok(GraphMapping::new(path, mappings)?)
    }

    pub fn path(&self) -> &GraphPath<'g> {
        &self.path
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Mapping> {
        self.mappings.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Mapping)> + '_ {
        self.path
            .node_ids()
            .iter()
            .copied()
            .zip(self.mappings.iter())
    }

    pub fn num_matches(&self) -> usize {
        self.mappings.iter().map(Mapping::num_matches).sum()
    }

    pub fn query(&self) -> String {
        self.mappings.iter().map(|m| m.query()).collect()
    }

    pub fn reference(&self) -> String {
        self.mappings.iter().map(|m| m.reference()).collect()
    }

    pub fn query_span(&self) -> usize {
        self.mappings.iter().map(Mapping::query_span).sum()
    }

    pub fn reference_span(&self) -> usize {
        self.mappings.iter().map(Mapping::reference_span).sum()
    }

    /// Positions along the path at which `node` is visited, in path order.
    /// Unvisited and unknown nodes give an empty slice.
    pub fn indexes_of_node(&self, node: NodeId) -> &[usize] {
        self.node_indexes
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn overlaps_node(&self, node: NodeId) -> bool {
        self.node_indexes.contains_key(&node)
    }

    pub fn cigar_string(&self) -> String {
        self.to_string()
    }
}

impl Index<usize> for GraphMapping<'_> {
    type Output = Mapping;

    fn index(&self, index: usize) -> &Mapping {
        &self.mappings[index]
    }
}

impl fmt::Display for GraphMapping<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, mapping) in self.iter() {
            write!(f, "{}[{}]", node, mapping)?;
        }
        Ok(())
    }
}

fn check_consistency(
    path: &GraphPath,
    mappings: &[Mapping],
) -> std::result::Result<(), ValidationError> {
    let node_ids = path.node_ids();
    if node_ids.len() != mappings.len() {
        return Err(ValidationError::MappingCountMismatch {
            path_len: node_ids.len(),
            num_mappings: mappings.len(),
        });
    }

    let graph = path.graph();
    let last_index = node_ids.len() - 1;
    for (index, (&node, mapping)) in node_ids.iter().zip(mappings).enumerate() {
        let node_seq = graph.checked_seq(node)?;
        let node_len = node_seq.len();
        let (start, end) = (mapping.reference_start(), mapping.reference_end());

        let anchored = node_seq
            .get(start..end)
            .is_some_and(|bases| bases == mapping.reference());
        if !anchored {
            return Err(ValidationError::NodeSequenceMismatch { index, node });
        }

        if index == 0 {
            if start != path.start_offset() {
                return Err(ValidationError::StartOffsetMismatch {
                    path_start: path.start_offset(),
                    mapping_start: start,
                });
            }
            if last_index != 0 && end != node_len {
                return Err(ValidationError::FirstMappingShort {
                    node,
                    end,
                    node_len,
                });
            }
        }

        if index == last_index {
            if last_index != 0 && start != 0 {
                return Err(ValidationError::LastMappingOffset { node, start });
            }
            if end != path.end_offset() + 1 {
                return Err(ValidationError::EndOffsetMismatch {
                    path_end: path.end_offset(),
                    mapping_end: end,
                });
            }
        }

        if index != 0 && index != last_index && (start != 0 || end != node_len) {
            return Err(ValidationError::InteriorSpanMismatch {
                index,
                node,
                start,
                end,
                node_len,
            });
        }
    }

    Ok(())
}

/// Splits an alignment encoding into `(node, operations)` segments.
fn parse_segments(encoding: &str) -> std::result::Result<Vec<(NodeId, &str)>, ParseError> {
    if encoding.is_empty() {
        return Err(ParseError::Empty);
    }

    let bytes = encoding.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let digits_end = pos + bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits_end == pos {
            return Err(ParseError::MissingNumber {
                pos,
                encoding: encoding.to_string(),
            });
        }
        let node = parse_length(&encoding[pos..digits_end], encoding)?;

        match bytes.get(digits_end) {
            Some(b'[') => {}
            Some(&other) => {
                return Err(ParseError::UnexpectedChar {
                    ch: other as char,
                    pos: digits_end,
                    encoding: encoding.to_string(),
                })
            }
            None => {
                return Err(ParseError::UnterminatedSegment {
                    encoding: encoding.to_string(),
                })
            }
        }

        let ops_start = digits_end + 1;
        let ops_end = bytes[ops_start..]
            .iter()
            .position(|&b| b == b']')
            .map(|offset| ops_start + offset)
            .ok_or_else(|| ParseError::UnterminatedSegment {
                encoding: encoding.to_string(),
            })?;
        if ops_start == ops_end {
            return Err(ParseError::EmptyOperations {
                encoding: encoding.to_string(),
            });
        }

        segments.push((node, &encoding[ops_start..ops_end]));
        pos = ops_end + 1;
    }

    Ok(segments)
}
