use super::graph::NodeId;

/// Structural inconsistency between a graph, a path through it and the
/// per-node alignments along that path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("node {node} is out of range for a graph with {num_nodes} nodes")]
    NodeOutOfRange { node: NodeId, num_nodes: usize },

    #[error("graph has no edge {from}->{to}")]
    MissingEdge { from: NodeId, to: NodeId },

    #[error("path must visit at least one node")]
    EmptyPath,

    #[error("offset {offset} is outside of node {node} of length {node_len}")]
    OffsetOutOfNode {
        node: NodeId,
        offset: usize,
        node_len: usize,
    },

    #[error("start offset {start} is past end offset {end} on single-node path")]
    InvertedOffsets { start: usize, end: usize },

    #[error("path visits {path_len} nodes but {num_mappings} mappings were given")]
    MappingCountMismatch { path_len: usize, num_mappings: usize },

    #[error("mapping {index} does not align to the sequence of node {node}")]
    NodeSequenceMismatch { index: usize, node: NodeId },

    #[error(
        "interior mapping {index} on node {node} spans {start}..{end} but the node has length {node_len}"
    )]
    InteriorSpanMismatch {
        index: usize,
        node: NodeId,
        start: usize,
        end: usize,
        node_len: usize,
    },

    #[error("first mapping starts at {mapping_start} but path starts at {path_start}")]
    StartOffsetMismatch {
        path_start: usize,
        mapping_start: usize,
    },

    #[error("last mapping ends at {mapping_end} but path ends at {path_end}")]
    EndOffsetMismatch { path_end: usize, mapping_end: usize },

    #[error("first mapping on node {node} ends at {end} before the node end {node_len}")]
    FirstMappingShort {
        node: NodeId,
        end: usize,
        node_len: usize,
    },

    #[error("last mapping on node {node} starts at {start} instead of the node start")]
    LastMappingOffset { node: NodeId, start: usize },

    #[error("last mapping on node {node} consumes no reference bases")]
    EmptyLastMapping { node: NodeId },
}

/// Malformed alignment encoding, or an encoding whose consumed lengths do not
/// agree with the supplied sequences.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty encoding")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos} in '{encoding}'")]
    UnexpectedChar {
        ch: char,
        pos: usize,
        encoding: String,
    },

    #[error("expected a number at position {pos} in '{encoding}'")]
    MissingNumber { pos: usize, encoding: String },

    #[error("invalid number '{value}' in '{encoding}'")]
    InvalidNumber { value: String, encoding: String },

    #[error("unterminated segment in '{encoding}'")]
    UnterminatedSegment { encoding: String },

    #[error("segment without operations in '{encoding}'")]
    EmptyOperations { encoding: String },

    #[error("operations consume {needed} query bases but only {available} are available")]
    QueryExhausted { needed: usize, available: usize },

    #[error("operations consume {consumed} query bases but the query has {query_len}")]
    UnconsumedQuery { consumed: usize, query_len: usize },

    #[error("sequences must consist of ASCII bases")]
    NonAsciiSequence,

    #[error("operations reach reference position {end} past the sequence length {reference_len}")]
    ReferenceOverrun { end: usize, reference_len: usize },

    #[error("operation lengths overflow")]
    LengthOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
