use super::error::ValidationError;
use super::graph::{Graph, NodeId};

/// Part of a locus between its flanks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionFeature {
    /// Repeat unit that may occur any number of times, including zero.
    Repeat(String),
    /// Sequence that occurs exactly once between repeats.
    Interruption(String),
}

impl RegionFeature {
    pub fn seq(&self) -> &str {
        match self {
            RegionFeature::Repeat(seq) | RegionFeature::Interruption(seq) => seq,
        }
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, RegionFeature::Repeat(_))
    }
}

/// Left flank, an optional middle node that can be skipped, right flank.
pub fn make_deletion_graph(
    left_flank: &str,
    middle: &str,
    right_flank: &str,
) -> Result<Graph, ValidationError> {
    Graph::new([left_flank, middle, right_flank], [(0, 1), (0, 2), (1, 2)])
}

/// Left flank, a single self-looping repeat unit, right flank.
pub fn make_str_graph(
    left_flank: &str,
    repeat_unit: &str,
    right_flank: &str,
) -> Result<Graph, ValidationError> {
    Graph::new(
        [left_flank, repeat_unit, right_flank],
        [(0, 1), (0, 2), (1, 1), (1, 2)],
    )
}

/// Builds the graph of a locus with an arbitrary sequence of repeats and
/// interruptions between its flanks.
///
/// Node 0 is the left flank, nodes `1..=features.len()` follow the features in
/// order and the last node is the right flank. Repeat nodes loop onto
/// themselves and can be skipped, so every node links forward through any run
/// of repeat nodes up to and including the next non-repeat node.
pub fn make_region_graph(
    left_flank: &str,
    features: &[RegionFeature],
    right_flank: &str,
) -> Result<Graph, ValidationError> {
    let seqs = std::iter::once(left_flank)
        .chain(features.iter().map(|f| f.seq()))
        .chain(std::iter::once(right_flank));

    let is_repeat = |node: NodeId| {
        (1..=features.len()).contains(&node) && features[node - 1].is_repeat()
    };
    let right_flank_node = features.len() + 1;

    let mut edges = Vec::new();
    for from in 0..right_flank_node {
        if is_repeat(from) {
            edges.push((from, from));
        }
        for to in from + 1..=right_flank_node {
            edges.push((from, to));
            if !is_repeat(to) {
                break;
            }
        }
    }

    Graph::new(seqs, edges)
}
