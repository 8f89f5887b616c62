use crate::graphs::{make_region_graph, Graph, NodeId, RegionFeature};
use crate::utils::Result;
use std::io::{BufRead, BufReader, Read as ioRead};

const VALID_BASES: &[u8] = b"ACGTN";

#[derive(Debug, Clone, PartialEq)]
pub struct Locus {
    pub id: String,
    pub left_flank: String,
    pub features: Vec<RegionFeature>,
    pub right_flank: String,
    pub struc: String,
}

impl Locus {
    /// Parses a catalog line in the format 'id left_flank struc right_flank'.
    pub fn new(line: &str) -> Result<Self> {
        const EXPECTED_FIELD_COUNT: usize = 4;
        let split_line: Vec<&str> = line.split_whitespace().collect();
        let (id, left_flank, struc, right_flank) = match &split_line[..] {
            [id, left_flank, struc, right_flank] => (*id, *left_flank, *struc, *right_flank),
            _ => {
                return Err(format!(
                    "Expected {} fields in the format 'id left_flank struc right_flank', found {}: {}",
                    EXPECTED_FIELD_COUNT,
                    split_line.len(),
                    line
                ))
            }
        };

        let left_flank = decode_seq(left_flank).map_err(|e| format!("Left flank: {}", e))?;
        let right_flank = decode_seq(right_flank).map_err(|e| format!("Right flank: {}", e))?;
        let features = decode_struc(struc)?;

        Ok(Locus {
            id: id.to_string(),
            left_flank,
            features,
            right_flank,
            struc: struc.to_string(),
        })
    }

    pub fn motifs(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.is_repeat())
            .map(|f| f.seq())
            .collect()
    }

    pub fn graph(&self) -> Result<Graph> {
        make_region_graph(&self.left_flank, &self.features, &self.right_flank)
            .map_err(|e| format!("Unable to build graph for locus {}: {}", self.id, e))
    }
}

/// A locus together with its graph; the graph is shared by every read
/// aligned to the locus.
#[derive(Debug)]
pub struct LocusGraph {
    pub locus: Locus,
    pub graph: Graph,
}

impl LocusGraph {
    pub fn new(locus: Locus) -> Result<Self> {
        let graph = locus.graph()?;
        Ok(LocusGraph { locus, graph })
    }

    pub fn left_flank_node(&self) -> NodeId {
        0
    }

    pub fn right_flank_node(&self) -> NodeId {
        self.graph.num_nodes() - 1
    }

    pub fn repeat_nodes(&self) -> Vec<NodeId> {
        self.locus
            .features
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_repeat())
            .map(|(index, _)| index + 1)
            .collect()
    }
}

pub fn get_loci(
    catalog_reader: BufReader<Box<dyn ioRead>>,
) -> impl Iterator<Item = Result<Locus>> {
    catalog_reader
        .lines()
        .enumerate()
        .filter_map(|(line_number, result_line)| match result_line {
            Ok(line) if is_skippable(&line) => None,
            Ok(line) => Some(
                Locus::new(&line)
                    .map_err(|e| format!("Error at catalog line {}: {}", line_number + 1, e)),
            ),
            Err(e) => Some(Err(format!(
                "Error at catalog line {}: {}",
                line_number + 1,
                e
            ))),
        })
}

fn is_skippable(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// Decodes a locus structure.
///
/// Repeats are written as `(UNIT)n` and anything outside of parentheses is an
/// interruption, e.g. `(CAG)nCAACAG(CCG)n`. A slash-separated list of units
/// such as `CAG/CCG` describes adjacent repeats without interruptions.
pub fn decode_struc(struc: &str) -> Result<Vec<RegionFeature>> {
    if struc.is_empty() {
        return Err("Empty locus structure".to_string());
    }

    if !struc.contains('(') {
        return struc
            .split('/')
            .map(|unit| decode_seq(unit).map(RegionFeature::Repeat))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| format!("Invalid structure '{}': {}", struc, e));
    }

    let error = |reason: &str| format!("Invalid structure '{}': {}", struc, reason);
    let mut features = Vec::new();
    let mut rest = struc;
    while !rest.is_empty() {
        if let Some(after_paren) = rest.strip_prefix('(') {
            let close = after_paren
                .find(')')
                .ok_or_else(|| error("unclosed parenthesis"))?;
            let unit = decode_seq(&after_paren[..close]).map_err(|e| error(e.as_str()))?;
            rest = after_paren[close + 1..]
                .strip_prefix('n')
                .ok_or_else(|| error("repeat unit must be followed by 'n'"))?;
            features.push(RegionFeature::Repeat(unit));
        } else {
            let end = rest.find('(').unwrap_or(rest.len());
            let seq = decode_seq(&rest[..end]).map_err(|e| error(e.as_str()))?;
            features.push(RegionFeature::Interruption(seq));
            rest = &rest[end..];
        }
    }

    Ok(features)
}

fn decode_seq(seq: &str) -> Result<String> {
    if seq.is_empty() {
        return Err("empty sequence".to_string());
    }
    let seq = seq.to_uppercase();
    if let Some(base) = seq.bytes().find(|b| !VALID_BASES.contains(b)) {
        return Err(format!(
            "invalid base '{}' in sequence {}",
            base as char, seq
        ));
    }
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(data: &str) -> BufReader<Box<dyn ioRead>> {
        BufReader::new(Box::new(Cursor::new(data.to_string())))
    }

    #[test]
    fn decode_struc_with_interruptions() {
        assert_eq!(
            decode_struc("(CAG)nCAACAG(CCG)n").unwrap(),
            vec![
                RegionFeature::Repeat("CAG".to_string()),
                RegionFeature::Interruption("CAACAG".to_string()),
                RegionFeature::Repeat("CCG".to_string()),
            ]
        );
    }

    #[test]
    fn decode_struc_with_slash_separated_units() {
        assert_eq!(
            decode_struc("cag/CCG").unwrap(),
            vec![
                RegionFeature::Repeat("CAG".to_string()),
                RegionFeature::Repeat("CCG".to_string()),
            ]
        );
    }

    #[test]
    fn decode_struc_errors() {
        assert_eq!(
            decode_struc("(CAG"),
            Err("Invalid structure '(CAG': unclosed parenthesis".to_string())
        );
        assert_eq!(
            decode_struc("(CAG)CCG"),
            Err("Invalid structure '(CAG)CCG': repeat unit must be followed by 'n'".to_string())
        );
        assert_eq!(
            decode_struc("(CXG)n"),
            Err("Invalid structure '(CXG)n': invalid base 'X' in sequence CXG".to_string())
        );
        assert_eq!(
            decode_struc("()n"),
            Err("Invalid structure '()n': empty sequence".to_string())
        );
        assert!(decode_struc("CAG//CCG").is_err());
        assert!(decode_struc("").is_err());
    }

    #[test]
    fn locus_from_catalog_line() {
        let locus = Locus::new("HTT\tATTG\t(CAG)nCAACAG(CCG)n\tGGCA").unwrap();
        assert_eq!(locus.id, "HTT");
        assert_eq!(locus.left_flank, "ATTG");
        assert_eq!(locus.right_flank, "GGCA");
        assert_eq!(locus.motifs(), vec!["CAG", "CCG"]);
    }

    #[test]
    fn locus_with_wrong_field_count_is_rejected() {
        let result = Locus::new("HTT ATTG (CAG)n");
        assert_eq!(
            result,
            Err("Expected 4 fields in the format 'id left_flank struc right_flank', found 3: HTT ATTG (CAG)n".to_string())
        );
    }

    #[test]
    fn locus_graph_identifies_flanks_and_repeats() {
        let locus = Locus::new("HTT ATTG (CAG)nCAACAG(CCG)n GGCA").unwrap();
        let locus_graph = LocusGraph::new(locus).unwrap();
        assert_eq!(locus_graph.graph.num_nodes(), 5);
        assert_eq!(locus_graph.left_flank_node(), 0);
        assert_eq!(locus_graph.right_flank_node(), 4);
        assert_eq!(locus_graph.repeat_nodes(), vec![1, 3]);
        assert!(locus_graph.graph.has_self_loop(3));
    }

    #[test]
    fn get_loci_skips_comments_and_reports_line_numbers() {
        let data = "# id left struc right\nA ACGT (CA)n TTGA\n\nB ACGT (CA\n";
        let loci: Vec<Result<Locus>> = get_loci(reader(data)).collect();
        assert_eq!(loci.len(), 2);
        assert_eq!(loci[0].as_ref().unwrap().id, "A");
        assert_eq!(
            loci[1],
            Err(
                "Error at catalog line 4: Expected 4 fields in the format 'id left_flank struc right_flank', found 3: B ACGT (CA"
                    .to_string()
            )
        );
    }
}
