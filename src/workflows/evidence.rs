//! Per-read and per-locus evidence derived from graph alignments.

use crate::graphs::GraphMapping;
use crate::locus::LocusGraph;
use crate::utils::Result;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader, Read as ioRead};

/// A candidate alignment of one read as reported by the upstream aligner.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub read_id: String,
    pub locus_id: String,
    pub first_node_start: usize,
    pub encoding: String,
    pub seq: String,
}

impl AlignmentRecord {
    /// Parses a line in the format 'read_id locus_id first_node_start encoding seq'.
    pub fn new(line: &str) -> Result<Self> {
        const EXPECTED_FIELD_COUNT: usize = 5;
        let split_line: Vec<&str> = line.split_whitespace().collect();
        let (read_id, locus_id, start, encoding, seq) = match &split_line[..] {
            [read_id, locus_id, start, encoding, seq] => {
                (*read_id, *locus_id, *start, *encoding, *seq)
            }
            _ => {
                return Err(format!(
                    "Expected {} fields in the format 'read_id locus_id start encoding seq', found {}: {}",
                    EXPECTED_FIELD_COUNT,
                    split_line.len(),
                    line
                ))
            }
        };

        let first_node_start = start
            .parse()
            .map_err(|_| format!("Invalid start offset '{}' for read {}", start, read_id))?;

        Ok(AlignmentRecord {
            read_id: read_id.to_string(),
            locus_id: locus_id.to_string(),
            first_node_start,
            encoding: encoding.to_string(),
            seq: seq.to_uppercase(),
        })
    }
}

/// Reads alignment records, skipping blank lines and `#` comments.
pub fn get_alignments(
    alignments_reader: BufReader<Box<dyn ioRead>>,
) -> impl Iterator<Item = Result<AlignmentRecord>> {
    alignments_reader
        .lines()
        .enumerate()
        .filter_map(|(line_number, result_line)| match result_line {
            Ok(line) if line.trim().is_empty() || line.starts_with('#') => None,
            Ok(line) => Some(
                AlignmentRecord::new(&line)
                    .map_err(|e| format!("Error at alignment line {}: {}", line_number + 1, e)),
            ),
            Err(e) => Some(Err(format!(
                "Error at alignment line {}: {}",
                line_number + 1,
                e
            ))),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadClass {
    /// Read overlaps both flanks.
    Spanning,
    /// Read overlaps exactly one flank.
    Flanking,
    /// Read lies entirely between the flanks.
    InRepeat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadEvidence {
    pub class: ReadClass,
    /// Number of visits to each repeat node of the locus, in node order.
    pub repeat_visits: Vec<usize>,
    pub num_matches: usize,
    pub query_span: usize,
    pub reference_span: usize,
}

impl ReadEvidence {
    pub fn from_mapping(locus_graph: &LocusGraph, mapping: &GraphMapping) -> Self {
        let overlaps_left = mapping.overlaps_node(locus_graph.left_flank_node());
        let overlaps_right = mapping.overlaps_node(locus_graph.right_flank_node());
        let class = match (overlaps_left, overlaps_right) {
            (true, true) => ReadClass::Spanning,
            (true, false) | (false, true) => ReadClass::Flanking,
            (false, false) => ReadClass::InRepeat,
        };

        let repeat_visits = locus_graph
            .repeat_nodes()
            .into_iter()
            .map(|node| mapping.indexes_of_node(node).len())
            .collect();

        ReadEvidence {
            class,
            repeat_visits,
            num_matches: mapping.num_matches(),
            query_span: mapping.query_span(),
            reference_span: mapping.reference_span(),
        }
    }
}

/// Read evidence accumulated over a locus.
///
/// Merging is associative and commutative, so partial results from worker
/// threads can be combined in any order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocusEvidence {
    pub num_spanning: usize,
    pub num_flanking: usize,
    pub num_inrepeat: usize,
    pub num_rejected: usize,
    pub num_matches: usize,
    /// Per repeat node, the number of spanning reads visiting it a given number of times.
    pub repeat_copies: Vec<BTreeMap<usize, usize>>,
}

impl LocusEvidence {
    pub fn new(num_repeats: usize) -> Self {
        LocusEvidence {
            repeat_copies: vec![BTreeMap::new(); num_repeats],
            ..Default::default()
        }
    }

    pub fn num_reads(&self) -> usize {
        self.num_spanning + self.num_flanking + self.num_inrepeat
    }

    pub fn add(&mut self, read: &ReadEvidence) {
        match read.class {
            ReadClass::Spanning => {
                self.num_spanning += 1;
                if self.repeat_copies.len() < read.repeat_visits.len() {
                    self.repeat_copies
                        .resize_with(read.repeat_visits.len(), BTreeMap::new);
                }
                for (hist, &copies) in self.repeat_copies.iter_mut().zip(&read.repeat_visits) {
                    *hist.entry(copies).or_insert(0) += 1;
                }
            }
            ReadClass::Flanking => self.num_flanking += 1,
            ReadClass::InRepeat => self.num_inrepeat += 1,
        }
        self.num_matches += read.num_matches;
    }

    pub fn reject(&mut self) {
        self.num_rejected += 1;
    }

    pub fn merge(mut self, other: LocusEvidence) -> LocusEvidence {
        self.num_spanning += other.num_spanning;
        self.num_flanking += other.num_flanking;
        self.num_inrepeat += other.num_inrepeat;
        self.num_rejected += other.num_rejected;
        self.num_matches += other.num_matches;
        if self.repeat_copies.len() < other.repeat_copies.len() {
            self.repeat_copies
                .resize_with(other.repeat_copies.len(), BTreeMap::new);
        }
        for (hist, other_hist) in self.repeat_copies.iter_mut().zip(other.repeat_copies) {
            for (copies, count) in other_hist {
                *hist.entry(copies).or_insert(0) += count;
            }
        }
        self
    }
}

impl fmt::Display for LocusEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let copies = if self.repeat_copies.is_empty() {
            ".".to_string()
        } else {
            self.repeat_copies
                .iter()
                .map(|hist| {
                    if hist.is_empty() {
                        ".".to_string()
                    } else {
                        hist.iter()
                            .map(|(copies, count)| format!("{}:{}", copies, count))
                            .join(",")
                    }
                })
                .join("/")
        };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.num_spanning,
            self.num_flanking,
            self.num_inrepeat,
            self.num_rejected,
            self.num_matches,
            copies
        )
    }
}

/// Decodes a candidate alignment against its locus and summarizes it.
pub fn analyze_alignment(
    locus_graph: &LocusGraph,
    record: &AlignmentRecord,
) -> Result<ReadEvidence> {
    let mapping = GraphMapping::decode(
        record.first_node_start,
        &record.encoding,
        &record.seq,
        &locus_graph.graph,
    )
    .map_err(|e| format!("Read {}: {}", record.read_id, e))?;
    log::trace!(
        "{}: read {} aligned along {}",
        locus_graph.locus.id,
        record.read_id,
        mapping.path()
    );
    Ok(ReadEvidence::from_mapping(locus_graph, &mapping))
}

/// Adds an alignment to the evidence of its locus; alignments that fail to
/// decode are counted as rejected.
pub fn accumulate(
    evidence: &mut BTreeMap<String, LocusEvidence>,
    locus_graph: &LocusGraph,
    record: &AlignmentRecord,
) {
    let locus_evidence = evidence
        .entry(locus_graph.locus.id.clone())
        .or_insert_with(|| LocusEvidence::new(locus_graph.repeat_nodes().len()));
    match analyze_alignment(locus_graph, record) {
        Ok(read) => locus_evidence.add(&read),
        Err(err) => {
            log::debug!("{}: rejected alignment: {}", locus_graph.locus.id, err);
            locus_evidence.reject();
        }
    }
}

pub fn merge_evidence(
    mut lhs: BTreeMap<String, LocusEvidence>,
    rhs: BTreeMap<String, LocusEvidence>,
) -> BTreeMap<String, LocusEvidence> {
    for (locus_id, evidence) in rhs {
        let merged = match lhs.remove(&locus_id) {
            Some(existing) => existing.merge(evidence),
            None => evidence,
        };
        lhs.insert(locus_id, merged);
    }
    lhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locus::Locus;

    fn htt() -> LocusGraph {
        LocusGraph::new(Locus::new("HTT AAAACC (CCG)n ATTT").unwrap()).unwrap()
    }

    fn record(start: usize, encoding: &str, seq: &str) -> AlignmentRecord {
        AlignmentRecord {
            read_id: "read".to_string(),
            locus_id: "HTT".to_string(),
            first_node_start: start,
            encoding: encoding.to_string(),
            seq: seq.to_string(),
        }
    }

    #[test]
    fn alignment_record_from_line() {
        let record = AlignmentRecord::new("r1\tHTT\t4\t0[2M]1[3M]\tccccg").unwrap();
        assert_eq!(record.read_id, "r1");
        assert_eq!(record.locus_id, "HTT");
        assert_eq!(record.first_node_start, 4);
        assert_eq!(record.encoding, "0[2M]1[3M]");
        assert_eq!(record.seq, "CCCCG");
    }

    #[test]
    fn alignment_record_errors() {
        assert!(AlignmentRecord::new("r1 HTT 4 0[2M]").is_err());
        assert_eq!(
            AlignmentRecord::new("r1 HTT x 0[2M] CC"),
            Err("Invalid start offset 'x' for read r1".to_string())
        );
    }

    #[test]
    fn get_alignments_skips_comments() {
        use std::io::Cursor;
        let data = "#read locus start encoding seq\nr1 HTT 4 0[2M]1[3M] CCCCG\n\nr2 HTT\n";
        let reader: BufReader<Box<dyn ioRead>> =
            BufReader::new(Box::new(Cursor::new(data.to_string())));
        let records: Vec<Result<AlignmentRecord>> = get_alignments(reader).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref().unwrap().read_id, "r1");
        assert!(records[1]
            .as_ref()
            .unwrap_err()
            .starts_with("Error at alignment line 4: Expected 5 fields"));
    }

    #[test]
    fn spanning_read_counts_repeat_copies() {
        let read = analyze_alignment(&htt(), &record(4, "0[2M]1[3M]1[3M]2[2M]", "CCCCGCCGAT"))
            .unwrap();
        assert_eq!(read.class, ReadClass::Spanning);
        assert_eq!(read.repeat_visits, vec![2]);
        assert_eq!(read.num_matches, 10);
        assert_eq!(read.query_span, 10);
    }

    #[test]
    fn flanking_and_inrepeat_reads_are_classified() {
        let locus_graph = htt();
        let flanking = analyze_alignment(&locus_graph, &record(3, "0[3M]1[3M]", "ACCCCG")).unwrap();
        assert_eq!(flanking.class, ReadClass::Flanking);

        let inrepeat =
            analyze_alignment(&locus_graph, &record(0, "1[3M]1[3M]1[2M]", "CCGCCGCC")).unwrap();
        assert_eq!(inrepeat.class, ReadClass::InRepeat);
        assert_eq!(inrepeat.repeat_visits, vec![3]);
    }

    #[test]
    fn undecodable_alignment_is_rejected() {
        let locus_graph = htt();
        let mut evidence = BTreeMap::new();
        accumulate(&mut evidence, &locus_graph, &record(0, "0[4M", "AAAA"));
        accumulate(
            &mut evidence,
            &locus_graph,
            &record(0, "0[18446744073709551615S1S]", "A"),
        );
        accumulate(&mut evidence, &locus_graph, &record(3, "0[3M]1[3M]", "ACCCCG"));
        let htt_evidence = &evidence["HTT"];
        assert_eq!(htt_evidence.num_rejected, 2);
        assert_eq!(htt_evidence.num_flanking, 1);
        assert_eq!(htt_evidence.num_reads(), 1);
    }

    #[test]
    fn merge_is_order_independent() {
        let locus_graph = htt();
        let records = [
            record(4, "0[2M]1[3M]1[3M]2[2M]", "CCCCGCCGAT"),
            record(4, "0[2M]1[3M]2[2M]", "CCCCGAT"),
            record(3, "0[3M]1[3M]", "ACCCCG"),
            record(4, "0[2M]1[3M]1[3M]2[2M]", "CCCCGCCGAT"),
            record(0, "bad", "A"),
        ];

        let partials: Vec<BTreeMap<String, LocusEvidence>> = records
            .iter()
            .map(|r| {
                let mut evidence = BTreeMap::new();
                accumulate(&mut evidence, &locus_graph, r);
                evidence
            })
            .collect();

        let forward = partials
            .iter()
            .cloned()
            .fold(BTreeMap::new(), merge_evidence);
        let backward = partials
            .iter()
            .rev()
            .cloned()
            .fold(BTreeMap::new(), merge_evidence);
        assert_eq!(forward, backward);

        let htt_evidence = &forward["HTT"];
        assert_eq!(htt_evidence.num_spanning, 3);
        assert_eq!(htt_evidence.num_flanking, 1);
        assert_eq!(htt_evidence.num_rejected, 1);
        assert_eq!(
            htt_evidence.repeat_copies,
            vec![BTreeMap::from([(1, 1), (2, 2)])]
        );
        assert_eq!(htt_evidence.to_string(), "3\t1\t0\t1\t33\t1:1,2:2");
    }

    #[test]
    fn empty_evidence_is_displayed_with_placeholders() {
        assert_eq!(LocusEvidence::default().to_string(), "0\t0\t0\t0\t0\t.");
        assert_eq!(LocusEvidence::new(2).to_string(), "0\t0\t0\t0\t0\t./.");
    }
}
