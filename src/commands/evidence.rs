use crate::cli::EvidenceArgs;
use crate::locus::{get_loci, LocusGraph};
use crate::utils::{create_writer, open_file_writer, open_text_reader, Result};
use crate::workflows::{
    accumulate, get_alignments, merge_evidence, AlignmentRecord, LocusEvidence,
};
use crossbeam_channel::{bounded, Sender};
use rayon::{
    iter::{ParallelBridge, ParallelIterator},
    ThreadPoolBuilder,
};
use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

const CHANNEL_BUFFER_SIZE: usize = 2048;
const EVIDENCE_HEADER: &str =
    "#LOCUS_ID\tSPANNING\tFLANKING\tINREPEAT\tREJECTED\tMATCHES\tREPEAT_COPIES";

/// Locus graphs in catalog order, indexed by locus id.
struct Catalog {
    locus_graphs: Vec<LocusGraph>,
    index: HashMap<String, usize>,
}

impl Catalog {
    fn new(locus_graphs: Vec<LocusGraph>) -> Result<Self> {
        let mut index = HashMap::with_capacity(locus_graphs.len());
        for (i, locus_graph) in locus_graphs.iter().enumerate() {
            if index.insert(locus_graph.locus.id.clone(), i).is_some() {
                return Err(format!("Duplicate locus id: {}", locus_graph.locus.id));
            }
        }
        Ok(Catalog {
            locus_graphs,
            index,
        })
    }

    fn get(&self, locus_id: &str) -> Option<&LocusGraph> {
        self.index.get(locus_id).map(|&i| &self.locus_graphs[i])
    }
}

#[derive(Debug, Default)]
struct SkippedRecords {
    unknown_locus: AtomicUsize,
    malformed: AtomicUsize,
}

pub fn evidence(args: EvidenceArgs) -> Result<()> {
    let catalog = load_catalog(&args.repeats_path)?;
    log::info!("Loaded {} loci", catalog.locus_graphs.len());

    let mut writer = create_writer(&args.output_prefix, "evidence.tsv", open_file_writer)?;

    let (sender_record, receiver_record) = bounded(CHANNEL_BUFFER_SIZE);
    let alignments_path = args.alignments_path.clone();
    let record_stream_thread =
        thread::spawn(move || stream_alignments_into_channel(&alignments_path, sender_record));

    log::debug!(
        "Initializing thread pool with {} threads...",
        args.num_threads
    );
    let pool = initialize_thread_pool(args.num_threads)?;
    let skipped = SkippedRecords::default();
    let evidence =
        pool.install(|| collect_evidence(&catalog, receiver_record.into_iter(), &skipped));

    match record_stream_thread.join() {
        Ok(Ok(())) => log::trace!("Alignment stream thread finished"),
        Ok(Err(e)) => return Err(format!("Alignment streaming failed: {}", e)),
        Err(_) => return Err("Alignment stream thread panicked".to_string()),
    }

    report_skipped(&skipped);
    write_evidence(&mut writer, &catalog, &evidence)?;
    writer
        .flush()
        .map_err(|e| format!("Failed to flush evidence output: {}", e))?;

    let num_reads: usize = evidence.values().map(LocusEvidence::num_reads).sum();
    log::info!(
        "Summarized {} reads across {} loci",
        num_reads,
        evidence.len()
    );
    Ok(())
}

fn load_catalog(repeats_path: &Path) -> Result<Catalog> {
    let catalog_reader = open_text_reader(repeats_path)?;
    let mut locus_graphs = Vec::new();
    for result in get_loci(catalog_reader) {
        match result.and_then(LocusGraph::new) {
            Ok(locus_graph) => locus_graphs.push(locus_graph),
            Err(e) => log::error!("{}", e),
        }
    }
    if locus_graphs.is_empty() {
        return Err(format!("No valid loci in {}", repeats_path.display()));
    }
    Catalog::new(locus_graphs)
}

fn stream_alignments_into_channel(
    alignments_path: &Path,
    sender: Sender<Result<AlignmentRecord>>,
) -> Result<()> {
    let alignments_reader = open_text_reader(alignments_path)?;
    for record in get_alignments(alignments_reader) {
        sender
            .send(record)
            .map_err(|e| format!("Failed to send alignment through channel: {}", e))?;
    }
    Ok(())
}

fn collect_evidence<I>(
    catalog: &Catalog,
    records: I,
    skipped: &SkippedRecords,
) -> BTreeMap<String, LocusEvidence>
where
    I: Iterator<Item = Result<AlignmentRecord>> + Send,
{
    records
        .par_bridge()
        .fold(BTreeMap::new, |mut evidence, record| {
            match record {
                Ok(record) => match catalog.get(&record.locus_id) {
                    Some(locus_graph) => accumulate(&mut evidence, locus_graph, &record),
                    None => {
                        log::debug!(
                            "Read {} refers to unknown locus {}",
                            record.read_id,
                            record.locus_id
                        );
                        skipped.unknown_locus.fetch_add(1, Ordering::Relaxed);
                    }
                },
                Err(err) => {
                    log::debug!("{}", err);
                    skipped.malformed.fetch_add(1, Ordering::Relaxed);
                }
            }
            evidence
        })
        .reduce(BTreeMap::new, merge_evidence)
}

fn report_skipped(skipped: &SkippedRecords) {
    let unknown_locus = skipped.unknown_locus.load(Ordering::Relaxed);
    if unknown_locus > 0 {
        log::warn!(
            "Skipped {} alignments to loci missing from the catalog",
            unknown_locus
        );
    }
    let malformed = skipped.malformed.load(Ordering::Relaxed);
    if malformed > 0 {
        log::warn!("Skipped {} malformed alignment lines", malformed);
    }
}

fn write_evidence<W: Write>(
    writer: &mut W,
    catalog: &Catalog,
    evidence: &BTreeMap<String, LocusEvidence>,
) -> Result<()> {
    let write_error = |e: std::io::Error| format!("Failed to write evidence: {}", e);
    writeln!(writer, "{}", EVIDENCE_HEADER).map_err(write_error)?;
    for locus_graph in &catalog.locus_graphs {
        let id = &locus_graph.locus.id;
        let row = match evidence.get(id) {
            Some(locus_evidence) => writeln!(writer, "{}\t{}", id, locus_evidence),
            None => writeln!(
                writer,
                "{}\t{}",
                id,
                LocusEvidence::new(locus_graph.repeat_nodes().len())
            ),
        };
        row.map_err(write_error)?;
    }
    Ok(())
}

fn initialize_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("strgraph-{}", i))
        .start_handler(|_thread_index| {
            log::trace!("Initialized thread {:?}", std::thread::current().id());
        })
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locus::Locus;

    fn catalog() -> Catalog {
        let locus_graphs = ["HTT AAAACC (CCG)n ATTT", "FMR1 GCGG (CGG)n CTGG"]
            .iter()
            .map(|line| LocusGraph::new(Locus::new(line).unwrap()).unwrap())
            .collect();
        Catalog::new(locus_graphs).unwrap()
    }

    fn records(lines: &[&str]) -> Vec<Result<AlignmentRecord>> {
        lines.iter().map(|line| AlignmentRecord::new(line)).collect()
    }

    #[test]
    fn duplicate_locus_ids_are_rejected() {
        let locus_graphs = ["HTT AAAACC (CCG)n ATTT", "HTT GCGG (CGG)n CTGG"]
            .iter()
            .map(|line| LocusGraph::new(Locus::new(line).unwrap()).unwrap())
            .collect();
        assert!(matches!(
            Catalog::new(locus_graphs),
            Err(e) if e == "Duplicate locus id: HTT"
        ));
    }

    #[test]
    fn evidence_is_collected_per_locus() {
        let catalog = catalog();
        let skipped = SkippedRecords::default();
        let records = records(&[
            "r1 HTT 4 0[2M]1[3M]1[3M]2[2M] CCCCGCCGAT",
            "r2 HTT 3 0[3M]1[3M] ACCCCG",
            "r3 UNKNOWN 0 0[1M] A",
            "r4 HTT 0 0[4M ACCC",
            "r5 HTT",
        ]);
        let evidence = collect_evidence(&catalog, records.into_iter(), &skipped);

        assert_eq!(evidence.len(), 1);
        let htt = &evidence["HTT"];
        assert_eq!(htt.num_spanning, 1);
        assert_eq!(htt.num_flanking, 1);
        assert_eq!(htt.num_rejected, 1);
        assert_eq!(skipped.unknown_locus.load(Ordering::Relaxed), 1);
        assert_eq!(skipped.malformed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn evidence_rows_follow_catalog_order() {
        let catalog = catalog();
        let skipped = SkippedRecords::default();
        let records = records(&["r1 HTT 4 0[2M]1[3M]1[3M]2[2M] CCCCGCCGAT"]);
        let evidence = collect_evidence(&catalog, records.into_iter(), &skipped);

        let mut output = Vec::new();
        write_evidence(&mut output, &catalog, &evidence).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            format!(
                "{}\nHTT\t1\t0\t0\t0\t10\t2:1\nFMR1\t0\t0\t0\t0\t0\t.\n",
                EVIDENCE_HEADER
            )
        );
    }

    #[test]
    fn evidence_command_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("catalog.txt");
        std::fs::write(
            &catalog_path,
            "HTT AAAACC (CCG)n ATTT\nFMR1 GCGG (CGG)n CTGG\n",
        )
        .unwrap();
        let alignments_path = dir.path().join("alignments.tsv");
        std::fs::write(
            &alignments_path,
            "r1\tHTT\t4\t0[2M]1[3M]1[3M]2[2M]\tCCCCGCCGAT\n\
             r2\tHTT\t3\t0[3M]1[3M]\tACCCCG\n\
             r3\tUNKNOWN\t0\t0[1M]\tA\n\
             r4\tHTT\t0\tbad\tA\n",
        )
        .unwrap();
        let output_prefix = dir.path().join("sample").to_string_lossy().to_string();

        let args = EvidenceArgs {
            repeats_path: catalog_path,
            alignments_path,
            output_prefix: output_prefix.clone(),
            num_threads: 2,
        };
        evidence(args).unwrap();

        let output = std::fs::read_to_string(format!("{}.evidence.tsv", output_prefix)).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                EVIDENCE_HEADER,
                "HTT\t1\t1\t0\t1\t16\t2:1",
                "FMR1\t0\t0\t0\t0\t0\t.",
            ]
        );
    }
}
