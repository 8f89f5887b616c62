use crate::cli::ValidateArgs;
use crate::locus::{get_loci, LocusGraph};
use crate::utils::{open_text_reader, summarize, Result, Stats};
use std::collections::HashSet;
use std::io::{BufReader, Read as ioRead};

#[derive(Debug, Default)]
struct CatalogSummary {
    success_count: usize,
    error_count: usize,
    repeats_per_locus: Vec<usize>,
    motif_lengths: Vec<usize>,
    nodes_per_locus: Vec<usize>,
    edges_per_locus: Vec<usize>,
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let catalog_reader = open_text_reader(&args.repeats_path)?;
    let summary = check_catalog(catalog_reader);

    let total = summary.success_count + summary.error_count;
    if total == 0 {
        return Err(format!(
            "No loci found in {}",
            args.repeats_path.display()
        ));
    }

    log_stats("Repeats per Locus", summarize(&summary.repeats_per_locus));
    log_stats("Motif Lengths", summarize(&summary.motif_lengths));
    log_stats("Nodes per Locus", summarize(&summary.nodes_per_locus));
    log_stats("Edges per Locus", summarize(&summary.edges_per_locus));

    let success_percentage = (summary.success_count as f64 / total as f64) * 100.0;
    let error_percentage = (summary.error_count as f64 / total as f64) * 100.0;
    match summary.error_count {
        0 => log::info!("Validation successful. Loci pass={}", summary.success_count),
        _ => log::info!(
            "Validation failed. Loci pass={} ({:.2}%), fail={} ({:.2}%)",
            summary.success_count,
            success_percentage,
            summary.error_count,
            error_percentage
        ),
    }

    Ok(())
}

fn check_catalog(catalog_reader: BufReader<Box<dyn ioRead>>) -> CatalogSummary {
    let mut summary = CatalogSummary::default();
    let mut seen_ids = HashSet::new();

    for result in get_loci(catalog_reader) {
        let locus_graph = result.and_then(|locus| {
            if !seen_ids.insert(locus.id.clone()) {
                return Err(format!("Duplicate locus id: {}", locus.id));
            }
            LocusGraph::new(locus)
        });
        match locus_graph {
            Ok(locus_graph) => {
                let motifs = locus_graph.locus.motifs();
                log::debug!(
                    "{}: {} with motifs {}",
                    locus_graph.locus.id,
                    locus_graph.locus.struc,
                    motifs.join(",")
                );
                summary
                    .motif_lengths
                    .extend(motifs.iter().map(|motif| motif.len()));
                summary
                    .repeats_per_locus
                    .push(locus_graph.repeat_nodes().len());
                summary.nodes_per_locus.push(locus_graph.graph.num_nodes());
                summary.edges_per_locus.push(locus_graph.graph.num_edges());
                summary.success_count += 1;
            }
            Err(e) => {
                log::error!("{}", e);
                summary.error_count += 1;
            }
        }
    }

    summary
}

fn log_stats(label: &str, stats: Option<Stats>) {
    if let Some(stats) = stats {
        log::info!(
            "{} - Range: [{},{}], Median: {:.2}, Mean: {:.2}, StdDev: {:.2}",
            label,
            stats.min,
            stats.max,
            stats.median,
            stats.mean,
            stats.std_dev
        );
    }
}
