mod evidence;
pub use evidence::{
    accumulate, analyze_alignment, get_alignments, merge_evidence, AlignmentRecord,
    LocusEvidence, ReadClass, ReadEvidence,
};
