//! Core types for **candidates**, **orthologous-group metadata**, **evaluated
//! primers** and **primer pairs**.
//!
//! Everything here is per-OG and read-only once built; nothing is shared or
//! mutated across OGs, which is what lets [`crate::pipeline`] hand each OG to
//! its own worker without locking.
use core::fmt;

/// One raw candidate emitted by the degenerate-primer miner for one OG.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimerCandidate {
    /// 0-based column on the multiple-sequence alignment.
    pub position: usize,
    /// Uppercase IUPAC string, validated on parse.
    pub sequence: String,
    /// Number of aligned input sequences the candidate matches.
    pub match_count: u64,
    /// Number of literal oligonucleotides the sequence expands to.
    pub degeneracy: u64,
}

/// Per-OG metadata produced upstream.
///
/// The descriptive fields are carried through verbatim; only `total_sequences`
/// takes part in any computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OgMetadata {
    pub og_id: String,
    /// Denominator of the match percentage.
    pub total_sequences: u64,
    pub species_count: String,
    pub percent_single_copy: String,
    pub gene_name: String,
}

/// A candidate that survived filtering, with all derived metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluatedPrimer {
    pub og_id: String,
    pub sequence: String,
    pub position: usize,
    pub match_count: u64,
    pub degeneracy: u64,
    /// `match_count / total_sequences * 100`, 2 dp.
    pub match_percentage: f64,
    /// Margin above the NM threshold, 2 dp. Never negative for a kept primer.
    pub score_percentage_nm: f64,
    pub tm_max: u32,
    pub tm_min: u32,
    pub gc_fraction: f64,
    pub gc_max: f64,
    pub gc_min: f64,
    pub gc_in_last_thirty_percent: usize,
    pub ends_with_t: bool,
    pub self_complementary: bool,
    pub gc_clamp: bool,
}

impl EvaluatedPrimer {
    /// Primer length in symbols.
    pub fn size(&self) -> usize { self.sequence.len() }
}

/// The evaluated primers of a single OG together with its metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct OgPrimers {
    pub og: OgMetadata,
    pub primers: Vec<EvaluatedPrimer>,
}

/// Length of the OG's alignment, as far as it can be determined.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AlignmentLength {
    /// Every aligned sequence has this length.
    Uniform(usize),
    /// Aligned sequences disagree on length.
    Ragged,
    /// No alignment was found for the OG.
    Unknown,
}

impl fmt::Display for AlignmentLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentLength::Uniform(n) => write!(f, "{n}"),
            AlignmentLength::Ragged => f.write_str("Different sizes for sequences"),
            AlignmentLength::Unknown => f.write_str("None"),
        }
    }
}

/// A forward/reverse combination that fits the amplicon window.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimerPair {
    pub forward: EvaluatedPrimer,
    pub reverse: EvaluatedPrimer,
    pub alignment_length: AlignmentLength,
    /// Reverse complement of `reverse.sequence`; the oligo actually ordered.
    pub reverse_complement: String,
    /// Exactly one literal G/C in the last 6 symbols of the reverse complement.
    pub gc_clamp_rc: bool,
    pub gc_last_thirty_percent_rc: usize,
    /// `reverse.position - forward.position - forward.size()`.
    pub amplicon_size: i64,
    pub amplicon_score: f64,
    pub total_score: f64,
}

#[cfg(test)]
mod primer_tests {
    use super::*;

    #[test]
    fn alignment_length_renders_like_the_pair_table_expects() {
        assert_eq!(AlignmentLength::Uniform(1234).to_string(), "1234");
        assert_eq!(AlignmentLength::Ragged.to_string(), "Different sizes for sequences");
        assert_eq!(AlignmentLength::Unknown.to_string(), "None");
    }
}
