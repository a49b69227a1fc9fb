#![forbid(unsafe_code)]
//! # degepair
//!
//! Evaluation, filtering and pairing of **degenerate PCR primer** candidates,
//! one **orthologous group** (OG) at a time.
//!
//! The crate sits between a degenerate-primer miner and in-silico PCR: it reads
//! the miner's per-position candidates, scores them under IUPAC degeneracy,
//! drops the ones that fail the configured thresholds and enumerates every
//! forward/reverse pair that yields an amplicon of acceptable size.
//!
//! ## Stages
//! - [`metrics`]: Tm range, GC bounds, 3' properties, match percentage and score
//! - [`pairs`]: amplicon sizing, pair scoring and ranking
//! - [`pipeline`]: per-OG work on a Rayon pool, with per-OG failure isolation
//!
//! ## Examples
//! ```rust
//! use degepair::{evaluate_candidate, Thresholds};
//! use degepair::primer::{OgMetadata, PrimerCandidate};
//!
//! let og = OgMetadata {
//!     og_id: "OG1".into(),
//!     total_sequences: 10,
//!     species_count: "10".into(),
//!     percent_single_copy: "100".into(),
//!     gene_name: "rpoB".into(),
//! };
//! let cand = PrimerCandidate { position: 0, sequence: "ACGTACGTACGTACGTGC".into(), match_count: 9, degeneracy: 1 };
//! let primer = evaluate_candidate(&cand, &og, &Thresholds::default()).unwrap();
//! assert_eq!(primer.score_percentage_nm, 10.0);
//! ```

pub mod config;
pub mod error;
pub mod iupac;
pub mod metrics;
pub mod pairs;
pub mod pipeline;
pub mod primer;
pub mod report;
pub mod tsv;

pub use config::{AmpliconWindow, Thresholds};
pub use metrics::Rejection;
pub use primer::{AlignmentLength, EvaluatedPrimer, OgMetadata, PrimerCandidate, PrimerPair};

/// Score one candidate against `thresholds`; see [`metrics::evaluate`].
pub fn evaluate_candidate(candidate: &PrimerCandidate, og: &OgMetadata, thresholds: &Thresholds) -> Result<EvaluatedPrimer, Rejection> {
    metrics::evaluate(candidate, og, thresholds)
}

/// All pairs of one OG in the size window, best `total_score` first.
pub fn ranked_pairs(primers: &[EvaluatedPrimer], alignment_length: AlignmentLength, window: &AmpliconWindow) -> Vec<PrimerPair> {
    let mut pairs = pairs::select_pairs(primers, alignment_length, window);
    pairs::rank_pairs(&mut pairs);
    pairs
}

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod api_tests {
    use super::*;

    #[test]
    fn empty_og_has_no_pairs() {
        assert!(ranked_pairs(&[], AlignmentLength::Unknown, &AmpliconWindow::default()).is_empty());
    }
}
