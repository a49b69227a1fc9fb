//! Forward/reverse **primer pair** enumeration and scoring for one OG.
//!
//! [`select_pairs`] is a pure function of a single OG's evaluated primers: it
//! keeps no state between calls, so callers aggregate across OGs themselves.
//!
//! ### Scoring
//! - `amplicon_score` grows by one point per [`AMPLICON_SCORE_STEP`] bases
//!   beyond the window minimum.
//! - `total_score` adds it to the *lower* of the two NM scores: a pair captures
//!   no more sequences than its weaker primer.
//!
//! # Examples
//! ```
//! use degepair::config::AmpliconWindow;
//! use degepair::pairs::amplicon_score;
//! let w = AmpliconWindow { min: 20, max: 30 };
//! assert_eq!(amplicon_score(25, &w), 0.23);
//! ```
use std::cmp::Ordering;

use crate::config::AmpliconWindow;
use crate::iupac::{parse_bases, reverse_complement};
use crate::metrics::{gc_in_last_thirty_percent, has_single_gc_clamp, round2};
use crate::primer::{AlignmentLength, EvaluatedPrimer, PrimerPair};

/// Bases of extra amplicon length worth one score point.
pub const AMPLICON_SCORE_STEP: f64 = 22.0;

/// Bases between the 3' end of `forward` and the start of `reverse`.
pub fn amplicon_size(forward: &EvaluatedPrimer, reverse: &EvaluatedPrimer) -> i64 {
    reverse.position as i64 - forward.position as i64 - forward.size() as i64
}

pub fn amplicon_score(size: i64, window: &AmpliconWindow) -> f64 {
    round2((size - window.min) as f64 / AMPLICON_SCORE_STEP)
}

/// Enumerate every position-ordered pair whose amplicon fits `window`.
///
/// Primers are stable-sorted by position first, so equal positions keep their
/// input order. Pairs come out in enumeration order (forward index major).
pub fn select_pairs(
    primers: &[EvaluatedPrimer],
    alignment_length: AlignmentLength,
    window: &AmpliconWindow,
) -> Vec<PrimerPair> {
    let mut sorted: Vec<&EvaluatedPrimer> = primers.iter().collect();
    sorted.sort_by_key(|p| p.position);

    let mut pairs = Vec::new();
    for (i, forward) in sorted.iter().enumerate() {
        for reverse in &sorted[i + 1..] {
            let size = amplicon_size(forward, reverse);
            if !window.contains(size) {
                continue;
            }
            let score = amplicon_score(size, window);
            let weakest = forward.score_percentage_nm.min(reverse.score_percentage_nm);

            let rc = reverse_complement(&reverse.sequence);
            // primers were validated on read; the complement of IUPAC is IUPAC
            let rc_bases = parse_bases(&rc).unwrap_or_default();
            debug_assert_eq!(rc_bases.len(), rc.len(), "non-IUPAC reverse complement {rc:?}");

            pairs.push(PrimerPair {
                forward: (*forward).clone(),
                reverse: (*reverse).clone(),
                alignment_length,
                gc_clamp_rc: has_single_gc_clamp(&rc_bases),
                gc_last_thirty_percent_rc: gc_in_last_thirty_percent(&rc_bases),
                reverse_complement: rc,
                amplicon_size: size,
                amplicon_score: score,
                total_score: round2(weakest + score),
            });
        }
    }
    pairs
}

/// Stable sort by `total_score`, best first.
pub fn rank_pairs(pairs: &mut [PrimerPair]) {
    pairs.sort_by(|a, b| b.total_score.partial_cmp(&a.total_score).unwrap_or(Ordering::Equal));
}
