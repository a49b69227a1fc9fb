//! Quality metrics and threshold filtering for degenerate primer candidates.
//!
//! All metrics are computed from the primer's IUPAC symbols alone; the only
//! OG-level input is the number of sequences in the alignment, which turns the
//! miner's match count into a percentage.
//!
//! ### Melting temperature
//! Tm uses the 2×(A+T) + 4×(G+C) rule. Ambiguity codes make this a range:
//! [`tm_max`] resolves every GC-capable symbol to G/C, [`tm_min`] resolves
//! every AT-capable symbol to A/T.
//!
//! ### Scoring
//! The NM score is the margin by which the match percentage clears the
//! threshold; candidates below the threshold get [`NmScore::UnderThreshold`]
//! and are dropped.
//!
//! # Examples
//! ```
//! use degepair::iupac::parse_bases;
//! use degepair::metrics::{gc_fraction, tm_max, tm_min};
//! let bases = parse_bases("GGCCN").unwrap();
//! assert_eq!(gc_fraction(&bases), 90.0);
//! assert_eq!((tm_min(&bases), tm_max(&bases)), (18, 20));
//! ```
use core::fmt;

use bio::alphabets::dna;

use crate::config::Thresholds;
use crate::iupac::{parse_bases, Base};
use crate::primer::{EvaluatedPrimer, OgMetadata, PrimerCandidate};

/// Number of 3' symbols inspected for a GC clamp.
pub const GC_CLAMP_WINDOW: usize = 5;

/// Round to two decimals on the exact binary value, ties to even
/// (`90.625` -> `90.62`, `2.675` -> `2.67`).
#[inline]
pub fn round2(x: f64) -> f64 { format!("{x:.2}").parse().unwrap_or(x) }

fn percent_of(bases: &[Base], pred: impl Fn(Base) -> bool) -> f64 {
    if bases.is_empty() { return 0.0; }
    let n = bases.iter().filter(|&&b| pred(b)).count();
    round2(n as f64 / bases.len() as f64 * 100.0)
}

/// Tm of the highest-GC literal variant.
pub fn tm_max(bases: &[Base]) -> u32 {
    bases.iter().map(|b| if b.can_be_gc() { 4 } else { 2 }).sum()
}

/// Tm of the lowest-GC literal variant.
pub fn tm_min(bases: &[Base]) -> u32 {
    bases.iter().map(|b| if b.can_be_at() { 2 } else { 4 }).sum()
}

/// Degeneracy-weighted GC percentage.
pub fn gc_fraction(bases: &[Base]) -> f64 {
    if bases.is_empty() { return 0.0; }
    let weight: f64 = bases.iter().map(|b| b.gc_weight()).sum();
    round2(weight / bases.len() as f64 * 100.0)
}

/// Percentage of GC-capable symbols.
pub fn gc_max(bases: &[Base]) -> f64 { percent_of(bases, Base::can_be_gc) }

/// Percentage of symbols that are G/C in every expansion.
pub fn gc_min(bases: &[Base]) -> f64 { percent_of(bases, Base::is_strict_gc) }

/// Literal G/C count in the trailing ⌊30%⌋ of the primer.
///
/// Primers too short for a non-empty window (fewer than 4 symbols) are counted
/// over their whole length.
pub fn gc_in_last_thirty_percent(bases: &[Base]) -> usize {
    let window = (bases.len() as f64 * 0.3) as usize;
    let tail = if window == 0 { bases } else { &bases[bases.len() - window..] };
    tail.iter().filter(|b| matches!(b, Base::G | Base::C)).count()
}

fn tail(bases: &[Base], n: usize) -> &[Base] {
    &bases[bases.len().saturating_sub(n)..]
}

/// Any of the last five symbols is G, C or S.
pub fn has_gc_clamp(bases: &[Base]) -> bool {
    tail(bases, GC_CLAMP_WINDOW).iter().any(|b| b.is_strict_gc())
}

/// Exactly one literal G/C among the last six symbols.
pub fn has_single_gc_clamp(bases: &[Base]) -> bool {
    tail(bases, 6).iter().filter(|b| matches!(b, Base::G | Base::C)).count() == 1
}

pub fn ends_with_t(bases: &[Base]) -> bool { bases.last() == Some(&Base::T) }

/// Sequence equals its own IUPAC reverse complement.
pub fn is_self_complementary(bases: &[Base]) -> bool {
    bases
        .iter()
        .zip(bases.iter().rev())
        .all(|(a, b)| a.as_byte() == dna::complement(b.as_byte()))
}

/// `false` if any of the last `n` symbols is an ambiguity code.
pub fn three_prime_is_literal(bases: &[Base], n: usize) -> bool {
    tail(bases, n).iter().all(|b| b.is_literal())
}

/// Share of the OG's sequences matched by the primer; 0 when the OG is empty.
pub fn match_percentage(match_count: u64, total_sequences: u64) -> f64 {
    if total_sequences == 0 { return 0.0; }
    round2(match_count as f64 / total_sequences as f64 * 100.0)
}

/// Outcome of comparing a match percentage against the NM threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NmScore {
    UnderThreshold,
    Score(f64),
}

/// Margin above the threshold; a percentage exactly at the threshold passes with 0.
pub fn score_percentage_nm(match_percentage: f64, threshold: f64) -> NmScore {
    if match_percentage < threshold {
        NmScore::UnderThreshold
    } else {
        NmScore::Score(round2(match_percentage - threshold))
    }
}

/// Why a candidate was dropped. Checked in declaration order; the first hit wins.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Rejection {
    InvalidSequence,
    UnderThreshold,
    TmMaxAbove,
    TmMinBelow,
    DegenerateThreePrime,
}

impl Rejection {
    pub const ALL: [Rejection; 5] = [
        Rejection::InvalidSequence,
        Rejection::UnderThreshold,
        Rejection::TmMaxAbove,
        Rejection::TmMinBelow,
        Rejection::DegenerateThreePrime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::InvalidSequence => "invalid_sequence",
            Rejection::UnderThreshold => "under_threshold",
            Rejection::TmMaxAbove => "tm_max_above",
            Rejection::TmMinBelow => "tm_min_below",
            Rejection::DegenerateThreePrime => "degenerate_3prime",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Compute every metric for `candidate` and apply `thresholds`.
pub fn evaluate(candidate: &PrimerCandidate, og: &OgMetadata, thresholds: &Thresholds) -> Result<EvaluatedPrimer, Rejection> {
    let bases = match parse_bases(&candidate.sequence) {
        Ok(b) if !b.is_empty() => b,
        _ => return Err(Rejection::InvalidSequence),
    };

    let match_pct = match_percentage(candidate.match_count, og.total_sequences);
    let score = match score_percentage_nm(match_pct, thresholds.nm_threshold) {
        NmScore::UnderThreshold => return Err(Rejection::UnderThreshold),
        NmScore::Score(s) => s,
    };

    let tm_hi = tm_max(&bases);
    let tm_lo = tm_min(&bases);
    if f64::from(tm_hi) > thresholds.tm_max_threshold {
        return Err(Rejection::TmMaxAbove);
    }
    if f64::from(tm_lo) < thresholds.tm_min_threshold {
        return Err(Rejection::TmMinBelow);
    }
    if let Some(n) = thresholds.limiting_degeneracy {
        if !three_prime_is_literal(&bases, n) {
            return Err(Rejection::DegenerateThreePrime);
        }
    }

    Ok(EvaluatedPrimer {
        og_id: og.og_id.clone(),
        sequence: bases.iter().map(|b| b.as_byte() as char).collect(),
        position: candidate.position,
        match_count: candidate.match_count,
        degeneracy: candidate.degeneracy,
        match_percentage: match_pct,
        score_percentage_nm: score,
        tm_max: tm_hi,
        tm_min: tm_lo,
        gc_fraction: gc_fraction(&bases),
        gc_max: gc_max(&bases),
        gc_min: gc_min(&bases),
        gc_in_last_thirty_percent: gc_in_last_thirty_percent(&bases),
        ends_with_t: ends_with_t(&bases),
        self_complementary: is_self_complementary(&bases),
        gc_clamp: has_gc_clamp(&bases),
    })
}
