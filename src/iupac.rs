//! The 15-symbol **IUPAC nucleotide alphabet** used by degenerate primers.
//!
//! Every symbol other than `A`, `C`, `G` and `T` stands for a set of bases that
//! are mixed at synthesis. The metrics in [`crate::metrics`] only need three
//! questions answered per symbol:
//!
//! - can it be a G/C base (*GC-capable*)?
//! - can it be an A/T base (*AT-capable*)?
//! - what fraction of its expansion is G/C (its *GC weight*)?
//!
//! Complementing is delegated to `bio::alphabets::dna`, whose table already
//! covers the ambiguity codes (R↔Y, K↔M, B↔V, D↔H; S, W and N are their own
//! complement).
//!
//! # Examples
//! ```
//! use degepair::iupac::{Base, reverse_complement};
//! assert_eq!(Base::from_byte(b'r'), Some(Base::R));
//! assert_eq!(Base::N.gc_weight(), 0.5);
//! assert_eq!(reverse_complement("AACGR"), "YCGTT");
//! ```
use core::fmt;

use bio::alphabets::dna;

/// One IUPAC nucleotide symbol.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Base { A, C, G, T, R, Y, S, W, K, M, B, D, H, V, N }

impl Base {
    /// All symbols, literal bases first.
    pub const ALL: [Base; 15] = [
        Base::A, Base::C, Base::G, Base::T,
        Base::R, Base::Y, Base::S, Base::W, Base::K, Base::M,
        Base::B, Base::D, Base::H, Base::V, Base::N,
    ];

    /// Parse a symbol, case-insensitively. `U` and gap characters are not accepted.
    pub fn from_byte(b: u8) -> Option<Base> {
        let base = match b.to_ascii_uppercase() {
            b'A' => Base::A,
            b'C' => Base::C,
            b'G' => Base::G,
            b'T' => Base::T,
            b'R' => Base::R,
            b'Y' => Base::Y,
            b'S' => Base::S,
            b'W' => Base::W,
            b'K' => Base::K,
            b'M' => Base::M,
            b'B' => Base::B,
            b'D' => Base::D,
            b'H' => Base::H,
            b'V' => Base::V,
            b'N' => Base::N,
            _ => return None,
        };
        Some(base)
    }

    /// Uppercase ASCII representation.
    pub fn as_byte(self) -> u8 {
        match self {
            Base::A => b'A',
            Base::C => b'C',
            Base::G => b'G',
            Base::T => b'T',
            Base::R => b'R',
            Base::Y => b'Y',
            Base::S => b'S',
            Base::W => b'W',
            Base::K => b'K',
            Base::M => b'M',
            Base::B => b'B',
            Base::D => b'D',
            Base::H => b'H',
            Base::V => b'V',
            Base::N => b'N',
        }
    }

    /// `true` for the four literal bases.
    pub fn is_literal(self) -> bool {
        matches!(self, Base::A | Base::C | Base::G | Base::T)
    }

    /// Symbols whose expansion contains G or C.
    pub fn can_be_gc(self) -> bool {
        !matches!(self, Base::A | Base::T | Base::W)
    }

    /// Symbols whose expansion contains A or T.
    pub fn can_be_at(self) -> bool {
        !matches!(self, Base::C | Base::G | Base::S)
    }

    /// Symbols that are G or C whatever the expansion.
    pub fn is_strict_gc(self) -> bool {
        matches!(self, Base::C | Base::G | Base::S)
    }

    /// Fractional GC membership used for composition statistics.
    ///
    /// The three-digit weights for B/V and D/H are the values the downstream
    /// tables were produced with and are kept as-is.
    pub fn gc_weight(self) -> f64 {
        match self {
            Base::G | Base::C | Base::S => 1.0,
            Base::R | Base::Y | Base::K | Base::M | Base::N => 0.5,
            Base::B | Base::V => 0.667,
            Base::D | Base::H => 0.333,
            Base::A | Base::T | Base::W => 0.0,
        }
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_byte() as char) }
}

/// Parse a whole primer into symbols. Returns the offending byte and its index on failure.
pub fn parse_bases(seq: &str) -> Result<Vec<Base>, (usize, u8)> {
    seq.bytes()
        .enumerate()
        .map(|(i, b)| Base::from_byte(b).ok_or((i, b)))
        .collect()
}

/// IUPAC-aware reverse complement of an (uppercase) primer.
///
/// Callers pass sequences already accepted by [`parse_bases`], so the result is ASCII.
pub fn reverse_complement(seq: &str) -> String {
    debug_assert!(seq.is_ascii(), "reverse complement of non-ASCII primer {seq:?}");
    String::from_utf8(dna::revcomp(seq.as_bytes())).unwrap_or_default()
}

#[cfg(test)]
mod iupac_tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_total_over_alphabet() {
        for b in Base::ALL {
            assert_eq!(Base::from_byte(b.as_byte()), Some(b));
            assert_eq!(Base::from_byte(b.as_byte().to_ascii_lowercase()), Some(b));
        }
        assert_eq!(Base::from_byte(b'U'), None);
        assert_eq!(Base::from_byte(b'-'), None);
        assert_eq!(parse_bases("ACXT"), Err((2, b'X')));
    }

    #[test]
    fn gc_and_at_capable_sets_have_twelve_members() {
        assert_eq!(Base::ALL.iter().filter(|b| b.can_be_gc()).count(), 12);
        assert_eq!(Base::ALL.iter().filter(|b| b.can_be_at()).count(), 12);
        assert_eq!(Base::ALL.iter().filter(|b| b.is_strict_gc()).count(), 3);
        assert_eq!(Base::ALL.iter().filter(|b| b.is_literal()).count(), 4);
    }

    #[test]
    fn complement_pairs_follow_iupac() {
        assert_eq!(reverse_complement("ACGT"), "ACGT");
        assert_eq!(reverse_complement("R"), "Y");
        assert_eq!(reverse_complement("KBD"), "HVM");
        assert_eq!(reverse_complement("SWN"), "NWS");
    }

    #[test]
    fn reverse_complement_is_an_involution() {
        let all: String = Base::ALL.iter().map(|b| b.as_byte() as char).collect();
        assert_eq!(reverse_complement(&reverse_complement(&all)), all);
        for a in Base::ALL {
            for b in Base::ALL {
                let s = format!("{a}{b}");
                assert_eq!(reverse_complement(&reverse_complement(&s)), s);
            }
        }
    }
}
