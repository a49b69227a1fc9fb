//! Error types.
//!
//! [`ConfigError`] is raised once, at startup, before any file is touched.
//! [`RecordError`] describes one malformed input row or file and is scoped to
//! the OG it came from; the pipeline logs it and moves on to the next OG.
//! Everything above these is plain `anyhow::Result`.
use std::path::PathBuf;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("limiting degeneracy must be between 1 and 5, got {0}")]
    LimitingDegeneracy(usize),

    #[error("threshold {name} must be a finite number, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("Tm min threshold ({min}) is above Tm max threshold ({max})")]
    TmRange { min: f64, max: f64 },

    #[error("amplicon minimum size ({min}) is above the maximum size ({max})")]
    AmpliconRange { min: i64, max: i64 },

    #[error("amplicon minimum size must not be negative, got {0}")]
    NegativeAmplicon(i64),
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("line {line}: missing column {column} ({name})")]
    MissingColumn { line: u64, column: usize, name: &'static str },

    #[error("line {line}: column {name} is not a non-negative integer: {value:?}")]
    BadInteger { line: u64, name: &'static str, value: String },

    #[error("line {line}: column {name} is not a number: {value:?}")]
    BadFloat { line: u64, name: &'static str, value: String },

    #[error("line {line}: column {name} is not True/False: {value:?}")]
    BadBool { line: u64, name: &'static str, value: String },

    #[error("line {line}: empty primer sequence")]
    EmptySequence { line: u64 },

    #[error("line {line}: primer {sequence:?} has non-IUPAC symbol {symbol:?} at {index}")]
    InvalidSymbol { line: u64, sequence: String, symbol: char, index: usize },

    #[error("OG {0} is not present in the OG metadata table")]
    UnknownOg(String),

    #[error("cannot derive an OG id from file name {0:?}; expected <prefix>_<OG>.<ext>")]
    OgIdFromPath(PathBuf),
}
