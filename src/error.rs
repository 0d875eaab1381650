//! Unified error type for trail loading, prediction and the venue boundary.
//!
//! "Nothing found" outcomes (no commute in a trail, a day excluded by
//! validation, no future point in the window) are not errors; they surface as
//! `Option`/empty results. Only I/O, configuration, misuse of the model and the
//! external venue lookup produce a [`TrailError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("cannot build a neighbor model from an empty corpus")]
    EmptyCorpus,

    #[error("corpus point {index} has an invalid position")]
    InvalidPoint { index: usize },

    #[error("index {index} out of range for corpus of {len} points")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("venue lookup failed: {0}")]
    VenueLookup(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TrailError>;

/// Conversions from `Option` into the crate's error type.
pub trait OptionExt<T> {
    /// Map `None` to [`TrailError::EmptyCorpus`].
    fn ok_or_empty_corpus(self) -> Result<T>;

    /// Map `None` to [`TrailError::IndexOutOfRange`].
    fn ok_or_out_of_range(self, index: usize, len: usize) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_empty_corpus(self) -> Result<T> {
        self.ok_or(TrailError::EmptyCorpus)
    }

    fn ok_or_out_of_range(self, index: usize, len: usize) -> Result<T> {
        self.ok_or(TrailError::IndexOutOfRange { index, len })
    }
}

impl From<serde_json::Error> for TrailError {
    fn from(err: serde_json::Error) -> Self {
        TrailError::Config(err.to_string())
    }
}
