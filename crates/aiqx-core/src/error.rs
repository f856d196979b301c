//! Pipeline and registry error types.
//!
//! Every variant is recoverable by the caller. Operations that return one of
//! these errors leave the workspace untouched.

use thiserror::Error;

/// Which delimiter of the response blob could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    End,
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Marker::Start => write!(f, "start marker `{}`", crate::parser::START_MARKER),
            Marker::End => write!(f, "end marker `{}`", crate::parser::END_MARKER),
        }
    }
}

/// Errors raised by the scoring pipeline and the workspace registry.
#[derive(Debug, Error)]
pub enum AiqError {
    /// The pack document lacks a required field or has the wrong shape.
    #[error("invalid pack format: {0}")]
    InvalidPackFormat(String),

    /// The response blob is missing one of its delimiters.
    #[error("{0} not found in response")]
    MarkerNotFound(Marker),

    /// Analysis was attempted without a usable model/pack/tier selection.
    #[error("no valid selection: {0}")]
    NoValidSelection(String),

    /// Nothing was supplied to analyze.
    #[error("response is empty")]
    EmptyResponse,

    #[error("model not found: {0}")]
    UnknownModel(String),

    #[error("model already exists: {0}")]
    ModelExists(String),

    #[error("model name must not be empty")]
    InvalidModelName,

    #[error("pack not found: {0}")]
    UnknownPack(String),

    /// Only packs from the custom set may be deleted.
    #[error("pack {0} is not a custom pack")]
    PackNotCustom(String),

    #[error("model {model} has no test #{index} (history length {len})")]
    TestIndexOutOfRange {
        model: String,
        index: usize,
        len: usize,
    },

    /// The bulk export document could not be understood.
    #[error("invalid export bundle: {0}")]
    InvalidBundle(String),

    /// The key-value store failed to read or write.
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl AiqError {
    /// Returns `true` for errors that stem from the caller's input rather than
    /// from the store.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, AiqError::Storage(_))
    }
}

pub type Result<T, E = AiqError> = std::result::Result<T, E>;
