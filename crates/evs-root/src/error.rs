//! Error type for ROOT file reading.

use thiserror::Error;

/// Errors raised while reading ROOT files or compiling selections.
#[derive(Error, Debug)]
pub enum RootError {
    /// I/O failure while opening or mapping the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the `root` magic.
    #[error("not a ROOT file (bad magic)")]
    BadMagic,

    /// Read past the end of a buffer.
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Read position.
        offset: usize,
        /// Bytes requested.
        need: usize,
        /// Bytes available.
        have: usize,
    },

    /// Compressed block could not be inflated.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Streamer data does not match the expected layout.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Directory entry not found.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Tree not found (or key is not a TTree).
    #[error("tree not found: {0}")]
    TreeNotFound(String),

    /// Branch not found in the tree.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Branch exists but is not a flat scalar branch we can decode.
    #[error("branch '{branch}' is not supported: {reason}")]
    UnsupportedBranch {
        /// Branch name.
        branch: String,
        /// Why it cannot be read.
        reason: String,
    },

    /// Selection expression parse failure.
    #[error("expression error: {0}")]
    Expression(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, RootError>;

impl From<RootError> for evs_core::Error {
    fn from(e: RootError) -> Self {
        match e {
            RootError::Io(io) => evs_core::Error::Io(io),
            RootError::TreeNotFound(name) => evs_core::Error::TreeNotFound(name),
            RootError::BranchNotFound(name) => evs_core::Error::BranchNotFound(name),
            RootError::UnsupportedBranch { branch, reason } => {
                evs_core::Error::UnsupportedColumnType { branch, detail: reason }
            }
            RootError::Expression(msg) => evs_core::Error::Expression(msg),
            other => evs_core::Error::Format(other.to_string()),
        }
    }
}
