//! Error types for evsync

use thiserror::Error;

use crate::types::ScalarKind;

/// evsync error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// An input file could not be opened.
    #[error("Cannot open file '{path}': {reason}")]
    FileOpen {
        /// File path as given by the user.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// The requested tree does not exist in the input file.
    #[error("Tree '{0}' not found.")]
    TreeNotFound(String),

    /// Input file content is malformed.
    #[error("Malformed input: {0}")]
    Format(String),

    /// Branch does not exist in the dataset.
    #[error("Branch '{0}' not found.")]
    BranchNotFound(String),

    /// Branch holds a non-scalar or unsupported scalar type.
    #[error("Branch '{branch}' has unsupported type: {detail}.")]
    UnsupportedColumnType {
        /// Branch name.
        branch: String,
        /// Description of the stored type.
        detail: String,
    },

    /// Exact-type read requested a kind different from the stored one.
    #[error("Branch '{branch}' stores {found} values, but {expected} was requested.")]
    ColumnTypeMismatch {
        /// Branch name.
        branch: String,
        /// Requested kind.
        expected: ScalarKind,
        /// Stored kind.
        found: ScalarKind,
    },

    /// No comparison is defined for this pair of scalar kinds.
    #[error(
        "Unknown branch type combination ({kind_a}, {kind_b}) for branch ('{branch_a}', '{branch_b}')."
    )]
    UnsupportedTypeCombination {
        /// Branch name on side A.
        branch_a: String,
        /// Branch name on side B.
        branch_b: String,
        /// Stored kind on side A.
        kind_a: ScalarKind,
        /// Stored kind on side B.
        kind_b: ScalarKind,
    },

    /// Event id branch list does not hold 3 or 4 names.
    #[error("Invalid event id branches line '{0}'.")]
    InvalidIdColumnSpec(String),

    /// Malformed comparison entry in the config file.
    #[error("Invalid plot entry '{0}'.")]
    InvalidConfigLine(String),

    /// Malformed condition text.
    #[error("Invalid condition '{0}'.")]
    InvalidCondition(String),

    /// Inconsistent command-line arguments.
    #[error("Invalid number of arguments: {0}")]
    InvalidArguments(String),

    /// Pre-selection expression failed to compile or evaluate.
    #[error("Selection expression error: {0}")]
    Expression(String),
}

impl Error {
    /// Whether this error only invalidates a single comparison entry.
    ///
    /// Data errors are recovered by the per-entry loop; everything else aborts the run.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::BranchNotFound(_)
                | Error::UnsupportedColumnType { .. }
                | Error::ColumnTypeMismatch { .. }
                | Error::UnsupportedTypeCombination { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_are_classified() {
        assert!(Error::BranchNotFound("x".into()).is_data_error());
        assert!(
            Error::UnsupportedTypeCombination {
                branch_a: "a".into(),
                branch_b: "b".into(),
                kind_a: ScalarKind::F32,
                kind_b: ScalarKind::U64,
            }
            .is_data_error()
        );
        assert!(!Error::InvalidConfigLine("x".into()).is_data_error());
        assert!(!Error::TreeNotFound("events".into()).is_data_error());
    }

    #[test]
    fn type_combination_message_names_both_sides() {
        let e = Error::UnsupportedTypeCombination {
            branch_a: "pt".into(),
            branch_b: "pt_1".into(),
            kind_a: ScalarKind::F32,
            kind_b: ScalarKind::U64,
        };
        let msg = e.to_string();
        assert!(msg.contains("(f32, u64)"), "{}", msg);
        assert!(msg.contains("('pt', 'pt_1')"), "{}", msg);
    }
}
