//! Core traits for evsync
//!
//! The synchronization core reads datasets only through [`TreeSource`], so the
//! native ROOT reader and in-memory trees are interchangeable.

use crate::Result;
use crate::types::{Column, ScalarKind};

/// Read-only tabular dataset: named, typed scalar columns of equal length.
pub trait TreeSource: Send + Sync {
    /// Tree name.
    fn name(&self) -> &str;

    /// Number of rows.
    fn entries(&self) -> usize;

    /// All branch names in storage order.
    fn branch_names(&self) -> Vec<String>;

    /// Stored kind of a branch.
    ///
    /// Fails with `BranchNotFound` for unknown names and with
    /// `UnsupportedColumnType` for composite or non-scalar branches.
    fn branch_kind(&self, branch: &str) -> Result<ScalarKind>;

    /// Read a whole branch in its stored kind.
    fn read_branch(&self, branch: &str) -> Result<Column>;

    /// Whether a branch with this name exists.
    fn has_branch(&self, branch: &str) -> bool {
        self.branch_names().iter().any(|b| b == branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct DummyTree;

    impl TreeSource for DummyTree {
        fn name(&self) -> &str {
            "dummy"
        }

        fn entries(&self) -> usize {
            2
        }

        fn branch_names(&self) -> Vec<String> {
            vec!["x".to_string()]
        }

        fn branch_kind(&self, branch: &str) -> Result<ScalarKind> {
            match branch {
                "x" => Ok(ScalarKind::F64),
                _ => Err(Error::BranchNotFound(branch.to_string())),
            }
        }

        fn read_branch(&self, branch: &str) -> Result<Column> {
            self.branch_kind(branch)?;
            Ok(Column::F64(vec![1.0, 2.0]))
        }
    }

    #[test]
    fn trait_object_dispatch() {
        let tree: Box<dyn TreeSource> = Box::new(DummyTree);
        assert!(tree.has_branch("x"));
        assert!(!tree.has_branch("y"));
        assert_eq!(tree.read_branch("x").unwrap().len(), tree.entries());
        assert!(matches!(tree.read_branch("y"), Err(Error::BranchNotFound(_))));
    }
}
