//! Column loading with scoped branch activation.
//!
//! Every loader activates exactly the branch it reads and releases it on
//! return, whether the read succeeded or not.

use evs_core::{Column, Error, Result, Scalar};

use crate::dataset::WorkingTree;

/// Load `branch` in its stored kind.
pub fn load_raw(tree: &WorkingTree, branch: &str) -> Result<Column> {
    let guard = tree.activate(branch)?;
    guard.read()
}

/// Load `branch` as exactly `T`; fails when the stored kind differs.
pub fn load_column<T: Scalar>(tree: &WorkingTree, branch: &str) -> Result<Vec<T>> {
    let found = tree.branch_kind(branch)?;
    if found != T::KIND {
        return Err(Error::ColumnTypeMismatch {
            branch: branch.to_string(),
            expected: T::KIND,
            found,
        });
    }
    T::from_column(load_raw(tree, branch)?).map_err(|col| Error::ColumnTypeMismatch {
        branch: branch.to_string(),
        expected: T::KIND,
        found: col.kind(),
    })
}

/// Load `branch` converted into `T` with C-style casts.
pub fn load_column_as<T: Scalar>(tree: &WorkingTree, branch: &str) -> Result<Vec<T>> {
    tree.branch_kind(branch)?;
    Ok(load_raw(tree, branch)?.cast())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryTree;
    use evs_core::{ScalarKind, TreeSource};

    fn tree() -> WorkingTree {
        let source = MemoryTree::new("t")
            .with_branch("run", Column::U32(vec![1, 2, 3]))
            .unwrap()
            .with_branch("pt", Column::F32(vec![1.5, 2.5, 3.5]))
            .unwrap();
        WorkingTree::unfiltered(Box::new(source))
    }

    /// Reports a branch that exists but cannot be decoded.
    struct NestedTree;

    impl TreeSource for NestedTree {
        fn name(&self) -> &str {
            "nested"
        }

        fn entries(&self) -> usize {
            1
        }

        fn branch_names(&self) -> Vec<String> {
            vec!["jets".into()]
        }

        fn branch_kind(&self, branch: &str) -> Result<ScalarKind> {
            Err(Error::UnsupportedColumnType {
                branch: branch.to_string(),
                detail: "vector<float>".into(),
            })
        }

        fn read_branch(&self, branch: &str) -> Result<Column> {
            self.branch_kind(branch).map(Column::empty)
        }
    }

    #[test]
    fn exact_kind_load() {
        let t = tree();
        assert_eq!(load_column::<u32>(&t, "run").unwrap(), vec![1, 2, 3]);
        let err = load_column::<u64>(&t, "run").unwrap_err();
        assert!(
            matches!(
                err,
                Error::ColumnTypeMismatch { expected: ScalarKind::U64, found: ScalarKind::U32, .. }
            ),
            "{}",
            err
        );
        assert!(!t.is_active("run"));
    }

    #[test]
    fn converting_load() {
        let t = tree();
        assert_eq!(load_column_as::<u64>(&t, "run").unwrap(), vec![1, 2, 3]);
        assert_eq!(load_column_as::<i32>(&t, "pt").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn failures_release_activation() {
        let t = tree();
        assert!(matches!(load_raw(&t, "eta"), Err(Error::BranchNotFound(_))));
        assert!(!t.is_active("eta"));

        let nested = WorkingTree::unfiltered(Box::new(NestedTree));
        let err = load_column_as::<f64>(&nested, "jets").unwrap_err();
        assert!(err.is_data_error());
        assert!(!nested.is_active("jets"));
    }
}
