//! [`TreeSource`] over a TTree in a ROOT file.

use std::path::Path;

use evs_core::{Column, Error, ScalarKind, TreeSource};

use crate::file::RootFile;
use crate::tree::Tree;

/// One TTree of an open ROOT file.
pub struct RootTree {
    file: RootFile,
    tree: Tree,
}

impl RootTree {
    /// Open `path` and read the tree at `tree_path` (`name` or `dir/name`).
    pub fn open(path: impl AsRef<Path>, tree_path: &str) -> evs_core::Result<Self> {
        let path = path.as_ref();
        let file = RootFile::open(path).map_err(|e| Error::FileOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_file(file, tree_path)
    }

    /// Read the tree at `tree_path` from an already open file.
    pub fn from_file(file: RootFile, tree_path: &str) -> evs_core::Result<Self> {
        let tree = file.get_tree(tree_path)?;
        log::debug!(
            "tree '{}' in {}: {} entries, {} branches",
            tree.name,
            file.path().display(),
            tree.entries,
            tree.branches.len()
        );
        Ok(Self { file, tree })
    }

    /// Branch metadata.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

impl TreeSource for RootTree {
    fn name(&self) -> &str {
        &self.tree.name
    }

    fn entries(&self) -> usize {
        self.tree.entries as usize
    }

    fn branch_names(&self) -> Vec<String> {
        self.tree.branch_names().into_iter().map(String::from).collect()
    }

    fn branch_kind(&self, branch: &str) -> evs_core::Result<ScalarKind> {
        let info = self
            .tree
            .find_branch(branch)
            .ok_or_else(|| Error::BranchNotFound(branch.to_string()))?;
        Ok(info.scalar_kind()?)
    }

    fn read_branch(&self, branch: &str) -> evs_core::Result<Column> {
        let reader = self.file.branch_reader(&self.tree, branch)?;
        Ok(reader.read_column()?)
    }

    fn has_branch(&self, branch: &str) -> bool {
        self.tree.find_branch(branch).is_some()
    }
}
