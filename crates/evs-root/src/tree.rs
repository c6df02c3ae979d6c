//! TTree and branch metadata.

use evs_core::ScalarKind;

use crate::error::{Result, RootError};

/// Element type of a leaf, from its TLeaf class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    /// `TLeafF`.
    F32,
    /// `TLeafD`.
    F64,
    /// `TLeafI`.
    I32,
    /// `TLeafI` with `fIsUnsigned`.
    U32,
    /// `TLeafL`.
    I64,
    /// `TLeafL` with `fIsUnsigned`.
    U64,
    /// `TLeafS`.
    I16,
    /// `TLeafS` with `fIsUnsigned`.
    U16,
    /// `TLeafB`.
    I8,
    /// `TLeafB` with `fIsUnsigned`.
    U8,
    /// `TLeafO`.
    Bool,
}

impl LeafType {
    /// Map a TLeaf class name (and its unsigned flag) to a leaf type.
    pub fn from_class(class_name: &str, is_unsigned: bool) -> Option<Self> {
        let t = match (class_name, is_unsigned) {
            ("TLeafF", _) => LeafType::F32,
            ("TLeafD", _) => LeafType::F64,
            ("TLeafI", false) => LeafType::I32,
            ("TLeafI", true) => LeafType::U32,
            ("TLeafL", false) => LeafType::I64,
            ("TLeafL", true) => LeafType::U64,
            ("TLeafS", false) => LeafType::I16,
            ("TLeafS", true) => LeafType::U16,
            ("TLeafB", false) => LeafType::I8,
            ("TLeafB", true) => LeafType::U8,
            ("TLeafO", _) => LeafType::Bool,
            _ => return None,
        };
        Some(t)
    }

    /// Size in bytes of one element.
    pub fn byte_size(self) -> usize {
        match self {
            LeafType::F64 | LeafType::I64 | LeafType::U64 => 8,
            LeafType::F32 | LeafType::I32 | LeafType::U32 => 4,
            LeafType::I16 | LeafType::U16 => 2,
            LeafType::I8 | LeafType::U8 | LeafType::Bool => 1,
        }
    }

    /// The scalar kind this leaf is exposed as, if it has one.
    pub fn scalar_kind(self) -> Option<ScalarKind> {
        match self {
            LeafType::F32 => Some(ScalarKind::F32),
            LeafType::F64 => Some(ScalarKind::F64),
            LeafType::I32 => Some(ScalarKind::I32),
            LeafType::U32 => Some(ScalarKind::U32),
            LeafType::I64 => Some(ScalarKind::I64),
            LeafType::U64 => Some(ScalarKind::U64),
            LeafType::Bool => Some(ScalarKind::Bool),
            LeafType::I8 => Some(ScalarKind::Char),
            LeafType::I16 | LeafType::U16 | LeafType::U8 => None,
        }
    }
}

/// The single leaf of a flat branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafInfo {
    /// TLeaf class, e.g. `TLeafD`.
    pub class_name: String,
    /// Leaf name.
    pub name: String,
    /// Fixed element count (`fLen`); `1` for scalars.
    pub len: i32,
    /// Element size in bytes (`fLenType`).
    pub len_type: i32,
    /// `fIsUnsigned`.
    pub is_unsigned: bool,
    /// Whether a count leaf sizes this leaf per entry.
    pub has_leaf_count: bool,
}

/// Metadata for one TBranch.
#[derive(Debug, Clone)]
pub struct BranchInfo {
    /// Branch name.
    pub name: String,
    /// Streamer class (`TBranch`, `TBranchElement`, ...).
    pub class_name: String,
    /// First leaf, if any were found.
    pub leaf: Option<LeafInfo>,
    /// Number of leaves.
    pub n_leaves: usize,
    /// Entries in this branch.
    pub entries: u64,
    /// `fEntryOffsetLen`: non-zero for variable-size entries.
    pub entry_offset_len: usize,
    /// Compressed size of each written basket.
    pub basket_bytes: Vec<u32>,
    /// First entry of each basket, plus the end entry.
    pub basket_entry: Vec<u64>,
    /// File offset of each written basket.
    pub basket_seek: Vec<u64>,
    /// Written baskets (`fWriteBasket`).
    pub n_baskets: usize,
}

impl BranchInfo {
    /// Leaf type of a flat scalar branch.
    ///
    /// Anything else (object branches, arrays, multi-leaf or
    /// variable-length branches, and 8/16-bit types other than `char`)
    /// is reported as [`RootError::UnsupportedBranch`].
    pub fn leaf_type(&self) -> Result<LeafType> {
        let unsupported = |reason: String| RootError::UnsupportedBranch {
            branch: self.name.clone(),
            reason,
        };

        if self.class_name != "TBranch" {
            return Err(unsupported(format!("{} branches are not flat scalars", self.class_name)));
        }
        if self.n_leaves != 1 {
            return Err(unsupported(format!("{} leaves", self.n_leaves)));
        }
        let leaf = self.leaf.as_ref().ok_or_else(|| unsupported("no leaf".into()))?;
        if leaf.has_leaf_count {
            return Err(unsupported("variable-length array".into()));
        }
        if leaf.len > 1 {
            return Err(unsupported(format!("fixed array of {}", leaf.len)));
        }
        LeafType::from_class(&leaf.class_name, leaf.is_unsigned)
            .ok_or_else(|| unsupported(format!("leaf class {}", leaf.class_name)))
    }

    /// Scalar kind of a flat scalar branch.
    pub fn scalar_kind(&self) -> Result<ScalarKind> {
        let leaf_type = self.leaf_type()?;
        leaf_type.scalar_kind().ok_or_else(|| RootError::UnsupportedBranch {
            branch: self.name.clone(),
            reason: format!("{:?} values", leaf_type),
        })
    }
}

/// A parsed TTree.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Tree name.
    pub name: String,
    /// Number of entries.
    pub entries: u64,
    /// Top-level branches.
    pub branches: Vec<BranchInfo>,
}

impl Tree {
    /// Find a branch by name.
    pub fn find_branch(&self, name: &str) -> Option<&BranchInfo> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Branch names in storage order.
    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(class_name: &str, leaf: Option<LeafInfo>) -> BranchInfo {
        BranchInfo {
            name: "b".into(),
            class_name: class_name.into(),
            n_leaves: usize::from(leaf.is_some()),
            leaf,
            entries: 0,
            entry_offset_len: 0,
            basket_bytes: Vec::new(),
            basket_entry: vec![0],
            basket_seek: Vec::new(),
            n_baskets: 0,
        }
    }

    fn leaf(class_name: &str, unsigned: bool) -> LeafInfo {
        LeafInfo {
            class_name: class_name.into(),
            name: "b".into(),
            len: 1,
            len_type: 4,
            is_unsigned: unsigned,
            has_leaf_count: false,
        }
    }

    #[test]
    fn flat_branches_map_to_scalar_kinds() {
        let cases = [
            ("TLeafI", false, ScalarKind::I32),
            ("TLeafI", true, ScalarKind::U32),
            ("TLeafL", true, ScalarKind::U64),
            ("TLeafF", false, ScalarKind::F32),
            ("TLeafD", false, ScalarKind::F64),
            ("TLeafO", false, ScalarKind::Bool),
            ("TLeafB", false, ScalarKind::Char),
        ];
        for (class, unsigned, kind) in cases {
            assert_eq!(branch("TBranch", Some(leaf(class, unsigned))).scalar_kind().unwrap(), kind);
        }
    }

    #[test]
    fn composite_and_array_branches_are_unsupported() {
        let is_unsupported = |b: BranchInfo| {
            matches!(b.scalar_kind(), Err(RootError::UnsupportedBranch { .. }))
        };

        assert!(is_unsupported(branch("TBranchElement", None)));
        assert!(is_unsupported(branch("TBranch", None)));
        assert!(is_unsupported(branch("TBranch", Some(leaf("TLeafS", false)))));
        assert!(is_unsupported(branch("TBranch", Some(leaf("TLeafB", true)))));

        let mut array = leaf("TLeafF", false);
        array.len = 4;
        assert!(is_unsupported(branch("TBranch", Some(array))));

        let mut jagged = leaf("TLeafF", false);
        jagged.has_leaf_count = true;
        assert!(is_unsupported(branch("TBranch", Some(jagged))));
    }
}
