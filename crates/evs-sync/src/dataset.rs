//! Dataset sources: in-memory and JSON trees, plus pre-selected working
//! copies with scoped branch activation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;

use evs_core::{Column, Error, Result, Scalar, ScalarKind, TreeSource, Wide};
use evs_root::{RootTree, SelectionExpr};
use serde::Deserialize;

/// A tree held entirely in memory.
///
/// Branches keep their insertion order; all of them have the same length.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    name: String,
    entries: usize,
    branches: Vec<(String, Column)>,
}

impl MemoryTree {
    /// Empty tree without branches.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: 0, branches: Vec::new() }
    }

    /// Add a branch, builder style.
    pub fn with_branch(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.push_branch(name, column)?;
        Ok(self)
    }

    /// Add a branch. The first branch fixes the number of entries.
    pub fn push_branch(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.branches.iter().any(|(b, _)| *b == name) {
            return Err(Error::Validation(format!(
                "tree '{}' already has a branch '{}'",
                self.name, name
            )));
        }
        if self.branches.is_empty() {
            self.entries = column.len();
        } else if column.len() != self.entries {
            return Err(Error::Validation(format!(
                "branch '{}' has {} entries, tree '{}' has {}",
                name,
                column.len(),
                self.name,
                self.entries
            )));
        }
        self.branches.push((name, column));
        Ok(())
    }

    /// Parse a JSON tree file and take the tree called `tree`.
    ///
    /// ```json
    /// {"trees": {"events": {"branches": {"run": {"type": "u32", "values": [1, 1]}}}}}
    /// ```
    pub fn from_json_str(text: &str, tree: &str) -> Result<Self> {
        let mut file: TreeFile = serde_json::from_str(text)?;
        let spec = file.trees.remove(tree).ok_or_else(|| Error::TreeNotFound(tree.to_string()))?;

        let mut out = MemoryTree::new(tree);
        for (name, branch) in spec.branches {
            let column = branch.decode(&name)?;
            out.push_branch(name, column)?;
        }
        Ok(out)
    }

    /// Read a JSON tree file from disk.
    pub fn from_json_file(path: &Path, tree: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::FileOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text, tree)
    }

    fn column(&self, branch: &str) -> Result<&Column> {
        self.branches
            .iter()
            .find(|(b, _)| b == branch)
            .map(|(_, c)| c)
            .ok_or_else(|| Error::BranchNotFound(branch.to_string()))
    }
}

impl TreeSource for MemoryTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> usize {
        self.entries
    }

    fn branch_names(&self) -> Vec<String> {
        self.branches.iter().map(|(b, _)| b.clone()).collect()
    }

    fn branch_kind(&self, branch: &str) -> Result<ScalarKind> {
        Ok(self.column(branch)?.kind())
    }

    fn read_branch(&self, branch: &str) -> Result<Column> {
        self.column(branch).cloned()
    }
}

#[derive(Deserialize)]
struct TreeFile {
    trees: BTreeMap<String, TreeSpec>,
}

#[derive(Deserialize)]
struct TreeSpec {
    branches: BTreeMap<String, BranchSpec>,
}

#[derive(Deserialize)]
struct BranchSpec {
    #[serde(rename = "type")]
    kind: ScalarKind,
    values: Vec<serde_json::Value>,
}

impl BranchSpec {
    fn decode(&self, branch: &str) -> Result<Column> {
        match self.kind {
            ScalarKind::I32 => self.values_as::<i32>(branch),
            ScalarKind::U32 => self.values_as::<u32>(branch),
            ScalarKind::I64 => self.values_as::<i64>(branch),
            ScalarKind::U64 => self.values_as::<u64>(branch),
            ScalarKind::F32 => self.values_as::<f32>(branch),
            ScalarKind::F64 => self.values_as::<f64>(branch),
            ScalarKind::Bool => self.values_as::<bool>(branch),
            ScalarKind::Char => self.values_as::<i8>(branch),
        }
    }

    fn values_as<T: Scalar>(&self, branch: &str) -> Result<Column> {
        let values = self
            .values
            .iter()
            .map(|v| {
                json_scalar(v, T::KIND)
                    .and_then(|w| {
                        let x = T::from_wide(w);
                        // Integral kinds must hold the value exactly.
                        (T::KIND.is_float() || x.to_wide() == w).then_some(x)
                    })
                    .ok_or_else(|| {
                        Error::Format(format!(
                            "branch '{}': {} is not a {} value",
                            branch, v, T::KIND
                        ))
                    })
            })
            .collect::<Result<Vec<T>>>()?;
        Ok(T::into_column(values))
    }
}

/// Integral kinds only accept JSON integers (or booleans for `bool`).
fn json_scalar(v: &serde_json::Value, kind: ScalarKind) -> Option<Wide> {
    use serde_json::Value;

    match v {
        Value::Bool(b) if kind == ScalarKind::Bool => Some(Wide::Int(i128::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Wide::Int(i128::from(i)))
            } else if let Some(u) = n.as_u64() {
                Some(Wide::Int(i128::from(u)))
            } else if kind.is_float() {
                n.as_f64().map(Wide::Float)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Open `tree` in `path`: `.json` files are JSON trees, anything else is read as ROOT.
pub fn open_tree(path: &Path, tree: &str) -> Result<Box<dyn TreeSource>> {
    let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(Box::new(MemoryTree::from_json_file(path, tree)?))
    } else {
        Ok(Box::new(RootTree::open(path, tree)?))
    }
}

/// A dataset restricted by a pre-selection, with per-branch activation.
///
/// All branches start inactive. Reads go through a [`BranchGuard`] that
/// activates exactly one branch and deactivates it again when dropped.
pub struct WorkingTree {
    source: Box<dyn TreeSource>,
    rows: Option<Vec<usize>>,
    active: RefCell<BTreeMap<String, usize>>,
}

impl WorkingTree {
    /// Apply `pre_selection` to `source`; an empty string keeps every row.
    pub fn new(source: Box<dyn TreeSource>, pre_selection: &str) -> Result<Self> {
        let rows = if pre_selection.trim().is_empty() {
            None
        } else {
            let expr = SelectionExpr::compile(pre_selection)?;
            let columns = expr
                .required_branches()
                .iter()
                .map(|b| source.read_branch(b).map(|c| c.to_f64_vec()))
                .collect::<Result<Vec<_>>>()?;
            let rows = expr.select_rows(&columns, source.entries())?;
            tracing::info!(
                tree = source.name(),
                selection = pre_selection,
                kept = rows.len(),
                total = source.entries(),
                "applied pre-selection"
            );
            Some(rows)
        };
        Ok(Self { source, rows, active: RefCell::new(BTreeMap::new()) })
    }

    /// Working copy of `source` without pre-selection.
    pub fn unfiltered(source: Box<dyn TreeSource>) -> Self {
        Self { source, rows: None, active: RefCell::new(BTreeMap::new()) }
    }

    /// Name of the underlying tree.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Rows that passed the pre-selection.
    pub fn entries(&self) -> usize {
        self.rows.as_ref().map_or(self.source.entries(), Vec::len)
    }

    /// Stored kind of a branch.
    pub fn branch_kind(&self, branch: &str) -> Result<ScalarKind> {
        self.source.branch_kind(branch)
    }

    /// Whether the branch exists.
    pub fn has_branch(&self, branch: &str) -> bool {
        self.source.has_branch(branch)
    }

    /// Whether a guard currently holds `branch` active.
    pub fn is_active(&self, branch: &str) -> bool {
        self.active.borrow().contains_key(branch)
    }

    /// Activate `branch` until the returned guard is dropped.
    pub fn activate(&self, branch: &str) -> Result<BranchGuard<'_>> {
        if !self.source.has_branch(branch) {
            return Err(Error::BranchNotFound(branch.to_string()));
        }
        *self.active.borrow_mut().entry(branch.to_string()).or_insert(0) += 1;
        Ok(BranchGuard { tree: self, branch: branch.to_string() })
    }

    fn read_active(&self, branch: &str) -> Result<Column> {
        if !self.is_active(branch) {
            return Err(Error::Validation(format!("branch '{}' is not active", branch)));
        }
        let column = self.source.read_branch(branch)?;
        let Some(rows) = &self.rows else {
            return Ok(column);
        };
        if let Some(&last) = rows.iter().max() {
            if last >= column.len() {
                return Err(Error::Validation(format!(
                    "branch '{}' has {} entries, pre-selection needs row {}",
                    branch,
                    column.len(),
                    last
                )));
            }
        }
        Ok(column.take_rows(rows))
    }

    fn deactivate(&self, branch: &str) {
        let mut active = self.active.borrow_mut();
        if let Some(count) = active.get_mut(branch) {
            *count -= 1;
            if *count == 0 {
                active.remove(branch);
            }
        }
    }
}

/// Keeps one branch of a [`WorkingTree`] active.
pub struct BranchGuard<'a> {
    tree: &'a WorkingTree,
    branch: String,
}

impl BranchGuard<'_> {
    /// Branch held by this guard.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Read the pre-selected rows of the branch.
    pub fn read(&self) -> Result<Column> {
        self.tree.read_active(&self.branch)
    }
}

impl Drop for BranchGuard<'_> {
    fn drop(&mut self) {
        self.tree.deactivate(&self.branch);
    }
}
