//! Event identifier collection for one side of the comparison.

use std::collections::{BTreeMap, BTreeSet};

use evs_core::{Error, EventId, Result};

use crate::dataset::WorkingTree;
use crate::loader::load_column_as;

/// Build the identifier of every row from 3 (run, lumi, event) or 4
/// (plus sample id) branches, in row order.
pub fn collect_identifiers(tree: &WorkingTree, id_branches: &[String]) -> Result<Vec<EventId>> {
    if !(3..=4).contains(&id_branches.len()) {
        return Err(Error::InvalidIdColumnSpec(id_branches.join(", ")));
    }

    let columns = id_branches
        .iter()
        .map(|b| load_column_as::<u64>(tree, b))
        .collect::<Result<Vec<_>>>()?;

    let n = tree.entries();
    if let Some((branch, col)) = id_branches.iter().zip(&columns).find(|(_, c)| c.len() != n) {
        return Err(Error::Validation(format!(
            "id branch '{}' has {} rows, tree has {}",
            branch,
            col.len(),
            n
        )));
    }

    let ids = (0..n)
        .map(|row| match columns.as_slice() {
            [run, lumi, event] => EventId::new(run[row], lumi[row], event[row]),
            [run, lumi, event, sample] => {
                EventId::with_sample(run[row], lumi[row], event[row], sample[row])
            }
            _ => EventId::UNDEFINED,
        })
        .collect();
    Ok(ids)
}

/// Identifiers of one dataset with the derived lookup structures.
#[derive(Debug, Clone, Default)]
pub struct SideEvents {
    /// Identifiers in row order.
    pub ids: Vec<EventId>,
    /// Distinct identifiers.
    pub unique: BTreeSet<EventId>,
    /// Identifier to row index; a repeated identifier keeps its last row.
    pub entry_map: BTreeMap<EventId, usize>,
    /// Second and later occurrences, in row order.
    pub duplicates: Vec<EventId>,
}

impl SideEvents {
    /// Derive the set, the entry map and the duplicate list from `ids`.
    pub fn from_ids(ids: Vec<EventId>) -> Self {
        let mut unique = BTreeSet::new();
        let mut entry_map = BTreeMap::new();
        let mut duplicates = Vec::new();
        for (row, id) in ids.iter().enumerate() {
            if !unique.insert(*id) {
                duplicates.push(*id);
            }
            entry_map.insert(*id, row);
        }
        Self { ids, unique, entry_map, duplicates }
    }

    /// Collect identifiers from `tree` and derive the lookups.
    pub fn collect(tree: &WorkingTree, id_branches: &[String]) -> Result<Self> {
        let side = Self::from_ids(collect_identifiers(tree, id_branches)?);
        tracing::debug!(
            tree = tree.name(),
            events = side.ids.len(),
            unique = side.unique.len(),
            duplicates = side.duplicate_count(),
            "collected event identifiers"
        );
        Ok(side)
    }

    /// `len(ids) - len(unique)`.
    pub fn duplicate_count(&self) -> usize {
        self.ids.len() - self.unique.len()
    }
}
