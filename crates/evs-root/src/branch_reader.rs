//! Column extraction from flat TTree branches.

use evs_core::{Column, ScalarKind};
use rayon::prelude::*;

use crate::basket::read_basket_data;
use crate::error::{Result, RootError};
use crate::tree::BranchInfo;

/// Reads every entry of one scalar branch.
pub struct BranchReader<'a> {
    file_data: &'a [u8],
    branch: &'a BranchInfo,
    is_large: bool,
}

impl<'a> BranchReader<'a> {
    /// Create a reader over `branch` in `file_data`.
    pub fn new(file_data: &'a [u8], branch: &'a BranchInfo, is_large: bool) -> Self {
        Self { file_data, branch, is_large }
    }

    /// Kind of the values this reader yields.
    pub fn kind(&self) -> Result<ScalarKind> {
        self.branch.scalar_kind()
    }

    /// Decode the whole branch in its stored kind.
    pub fn read_column(&self) -> Result<Column> {
        let kind = self.kind()?;
        let baskets = self.read_all_baskets()?;
        let entries = self.branch.entries as usize;

        let mut column = Column::empty(kind);
        for (i, payload) in baskets.iter().enumerate() {
            let n = self.basket_entries(i);
            let need = n * kind.byte_size();
            let data = payload.get(..need).ok_or_else(|| {
                RootError::Deserialization(format!(
                    "basket {} of '{}' holds {} bytes, {} entries need {}",
                    i,
                    self.branch.name,
                    payload.len(),
                    n,
                    need
                ))
            })?;
            append_be(&mut column, data);
        }

        if column.len() < entries {
            return Err(RootError::Deserialization(format!(
                "branch '{}' decoded {} of {} entries",
                self.branch.name,
                column.len(),
                entries
            )));
        }
        column.truncate(entries);
        Ok(column)
    }

    /// Entries held by basket `i`.
    fn basket_entries(&self, i: usize) -> usize {
        let first = self.branch.basket_entry.get(i).copied().unwrap_or(0);
        let next = self.branch.basket_entry.get(i + 1).copied().unwrap_or(self.branch.entries);
        next.saturating_sub(first) as usize
    }

    /// Read and decompress all baskets in parallel.
    fn read_all_baskets(&self) -> Result<Vec<Vec<u8>>> {
        (0..self.branch.n_baskets)
            .into_par_iter()
            .map(|i| read_basket_data(self.file_data, self.branch.basket_seek[i], self.is_large))
            .collect()
    }
}

fn be<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    out
}

/// Append big-endian values to a column of the matching kind.
fn append_be(column: &mut Column, data: &[u8]) {
    match column {
        Column::I32(v) => v.extend(data.chunks_exact(4).map(|c| i32::from_be_bytes(be(c)))),
        Column::U32(v) => v.extend(data.chunks_exact(4).map(|c| u32::from_be_bytes(be(c)))),
        Column::I64(v) => v.extend(data.chunks_exact(8).map(|c| i64::from_be_bytes(be(c)))),
        Column::U64(v) => v.extend(data.chunks_exact(8).map(|c| u64::from_be_bytes(be(c)))),
        Column::F32(v) => v.extend(data.chunks_exact(4).map(|c| f32::from_be_bytes(be(c)))),
        Column::F64(v) => v.extend(data.chunks_exact(8).map(|c| f64::from_be_bytes(be(c)))),
        Column::Bool(v) => v.extend(data.iter().map(|&b| b != 0)),
        Column::Char(v) => v.extend(data.iter().map(|&b| b as i8)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_big_endian_by_kind() {
        let mut col = Column::empty(ScalarKind::F32);
        let bytes: Vec<u8> = [1.5f32, -2.0].iter().flat_map(|v| v.to_be_bytes()).collect();
        append_be(&mut col, &bytes);
        assert_eq!(col, Column::F32(vec![1.5, -2.0]));

        let mut col = Column::empty(ScalarKind::U64);
        append_be(&mut col, &7u64.to_be_bytes());
        assert_eq!(col, Column::U64(vec![7]));

        let mut col = Column::empty(ScalarKind::Bool);
        append_be(&mut col, &[0, 1, 2]);
        assert_eq!(col, Column::Bool(vec![false, true, true]));

        let mut col = Column::empty(ScalarKind::Char);
        append_be(&mut col, &[0xff, 0x41]);
        assert_eq!(col, Column::Char(vec![-1, 65]));
    }
}
