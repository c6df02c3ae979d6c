//! Backing bytes for an open ROOT file.

use std::ops::Deref;

/// File bytes, either memory-mapped or owned.
pub enum DataSource {
    /// Bytes held in memory (`from_bytes`, tests).
    Owned(Vec<u8>),
    /// Read-only memory map of the file on disk.
    Mmap(memmap2::Mmap),
}

impl Deref for DataSource {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            DataSource::Owned(v) => v,
            DataSource::Mmap(m) => m,
        }
    }
}
