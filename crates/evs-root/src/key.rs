//! TKey records: the header ROOT writes in front of every stored object.

use crate::decompress::decompress;
use crate::error::{Result, RootError};
use crate::rbuffer::RBuffer;

/// A parsed TKey record.
#[derive(Debug, Clone)]
pub struct Key {
    /// Bytes on disk, key header included.
    pub n_bytes: u32,
    /// Uncompressed object length.
    pub obj_len: u32,
    /// Length of the key header.
    pub key_len: u16,
    /// Cycle number within the directory.
    pub cycle: u16,
    /// Absolute position of this key in the file.
    pub seek_key: u64,
    /// Class name of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
}

/// Key summary returned by [`RootFile::list_keys`](crate::RootFile::list_keys).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Class name, e.g. `TTree` or `TDirectoryFile`.
    pub class_name: String,
    /// Cycle number.
    pub cycle: u16,
}

impl From<&Key> for KeyInfo {
    fn from(key: &Key) -> Self {
        Self { name: key.name.clone(), class_name: key.class_name.clone(), cycle: key.cycle }
    }
}

impl Key {
    /// Read a TKey at the buffer's current position.
    pub fn read(r: &mut RBuffer, is_large: bool) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let _datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        let (seek_key, _seek_pdir) = if version > 1000 || is_large {
            (r.read_u64()?, r.read_u64()?)
        } else {
            (r.read_u32()? as u64, r.read_u32()? as u64)
        };

        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let _title = r.read_string()?;

        Ok(Key { n_bytes, obj_len, key_len, cycle, seek_key, class_name, name })
    }

    /// Whether this key holds a subdirectory.
    pub fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectoryFile" | "TDirectory")
    }

    /// Object bytes following the key header, decompressed if needed.
    pub fn payload(&self, file_data: &[u8]) -> Result<Vec<u8>> {
        let start = self.seek_key as usize;
        let end = start + self.n_bytes as usize;
        if end > file_data.len() || (self.key_len as usize) > self.n_bytes as usize {
            return Err(RootError::BufferUnderflow {
                offset: start,
                need: self.n_bytes as usize,
                have: file_data.len().saturating_sub(start),
            });
        }

        let stored = &file_data[start + self.key_len as usize..end];
        if stored.len() == self.obj_len as usize {
            Ok(stored.to_vec())
        } else {
            decompress(stored, self.obj_len as usize)
        }
    }
}
