//! TDirectory key lists.

use crate::error::Result;
use crate::key::Key;
use crate::rbuffer::RBuffer;

/// Keys of one directory, in file order.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Read the key list stored at `seek_keys`.
    ///
    /// The list is itself wrapped in a TKey, followed by a u32 count and the keys.
    pub fn read_key_list(file_data: &[u8], seek_keys: usize, is_large: bool) -> Result<Self> {
        let mut r = RBuffer::at(file_data, seek_keys);
        let _list_key = Key::read(&mut r, is_large)?;

        let nkeys = r.read_u32()? as usize;
        let keys = (0..nkeys).map(|_| Key::read(&mut r, is_large)).collect::<Result<_>>()?;
        Ok(Directory { keys })
    }

    /// Read a subdirectory from the payload of its `TDirectoryFile` key.
    pub fn read_from_payload(payload: &[u8], file_data: &[u8], is_large: bool) -> Result<Self> {
        let seek_keys = directory_seek_keys(&mut RBuffer::new(payload))?;
        if seek_keys == 0 {
            return Ok(Directory::default());
        }
        Self::read_key_list(file_data, seek_keys as usize, is_large)
    }

    /// All keys.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Highest cycle of the key named `name`.
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }
}

/// Parse a TDirectory streamer header and return its `fSeekKeys`.
pub(crate) fn directory_seek_keys(r: &mut RBuffer) -> Result<u64> {
    let version = r.read_u16()?;
    let _datime_c = r.read_u32()?;
    let _datime_m = r.read_u32()?;
    let _nbytes_keys = r.read_u32()?;
    let _nbytes_name = r.read_u32()?;

    if version > 1000 {
        let _seek_dir = r.read_u64()?;
        let _seek_parent = r.read_u64()?;
        r.read_u64()
    } else {
        let _seek_dir = r.read_u32()?;
        let _seek_parent = r.read_u32()?;
        Ok(r.read_u32()? as u64)
    }
}
