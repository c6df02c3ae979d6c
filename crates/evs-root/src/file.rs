//! TFile header parsing and the top-level ROOT file interface.

use std::fs;
use std::path::{Path, PathBuf};

use crate::branch_reader::BranchReader;
use crate::datasource::DataSource;
use crate::directory::{Directory, directory_seek_keys};
use crate::error::{Result, RootError};
use crate::key::{Key, KeyInfo};
use crate::objects;
use crate::rbuffer::RBuffer;
use crate::tree::Tree;

const ROOT_MAGIC: &[u8; 4] = b"root";

/// Parsed file header fields we navigate with.
struct FileHeader {
    /// Whether seek pointers are 64-bit (`fVersion >= 1000000`).
    is_large: bool,
    /// Position of the top-level key list.
    seek_keys: u64,
}

/// A ROOT file opened for reading trees.
pub struct RootFile {
    data: DataSource,
    header: FileHeader,
    path: PathBuf,
}

impl RootFile {
    /// Open a ROOT file from disk using memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: the map is read-only; a file truncated underneath us is
        // outside what this reader supports.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_datasource(DataSource::Mmap(mmap), path)
    }

    /// Parse a ROOT file held in memory.
    pub fn from_bytes(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        Self::from_datasource(DataSource::Owned(data), path)
    }

    fn from_datasource(data: DataSource, path: PathBuf) -> Result<Self> {
        if data.len() < 64 || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }
        let header = Self::parse_header(&data)?;
        log::debug!("opened {} (large = {})", path.display(), header.is_large);
        Ok(Self { data, header, path })
    }

    /// Parse the file header and the top directory that follows the name record.
    ///
    /// ```text
    /// offset  size  field
    ///    0      4   "root"
    ///    4      4   fVersion
    ///    8      4   fBEGIN
    ///   ...         fEND, fSeekFree (4 or 8 bytes each), fNbytesFree, nfree
    ///   ...     4   fNbytesName
    /// ```
    /// The top TDirectory streamer sits at `fBEGIN + fNbytesName`.
    fn parse_header(data: &[u8]) -> Result<FileHeader> {
        let mut r = RBuffer::at(data, 4);
        let version = r.read_u32()?;
        let is_large = version >= 1_000_000;
        let begin = r.read_u32()? as usize;
        r.skip(if is_large { 16 } else { 8 })?; // fEND, fSeekFree
        let _nbytes_free = r.read_u32()?;
        let _nfree = r.read_u32()?;
        let nbytes_name = r.read_u32()? as usize;

        let dir_offset = begin + nbytes_name;
        if dir_offset >= data.len() {
            return Err(RootError::Deserialization("TDirectory offset past end of file".into()));
        }
        let seek_keys = directory_seek_keys(&mut RBuffer::at(data, dir_offset))?;
        Ok(FileHeader { is_large, seek_keys })
    }

    /// Path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keys of the top-level directory.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        let dir = self.read_top_directory()?;
        Ok(dir.keys().iter().map(KeyInfo::from).collect())
    }

    fn read_top_directory(&self) -> Result<Directory> {
        Directory::read_key_list(&self.data, self.header.seek_keys as usize, self.header.is_large)
    }

    /// Follow a `dir/sub/name` path and return the final key.
    fn resolve_key(&self, path: &str) -> Result<Key> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, dirs)) = parts.split_last() else {
            return Err(RootError::KeyNotFound(path.to_string()));
        };

        let mut dir = self.read_top_directory()?;
        for &part in dirs {
            let key = dir
                .find_key(part)
                .ok_or_else(|| RootError::KeyNotFound(format!("{} (in path {})", part, path)))?;
            if !key.is_directory() {
                return Err(RootError::Deserialization(format!(
                    "'{}' is not a directory (class: {})",
                    part, key.class_name
                )));
            }
            let payload = key.payload(&self.data)?;
            dir = Directory::read_from_payload(&payload, &self.data, self.header.is_large)?;
        }

        dir.find_key(last).cloned().ok_or_else(|| RootError::KeyNotFound(path.to_string()))
    }

    /// Read a TTree by name or `dir/name` path.
    pub fn get_tree(&self, path: &str) -> Result<Tree> {
        let key = self.resolve_key(path).map_err(|e| match e {
            RootError::KeyNotFound(_) => RootError::TreeNotFound(path.to_string()),
            other => other,
        })?;
        if key.class_name != "TTree" {
            return Err(RootError::TreeNotFound(format!(
                "'{}' is {} not TTree",
                path, key.class_name
            )));
        }
        let payload = key.payload(&self.data)?;
        objects::read_ttree(&payload, key.key_len as usize)
    }

    /// Create a [`BranchReader`] for the named branch.
    pub fn branch_reader<'a>(&'a self, tree: &'a Tree, branch: &str) -> Result<BranchReader<'a>> {
        let info = tree
            .find_branch(branch)
            .ok_or_else(|| RootError::BranchNotFound(branch.to_string()))?;
        Ok(BranchReader::new(&self.data, info, self.header.is_large))
    }
}
