//! TTree, TBranch and TLeaf streamers.

use crate::error::{Result, RootError};
use crate::rbuffer::{K_BYTE_COUNT_MASK, RBuffer};
use crate::tree::{BranchInfo, LeafInfo, Tree};

const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;
const K_CLASS_MASK: u32 = 0x8000_0000;
/// ROOT offsets every map entry by this amount.
const K_MAP_OFFSET: usize = 2;

/// Read a TTree from the decompressed payload of its key.
///
/// `key_len` is the length of the key header: class references inside the
/// payload are offsets into a buffer that starts with that header.
pub fn read_ttree(payload: &[u8], key_len: usize) -> Result<Tree> {
    let mut r = RBuffer::new(payload);
    let mut classes = ClassRefs { origin: key_len + K_MAP_OFFSET, known: Vec::new() };

    let (tree_ver, tree_end) = r.read_version()?;
    let tree_end = tree_end.ok_or_else(|| missing_byte_count("TTree"))?;
    let (name, _title) = r.read_tnamed()?;

    // TAttLine, TAttFill, TAttMarker
    for _ in 0..3 {
        r.skip_versioned()?;
    }

    let entries = r.read_i64()?.max(0) as u64;
    let _tot_bytes = r.read_i64()?;
    let _zip_bytes = r.read_i64()?;
    let _saved_bytes = r.read_i64()?;
    if tree_ver >= 18 {
        let _flushed_bytes = r.read_i64()?;
    }
    let _weight = r.read_f64()?;
    let _timer_interval = r.read_i32()?;
    let _scan_field = r.read_i32()?;
    let _update = r.read_i32()?;
    if tree_ver >= 18 {
        let _default_entry_offset_len = r.read_i32()?;
    }
    let n_cluster_range = if tree_ver >= 19 { r.read_i32()?.max(0) as usize } else { 0 };
    let _max_entries = r.read_i64()?;
    let _max_entry_loop = r.read_i64()?;
    let _max_virtual_size = r.read_i64()?;
    let _auto_save = r.read_i64()?;
    if tree_ver >= 18 {
        let _auto_flush = r.read_i64()?;
    }
    let _estimate = r.read_i64()?;

    if tree_ver >= 19 {
        // fClusterRangeEnd, fClusterSize: the array marker byte is written even when empty.
        for _ in 0..2 {
            r.read_u8()?;
            r.skip(8 * n_cluster_range)?;
        }
    }
    if tree_ver >= 20 {
        r.skip_versioned()?; // fIOFeatures
    }

    let branches = read_branch_array(&mut r, &mut classes)?;
    r.set_pos(tree_end);

    Ok(Tree { name, entries, branches })
}

fn missing_byte_count(what: &str) -> RootError {
    RootError::Deserialization(format!("{} missing byte count", what))
}

/// Class names seen so far, keyed by their map offset.
struct ClassRefs {
    origin: usize,
    known: Vec<(usize, String)>,
}

impl ClassRefs {
    /// Read the header of one TObjArray element.
    ///
    /// Returns the element's class and the position where it ends, or `None`
    /// for a null slot.
    fn read_element(&mut self, r: &mut RBuffer) -> Result<Option<(String, usize)>> {
        let start = r.pos();
        let tag = r.read_u32()?;
        if tag == 0 {
            return Ok(None);
        }
        if tag & K_BYTE_COUNT_MASK == 0 {
            return Err(RootError::Deserialization(format!(
                "unexpected tag {:#010x} in TObjArray at {}",
                tag, start
            )));
        }
        let obj_end = start + 4 + (tag & !K_BYTE_COUNT_MASK) as usize;

        let class_tag_pos = r.pos();
        let class_tag = r.read_u32()?;
        let class_name = if class_tag == K_NEW_CLASS_TAG {
            let name = r.read_cstring()?;
            self.known.push((class_tag_pos + self.origin, name.clone()));
            name
        } else if class_tag & K_CLASS_MASK != 0 {
            let offset = (class_tag & !K_CLASS_MASK) as usize;
            self.known
                .iter()
                .find(|(off, _)| *off == offset)
                .map(|(_, name)| name.clone())
                .ok_or_else(|| {
                    RootError::Deserialization(format!(
                        "class reference {:#010x} at {} was never defined",
                        class_tag, class_tag_pos
                    ))
                })?
        } else {
            return Err(RootError::Deserialization(format!(
                "unexpected class tag {:#010x} at {}",
                class_tag, class_tag_pos
            )));
        };

        Ok(Some((class_name, obj_end)))
    }
}

/// Read the TObjArray header; returns `(element count, end position)`.
fn read_objarray_header(r: &mut RBuffer) -> Result<(usize, usize)> {
    let (_ver, end) = r.read_version()?;
    let end = end.ok_or_else(|| missing_byte_count("TObjArray"))?;
    r.read_tobject()?;
    let _name = r.read_string()?;
    let count = r.read_i32()?.max(0) as usize;
    let _low_bound = r.read_i32()?;
    Ok((count, end))
}

fn read_branch_array(r: &mut RBuffer, classes: &mut ClassRefs) -> Result<Vec<BranchInfo>> {
    let (count, arr_end) = read_objarray_header(r)?;
    let mut branches = Vec::with_capacity(count);

    for _ in 0..count {
        let Some((class_name, obj_end)) = classes.read_element(r)? else {
            continue;
        };
        let parsed = if class_name == "TBranch" {
            read_tbranch(r, classes)
        } else {
            // Derived branch classes stream their TBranch base first.
            r.read_version().and_then(|_| read_tbranch(r, classes))
        };
        match parsed {
            Ok(mut branch) => {
                branch.class_name = class_name;
                branches.push(branch);
            }
            Err(e) => log::debug!("skipping {} in branch list: {}", class_name, e),
        }
        r.set_pos(obj_end);
    }

    r.set_pos(arr_end);
    Ok(branches)
}

fn read_tbranch(r: &mut RBuffer, classes: &mut ClassRefs) -> Result<BranchInfo> {
    let (branch_ver, branch_end) = r.read_version()?;
    let branch_end = branch_end.ok_or_else(|| missing_byte_count("TBranch"))?;
    let (name, _title) = r.read_tnamed()?;
    r.skip_versioned()?; // TAttFill

    let _compress = r.read_i32()?;
    let _basket_size = r.read_i32()?;
    let entry_offset_len = r.read_i32()?.max(0) as usize;
    let n_baskets = r.read_i32()?.max(0) as usize; // fWriteBasket
    let _entry_number = r.read_i64()?;
    if branch_ver >= 13 {
        r.skip_versioned()?; // fIOFeatures
    }
    let _offset = r.read_i32()?;
    let max_baskets = r.read_i32()?.max(0) as usize;
    let _split_level = r.read_i32()?;
    let entries = r.read_i64()?.max(0) as u64;
    if branch_ver >= 11 {
        let _first_entry = r.read_i64()?;
    }
    let _tot_bytes = r.read_i64()?;
    let _zip_bytes = r.read_i64()?;

    r.skip_versioned()?; // fBranches
    let leaves = read_leaf_array(r, classes)?;
    r.skip_versioned()?; // fBaskets

    if n_baskets > max_baskets {
        return Err(RootError::Deserialization(format!(
            "branch '{}' has {} written baskets but room for {}",
            name, n_baskets, max_baskets
        )));
    }

    // fBasketBytes, fBasketEntry, fBasketSeek: fMaxBaskets slots behind a marker byte.
    r.read_u8()?;
    let basket_bytes = (0..max_baskets)
        .map(|_| r.read_i32().map(|v| v as u32))
        .collect::<Result<Vec<_>>>()?;
    r.read_u8()?;
    let basket_entry = (0..max_baskets)
        .map(|_| r.read_i64().map(|v| v.max(0) as u64))
        .collect::<Result<Vec<_>>>()?;
    r.read_u8()?;
    let basket_seek = (0..max_baskets)
        .map(|_| r.read_i64().map(|v| v.max(0) as u64))
        .collect::<Result<Vec<_>>>()?;

    r.set_pos(branch_end);

    let n_leaves = leaves.len();
    Ok(BranchInfo {
        name,
        class_name: "TBranch".to_string(),
        leaf: leaves.into_iter().next(),
        n_leaves,
        entries,
        entry_offset_len,
        basket_bytes: basket_bytes[..n_baskets].to_vec(),
        basket_entry: basket_entry[..(n_baskets + 1).min(max_baskets)].to_vec(),
        basket_seek: basket_seek[..n_baskets].to_vec(),
        n_baskets,
    })
}

fn read_leaf_array(r: &mut RBuffer, classes: &mut ClassRefs) -> Result<Vec<LeafInfo>> {
    let (count, arr_end) = read_objarray_header(r)?;
    let mut leaves = Vec::with_capacity(count);

    for _ in 0..count {
        if let Some((class_name, obj_end)) = classes.read_element(r)? {
            leaves.push(read_tleaf(r, class_name)?);
            r.set_pos(obj_end);
        }
    }

    r.set_pos(arr_end);
    Ok(leaves)
}

/// Read a concrete `TLeafX`: its own version, then the TLeaf base.
fn read_tleaf(r: &mut RBuffer, class_name: String) -> Result<LeafInfo> {
    r.read_version()?;
    r.read_version()?;
    let (name, _title) = r.read_tnamed()?;
    let len = r.read_i32()?;
    let len_type = r.read_i32()?;
    let _offset = r.read_i32()?;
    let _is_range = r.read_bool()?;
    let is_unsigned = r.read_bool()?;
    let has_leaf_count = r.read_u32()? != 0;
    Ok(LeafInfo { class_name, name, len, len_type, is_unsigned, has_leaf_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Streams objects with ROOT's byte-count framing.
    #[derive(Default)]
    struct Writer {
        buf: Vec<u8>,
        open: Vec<usize>,
    }

    impl Writer {
        fn u8(&mut self, v: u8) -> &mut Self {
            self.buf.push(v);
            self
        }
        fn u16(&mut self, v: u16) -> &mut Self {
            self.buf.extend_from_slice(&v.to_be_bytes());
            self
        }
        fn u32(&mut self, v: u32) -> &mut Self {
            self.buf.extend_from_slice(&v.to_be_bytes());
            self
        }
        fn i32(&mut self, v: i32) -> &mut Self {
            self.u32(v as u32)
        }
        fn string(&mut self, s: &str) -> &mut Self {
            self.u8(s.len() as u8);
            self.buf.extend_from_slice(s.as_bytes());
            self
        }
        fn cstring(&mut self, s: &str) -> &mut Self {
            self.buf.extend_from_slice(s.as_bytes());
            self.u8(0)
        }
        /// Open a byte-counted block; closed by `end`.
        fn begin(&mut self) -> &mut Self {
            self.open.push(self.buf.len());
            self.u32(0)
        }
        fn versioned(&mut self, version: u16) -> &mut Self {
            self.begin().u16(version)
        }
        fn end(&mut self) -> &mut Self {
            let start = self.open.pop().unwrap();
            let count = (self.buf.len() - start - 4) as u32 | K_BYTE_COUNT_MASK;
            self.buf[start..start + 4].copy_from_slice(&count.to_be_bytes());
            self
        }
        fn tobject(&mut self) -> &mut Self {
            self.u16(1).u32(0).u32(0)
        }
        fn tnamed(&mut self, name: &str) -> &mut Self {
            self.versioned(1).tobject().string(name).string("").end()
        }
        /// One `TLeafX` element, with either a new class tag or a reference.
        fn leaf(&mut self, class: ClassTag, name: &str, unsigned: bool) -> &mut Self {
            self.begin();
            match class {
                ClassTag::New(class) => self.u32(K_NEW_CLASS_TAG).cstring(class),
                ClassTag::Ref(offset) => self.u32(K_CLASS_MASK | offset),
            };
            self.versioned(1).versioned(2).tnamed(name);
            self.i32(1).i32(4).i32(0).u8(0).u8(u8::from(unsigned)).u32(0);
            self.end().end().end()
        }
    }

    enum ClassTag<'a> {
        New(&'a str),
        Ref(u32),
    }

    /// Array header: byte count, version, TObject, empty name, count, low bound.
    fn leaf_array_header(w: &mut Writer, count: i32) {
        w.versioned(3).tobject().string("").i32(count).i32(0);
    }

    #[test]
    fn leaf_array_resolves_class_references() {
        let key_len = 60;
        let mut w = Writer::default();
        leaf_array_header(&mut w, 3);
        // First element's class tag follows its 4-byte count.
        let class_tag_pos = w.buf.len() + 4;
        w.leaf(ClassTag::New("TLeafI"), "run", true);
        w.u32(0);
        let map_offset = (class_tag_pos + key_len + K_MAP_OFFSET) as u32;
        w.leaf(ClassTag::Ref(map_offset), "lumi", false);
        w.end();

        let mut classes = ClassRefs { origin: key_len + K_MAP_OFFSET, known: Vec::new() };
        let leaves = read_leaf_array(&mut RBuffer::new(&w.buf), &mut classes).unwrap();

        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].class_name, "TLeafI");
        assert_eq!(leaves[0].name, "run");
        assert_eq!((leaves[0].len, leaves[0].len_type), (1, 4));
        assert!(leaves[0].is_unsigned);
        assert_eq!(leaves[1].class_name, "TLeafI");
        assert_eq!(leaves[1].name, "lumi");
        assert!(!leaves[1].is_unsigned);
        assert!(!leaves[1].has_leaf_count);
    }

    #[test]
    fn dangling_class_reference_is_an_error() {
        let mut w = Writer::default();
        leaf_array_header(&mut w, 1);
        w.leaf(ClassTag::Ref(12), "x", false);
        w.end();

        let mut classes = ClassRefs { origin: K_MAP_OFFSET, known: Vec::new() };
        let err = read_leaf_array(&mut RBuffer::new(&w.buf), &mut classes).unwrap_err();
        assert!(matches!(err, RootError::Deserialization(_)));
    }
}
