//! Basket payloads of TTree branches.

use crate::error::{Result, RootError};
use crate::key::Key;
use crate::rbuffer::RBuffer;

/// Read and decompress the basket whose TKey sits at `seek`.
///
/// The returned payload holds the big-endian values of the basket's entries,
/// followed by the entry-offset table when the branch has one.
pub fn read_basket_data(file_data: &[u8], seek: u64, is_large: bool) -> Result<Vec<u8>> {
    let pos = seek as usize;
    if pos >= file_data.len() {
        return Err(RootError::BufferUnderflow { offset: pos, need: 1, have: 0 });
    }
    let mut key = Key::read(&mut RBuffer::at(file_data, pos), is_large)?;
    // Baskets store their own position in fSeekKey only once written; use the one we know.
    key.seek_key = seek;
    key.payload(file_data)
}
