//! Big-endian cursor over ROOT streamer bytes.

use crate::error::{Result, RootError};

/// `kByteCountMask`: set on the first u32 of a streamed object that carries a byte count.
pub const K_BYTE_COUNT_MASK: u32 = 0x4000_0000;

/// `kIsReferenced` bit in `TObject::fBits`.
const K_IS_REFERENCED: u32 = 0x0000_0010;

/// A cursor-based reader over a byte slice, using ROOT's big-endian conventions.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RBuffer<'a> {
    /// Reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reader positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move the cursor to an absolute position.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Borrow the next `n` bytes and advance.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a one-byte `Bool_t`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    /// Read a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// Read a big-endian i32.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_be_bytes)
    }

    /// Read a big-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_be_bytes)
    }

    /// Read a big-endian i64.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_be_bytes)
    }

    /// Read a big-endian f64.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_be_bytes)
    }

    /// Read a `TString`: one length byte, or 255 followed by a u32 length.
    pub fn read_string(&mut self) -> Result<String> {
        let first = self.read_u8()?;
        let len = if first == 255 { self.read_u32()? as usize } else { first as usize };
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a NUL-terminated string (class names in object tags).
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let nul = rest.iter().position(|&b| b == 0).ok_or(RootError::BufferUnderflow {
            offset: self.pos,
            need: rest.len() + 1,
            have: rest.len(),
        })?;
        let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(s)
    }

    /// Read a streamer version header.
    ///
    /// Returns `(version, end_pos)`; `end_pos` is the absolute position where
    /// the object ends when a byte count is present.
    pub fn read_version(&mut self) -> Result<(u16, Option<usize>)> {
        let start = self.pos;
        let raw = self.read_u32()?;
        if raw & K_BYTE_COUNT_MASK != 0 {
            let byte_count = (raw & !K_BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok((version, Some(start + 4 + byte_count)))
        } else {
            // No byte count: the first two bytes were already the version.
            self.pos = start + 2;
            Ok(((raw >> 16) as u16, None))
        }
    }

    /// Read a `TObject` header and return `fBits`.
    pub fn read_tobject(&mut self) -> Result<u32> {
        let _version = self.read_u16()?;
        let _unique_id = self.read_u32()?;
        let bits = self.read_u32()?;
        if bits & K_IS_REFERENCED != 0 {
            self.skip(2)?; // pidf
        }
        Ok(bits)
    }

    /// Read a `TNamed`: versioned `TObject` plus name and title.
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let (_ver, end) = self.read_version()?;
        self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        if let Some(end) = end {
            self.pos = end;
        }
        Ok((name, title))
    }

    /// Skip a versioned object using its byte count.
    pub fn skip_versioned(&mut self) -> Result<()> {
        let (_ver, end) = self.read_version()?;
        match end {
            Some(end) => {
                self.pos = end;
                Ok(())
            }
            None => Err(RootError::Deserialization(format!(
                "cannot skip object without byte count at {}",
                self.pos
            ))),
        }
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos.checked_add(n).is_none_or(|end| end > self.data.len()) {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_scalars() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x0102_0304u32.to_be_bytes());
        data.extend_from_slice(&(-7i64).to_be_bytes());
        data.extend_from_slice(&2.5f64.to_be_bytes());
        data.push(1);
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_u32().unwrap(), 0x0102_0304);
        assert_eq!(r.read_i64().unwrap(), -7);
        assert_eq!(r.read_f64().unwrap(), 2.5);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn underflow_reports_position() {
        let data = [0u8; 3];
        let mut r = RBuffer::at(&data, 1);
        match r.read_u32() {
            Err(RootError::BufferUnderflow { offset, need, have }) => {
                assert_eq!((offset, need, have), (1, 4, 2));
            }
            other => panic!("expected underflow, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn long_string_uses_u32_length() {
        let text = "x".repeat(300);
        let mut data = vec![255u8];
        data.extend_from_slice(&300u32.to_be_bytes());
        data.extend_from_slice(text.as_bytes());
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_string().unwrap(), text);
    }

    #[test]
    fn cstring_stops_at_nul() {
        let data = b"TLeafD\0rest";
        let mut r = RBuffer::new(data);
        assert_eq!(r.read_cstring().unwrap(), "TLeafD");
        assert_eq!(r.pos(), 7);
        let mut r = RBuffer::new(b"unterminated");
        assert!(r.read_cstring().is_err());
    }

    #[test]
    fn version_with_and_without_byte_count() {
        let mut data = Vec::new();
        data.extend_from_slice(&(K_BYTE_COUNT_MASK | 6).to_be_bytes());
        data.extend_from_slice(&19u16.to_be_bytes());
        data.extend_from_slice(&[0u8; 4]);
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_version().unwrap(), (19, Some(10)));

        let data = [0x00, 0x05, 0xAA, 0xBB];
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_version().unwrap(), (5, None));
        assert_eq!(r.pos(), 2);
    }
}
