//! ROOT compression blocks (ZL = zlib, L4 = LZ4, ZS = ZSTD, XZ = LZMA).
//!
//! A compressed record is a sequence of blocks, each with a 9-byte header:
//! ```text
//! bytes 0-1:  algorithm tag
//! byte  2:    method (ignored)
//! bytes 3-5:  compressed size   (3-byte little-endian)
//! bytes 6-8:  uncompressed size (3-byte little-endian)
//! ```

use std::cell::RefCell;
use std::io::Read;

use crate::error::{Result, RootError};

const HEADER_LEN: usize = 9;

thread_local! {
    static ZSTD_DECODER: RefCell<ruzstd::decoding::FrameDecoder> =
        RefCell::new(ruzstd::decoding::FrameDecoder::new());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Zlib,
    Lz4,
    Zstd,
    Xz,
}

impl Codec {
    fn from_tag(tag: &[u8]) -> Result<Self> {
        match tag {
            b"ZL" => Ok(Codec::Zlib),
            b"L4" => Ok(Codec::Lz4),
            b"ZS" => Ok(Codec::Zstd),
            b"XZ" => Ok(Codec::Xz),
            _ => Err(RootError::Decompression(format!(
                "unsupported compression algorithm: {:?}",
                String::from_utf8_lossy(tag)
            ))),
        }
    }

    fn inflate(self, data: &[u8], expected: usize) -> Result<Vec<u8>> {
        match self {
            Codec::Zlib => inflate_zlib(data, expected),
            Codec::Lz4 => inflate_lz4(data, expected),
            Codec::Zstd => inflate_zstd(data, expected),
            Codec::Xz => inflate_xz(data, expected),
        }
    }
}

/// Decompress a ROOT record into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut offset = 0;

    while out.len() < expected_len && offset + HEADER_LEN <= src.len() {
        let header = &src[offset..offset + HEADER_LEN];
        let codec = Codec::from_tag(&header[0..2])?;
        let c_size = read_le24(&header[3..6]);
        let u_size = read_le24(&header[6..9]);
        offset += HEADER_LEN;

        let end = offset + c_size;
        if end > src.len() {
            return Err(RootError::Decompression(format!(
                "compressed block claims {} bytes but only {} remain",
                c_size,
                src.len() - offset
            )));
        }

        let block = codec.inflate(&src[offset..end], u_size)?;
        if block.len() != u_size {
            return Err(RootError::Decompression(format!(
                "{:?} block: expected {} uncompressed bytes, got {}",
                codec,
                u_size,
                block.len()
            )));
        }
        out.extend_from_slice(&block);
        offset = end;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "total decompressed length {} != expected {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}

fn inflate_zlib(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| RootError::Decompression(format!("zlib: {}", e)))?;
    Ok(out)
}

fn inflate_lz4(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    // An 8-byte xxhash64 checksum precedes the LZ4 payload; it is not verified.
    let payload = data
        .get(8..)
        .ok_or_else(|| RootError::Decompression("LZ4 block too small for checksum".into()))?;
    lz4_flex::decompress(payload, expected)
        .map_err(|e| RootError::Decompression(format!("lz4: {}", e)))
}

fn inflate_zstd(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; expected];
    let written = ZSTD_DECODER
        .with(|cell| cell.borrow_mut().decode_all(data, &mut out))
        .map_err(|e| RootError::Decompression(format!("zstd: {}", e)))?;
    out.truncate(written);
    Ok(out)
}

fn inflate_xz(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    lzma_rs::xz_decompress(&mut std::io::BufReader::new(data), &mut out)
        .map_err(|e| RootError::Decompression(format!("xz: {}", e)))?;
    Ok(out)
}

fn read_le24(b: &[u8]) -> usize {
    b[0] as usize | ((b[1] as usize) << 8) | ((b[2] as usize) << 16)
}
