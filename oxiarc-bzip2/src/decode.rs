//! BZip2 decoder: stream framing around [`crate::block::decode_block_payload`].

use crate::bitsource::BitSource;
use crate::block;
use crate::bwt;
use crate::crc::{combine, BlockCrc};
use crate::BZIP2_MAGIC;
use oxiarc_core::error::{OxiArcError, Result};
use std::io::Read;

const BLOCK_MAGIC_HI: u32 = 0x3141_59;
const BLOCK_MAGIC_LO: u32 = 0x2653_59;
const EOS_MAGIC_HI: u32 = 0x1772_45;
const EOS_MAGIC_LO: u32 = 0x3850_90;

/// BZip2 decoder.
pub struct BzDecoder<R: Read> {
    src: BitSource<R>,
    combined_crc: u32,
}

impl<R: Read> BzDecoder<R> {
    /// Create a new decoder, validating the stream header immediately.
    pub fn new(reader: R) -> Result<Self> {
        let mut src = BitSource::new(reader);
        let b0 = src.read_bits(8)? as u8;
        let b1 = src.read_bits(8)? as u8;
        if [b0, b1] != BZIP2_MAGIC {
            return Err(OxiArcError::corrupted(0, "not a bzip2 stream"));
        }
        let h = src.read_bits(8)? as u8;
        if h != b'h' {
            return Err(OxiArcError::corrupted(0, "missing bzip2 'h' marker"));
        }
        let level = src.read_bits(8)? as u8;
        if !(b'1'..=b'9').contains(&level) {
            return Err(OxiArcError::corrupted(0, "invalid bzip2 level digit"));
        }

        Ok(Self {
            src,
            combined_crc: 0,
        })
    }

    /// Decode and return the next block, or `None` once the end-of-stream
    /// marker has been consumed and the combined CRC verified.
    pub fn read_block(&mut self) -> Result<Option<Vec<u8>>> {
        let hi = self.src.read_bits(24)?;
        let lo = self.src.read_bits(24)?;

        if hi == EOS_MAGIC_HI && lo == EOS_MAGIC_LO {
            let stored = self.src.read_u32()?;
            if stored != self.combined_crc {
                return Err(OxiArcError::crc_mismatch(stored, self.combined_crc));
            }
            return Ok(None);
        }
        if hi != BLOCK_MAGIC_HI || lo != BLOCK_MAGIC_LO {
            return Err(OxiArcError::corrupted(0, "unrecognized block magic"));
        }

        let stored_crc = self.src.read_u32()?;
        let _randomized = self.src.read_bool()?;
        let orig_ptr = self.src.read_bits(24)?;

        let presence = block::read_presence_bitmap(&mut self.src)?;
        let permuted = block::decode_block_payload(&mut self.src, &presence)?;
        let length = permuted.len();
        let unpermuted = bwt::inverse_transform(&permuted, orig_ptr, length);
        let output = block::rle1_decode(&unpermuted);

        let mut crc = BlockCrc::new();
        crc.update_slice(&output);
        let actual_crc = crc.finalize();
        if actual_crc != stored_crc {
            return Err(OxiArcError::crc_mismatch(stored_crc, actual_crc));
        }
        self.combined_crc = combine(self.combined_crc, actual_crc);

        Ok(Some(output))
    }
}

/// Decompress a complete bzip2 stream in one call.
pub fn decompress<R: Read>(reader: R) -> Result<Vec<u8>> {
    let mut decoder = BzDecoder::new(reader)?;
    let mut out = Vec::new();
    while let Some(block) = decoder.read_block()? {
        out.extend_from_slice(&block);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::compress;
    use crate::CompressionLevel;

    #[test]
    fn rejects_non_bzip2_header() {
        let err = BzDecoder::new(&b"not a stream"[..]);
        assert!(err.is_err());
    }

    #[test]
    fn roundtrips_through_compress() {
        let data = b"the quick brown fox jumps over the lazy dog, repeatedly and with feeling";
        let compressed = compress(data, CompressionLevel::new(1)).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data.as_slice());
    }

    #[test]
    fn roundtrips_empty_stream() {
        let compressed = compress(b"", CompressionLevel::new(1)).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, b"");
    }

    #[test]
    fn roundtrips_multi_block_stream() {
        let level = CompressionLevel::new(1);
        let data = vec![b'x'; level.block_size() * 2 + 123];
        let compressed = compress(&data, level).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn detects_corrupted_block_crc() {
        let data = b"some reasonably compressible text text text text";
        let mut compressed = compress(data, CompressionLevel::new(1)).unwrap();
        let last = compressed.len() - 1;
        compressed[last] ^= 0xFF;
        assert!(decompress(&compressed[..]).is_err());
    }
}
