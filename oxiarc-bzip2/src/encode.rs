//! BZip2 encoder: stream framing around [`crate::block::BlockCompressor`].

use crate::bitsink::BitSink;
use crate::block::BlockCompressor;
use crate::crc::combine;
use crate::{BZIP2_MAGIC, CompressionLevel};
use oxiarc_core::error::Result;
use std::io::Write;

#[cfg(feature = "parallel")]
use crate::block::{self, FinishedBlock};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// BZip2 encoder.
pub struct BzEncoder<W: Write> {
    sink: BitSink<W>,
    level: CompressionLevel,
    combined_crc: u32,
}

impl<W: Write> BzEncoder<W> {
    /// Create a new encoder, writing the stream header immediately.
    pub fn new(writer: W, level: CompressionLevel) -> Result<Self> {
        let mut sink = BitSink::new(writer);
        sink.write_bits(8, BZIP2_MAGIC[0] as u32)?;
        sink.write_bits(8, BZIP2_MAGIC[1] as u32)?;
        sink.write_bits(8, b'h' as u32)?;
        sink.write_bits(8, (b'0' + level.level()) as u32)?;

        Ok(Self {
            sink,
            level,
            combined_crc: 0,
        })
    }

    /// Compress `data` as one or more blocks sized to this encoder's level.
    pub fn write_block(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0;
        let block_size = self.level.block_size();
        while offset < data.len() {
            let mut block = BlockCompressor::new(block_size);
            let accepted = block.write_bytes(&data[offset..]);
            if accepted == 0 {
                break;
            }
            let block_crc = block.close(&mut self.sink)?;
            self.combined_crc = combine(self.combined_crc, block_crc);
            offset += accepted;
        }
        Ok(())
    }

    /// Write the stream footer (EOS marker + combined CRC) and return the
    /// underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.sink.write_bits(24, 0x1772_45)?;
        self.sink.write_bits(24, 0x3850_90)?;
        self.sink.write_u32(self.combined_crc)?;
        self.sink.into_inner()
    }
}

/// Compress `data` in one call at the given level.
pub fn compress(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::new(), level)?;
    if !data.is_empty() {
        encoder.write_block(data)?;
    }
    encoder.finish()
}

/// Compress `data` using independent per-block parallelism (requires the
/// `parallel` feature).
///
/// Each block's RLE1/BWT/MTF/ZRLE/Huffman-table work runs concurrently via
/// rayon; only the final bit-level writes, which must stay byte- and
/// bit-aligned across blocks, happen sequentially on the main thread.
#[cfg(feature = "parallel")]
pub fn compress_parallel(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut sink = BitSink::new(Vec::new());
    sink.write_bits(8, BZIP2_MAGIC[0] as u32)?;
    sink.write_bits(8, BZIP2_MAGIC[1] as u32)?;
    sink.write_bits(8, b'h' as u32)?;
    sink.write_bits(8, (b'0' + level.level()) as u32)?;

    let block_size = level.block_size();
    let chunks: Vec<&[u8]> = if data.is_empty() {
        Vec::new()
    } else {
        data.chunks(block_size).collect()
    };

    let finished: Vec<Result<FinishedBlock>> = chunks
        .par_iter()
        .map(|chunk| {
            let mut block = BlockCompressor::new(block_size);
            block.write_bytes(chunk);
            block.finish()
        })
        .collect();

    let mut combined_crc = 0u32;
    for result in finished {
        let finished_block = result?;
        combined_crc = combine(combined_crc, finished_block.crc());
        block::write_finished_block(&mut sink, &finished_block)?;
    }

    sink.write_bits(24, 0x1772_45)?;
    sink.write_bits(24, 0x3850_90)?;
    sink.write_u32(combined_crc)?;
    sink.into_inner()
}
