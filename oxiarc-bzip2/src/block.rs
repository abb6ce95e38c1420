//! Per-block compression: RLE1 accumulation, BWT, and the MTF/ZRLE/Huffman
//! back end that turns one logical block into its wire bytes.

use crate::bitsink::BitSink;
use crate::bwt;
use crate::crc::BlockCrc;
use crate::huffman::{
    self, ENCODER_MAX_CODE_LEN, HuffmanTable, MAX_TABLES, MIN_TABLES, SYMBOLS_PER_GROUP,
};
use crate::mtf::MtfList;
use crate::rle::{self, RUNA, RUNB};
use oxiarc_core::error::Result;
use std::io::Write;

/// Accumulates one block's worth of input under RLE1, tracking the
/// symbol-presence bitmap and running CRC as bytes are admitted.
#[derive(Debug)]
pub struct BlockCompressor {
    capacity: usize,
    block: Vec<u8>,
    cur: Option<u8>,
    run: u32,
    presence: [bool; 256],
    crc: BlockCrc,
    any_accepted: bool,
}

impl BlockCompressor {
    /// `capacity` is the logical block size budget (`CompressionLevel::block_size`).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            block: Vec::with_capacity(capacity + 1),
            cur: None,
            run: 0,
            presence: [false; 256],
            crc: BlockCrc::new(),
            any_accepted: false,
        }
    }

    /// True iff no byte has yet been accepted into this block.
    pub fn is_empty(&self) -> bool {
        !self.any_accepted
    }

    /// Admit one input byte. Returns `false` (without mutating state) if the
    /// block is too full to safely absorb the worst-case run emission.
    pub fn write_byte(&mut self, v: u8) -> bool {
        if self.block.len() > self.capacity.saturating_sub(5) {
            return false;
        }
        match self.cur {
            None => {
                self.cur = Some(v);
                self.run = 1;
            }
            Some(c) if c == v && self.run < 254 => {
                self.run += 1;
            }
            Some(c) if c == v => {
                self.emit_run(c, 255);
                self.cur = None;
                self.run = 0;
            }
            Some(c) => {
                self.emit_run(c, self.run);
                self.cur = Some(v);
                self.run = 1;
            }
        }
        self.any_accepted = true;
        true
    }

    /// Admit as many bytes from `data` as the block has room for, stopping
    /// at the first rejection.
    pub fn write_bytes(&mut self, data: &[u8]) -> usize {
        let mut n = 0;
        for &b in data {
            if !self.write_byte(b) {
                break;
            }
            n += 1;
        }
        n
    }

    fn emit_run(&mut self, byte: u8, run: u32) {
        self.crc.update_run(byte, run as usize);
        self.presence[byte as usize] = true;
        let literal = run.min(4);
        for _ in 0..literal {
            self.block.push(byte);
        }
        if run >= 4 {
            let len_byte = (run - 4).min(251) as u8;
            self.block.push(len_byte);
            self.presence[len_byte as usize] = true;
        }
    }

    /// Flush the in-flight run and run BWT/MTF/ZRLE/Huffman, producing
    /// everything needed to write the block except the actual bit output.
    /// This is the expensive, independent-per-block half of block
    /// compression, safe to run off the main thread (see
    /// [`crate::encode::compress_parallel`]).
    pub fn finish(mut self) -> Result<FinishedBlock> {
        if let Some(c) = self.cur.take() {
            self.emit_run(c, self.run);
        }
        let length = self.block.len();
        assert!(length > 0, "BlockCompressor::finish called on an empty block");

        let wrap = self.block[0];
        self.block.push(wrap);
        let (permuted, orig_ptr) = bwt::transform(&self.block, length);
        let crc = self.crc.finalize();
        let backend = HuffmanBackEnd::build(&permuted, &self.presence)?;

        Ok(FinishedBlock {
            orig_ptr,
            crc,
            backend,
        })
    }

    /// Flush, transform, and write the complete block (magic, CRC, orig
    /// pointer, tables, payload) to `sink` in one step.
    pub fn close<W: Write>(self, sink: &mut BitSink<W>) -> Result<u32> {
        let finished = self.finish()?;
        let crc = finished.crc;
        write_finished_block(sink, &finished)?;
        Ok(crc)
    }
}

/// The independent, parallelizable result of compressing one block up to
/// (but not including) writing it onto a shared bit stream.
pub struct FinishedBlock {
    orig_ptr: u32,
    crc: u32,
    backend: HuffmanBackEnd,
}

impl FinishedBlock {
    pub fn crc(&self) -> u32 {
        self.crc
    }
}

/// Write a block already computed by [`BlockCompressor::finish`] onto
/// `sink`. Blocks must be written in order on a single sink since BZip2's
/// bit stream is not byte-aligned between blocks.
pub fn write_finished_block<W: Write>(sink: &mut BitSink<W>, block: &FinishedBlock) -> Result<()> {
    sink.write_bits(24, 0x3141_59)?;
    sink.write_bits(24, 0x2653_59)?;
    sink.write_u32(block.crc)?;
    sink.write_bool(false)?; // randomized flag: never produced by this encoder
    sink.write_bits(24, block.orig_ptr)?;

    block.backend.write(sink)
}

/// Maps present byte values to dense symbol indices `0..K` in ascending
/// order, and back.
struct SymbolAlphabet {
    byte_to_symbol: [u8; 256],
    symbol_to_byte: Vec<u8>,
}

impl SymbolAlphabet {
    fn from_presence(presence: &[bool; 256]) -> Self {
        let mut byte_to_symbol = [0u8; 256];
        let mut symbol_to_byte = Vec::new();
        for (byte, &present) in presence.iter().enumerate() {
            if present {
                byte_to_symbol[byte] = symbol_to_byte.len() as u8;
                symbol_to_byte.push(byte as u8);
            }
        }
        Self {
            byte_to_symbol,
            symbol_to_byte,
        }
    }

    fn len(&self) -> usize {
        self.symbol_to_byte.len()
    }
}

/// Writes the 16+16*popcount-bit symbol-presence bitmap.
pub fn write_presence_bitmap<W: Write>(sink: &mut BitSink<W>, presence: &[bool; 256]) -> Result<()> {
    let mut used_segments = 0u32;
    for seg in 0..16 {
        if presence[seg * 16..seg * 16 + 16].iter().any(|&p| p) {
            used_segments |= 1 << (15 - seg);
        }
    }
    sink.write_bits(16, used_segments)?;
    for seg in 0..16 {
        if used_segments & (1 << (15 - seg)) != 0 {
            let mut bits = 0u32;
            for (i, &present) in presence[seg * 16..seg * 16 + 16].iter().enumerate() {
                if present {
                    bits |= 1 << (15 - i);
                }
            }
            sink.write_bits(16, bits)?;
        }
    }
    Ok(())
}

pub fn read_presence_bitmap<R: std::io::Read>(
    src: &mut crate::bitsource::BitSource<R>,
) -> Result<[bool; 256]> {
    let mut presence = [false; 256];
    let used_segments = src.read_bits(16)?;
    for seg in 0..16 {
        if used_segments & (1 << (15 - seg)) != 0 {
            let bits = src.read_bits(16)?;
            for i in 0..16 {
                if bits & (1 << (15 - i)) != 0 {
                    presence[seg * 16 + i] = true;
                }
            }
        }
    }
    Ok(presence)
}

fn select_num_tables(symbol_count: usize) -> usize {
    match symbol_count {
        n if n < 200 => 2,
        n if n < 600 => 3,
        n if n < 1200 => 4,
        n if n < 2400 => 5,
        _ => 6,
    }
    .clamp(MIN_TABLES, MAX_TABLES)
}

/// Partition the alphabet into `num_tables` contiguous, roughly
/// equal-frequency ranges as a starting point for the iterative refinement,
/// each range getting a cheap placeholder length and everything else an
/// expensive one.
fn seed_initial_lengths(freq: &[u32], alphabet_size: usize, num_tables: usize) -> Vec<Vec<u8>> {
    let mut tables = vec![vec![15u8; alphabet_size]; num_tables];
    let total: u64 = freq.iter().map(|&f| f as u64).sum();
    let mut remaining_freq = total;
    let mut part = num_tables;
    let mut gs: usize = 0;

    while part > 0 {
        let target = if part > 0 { remaining_freq / part as u64 } else { 0 };
        let mut ge: isize = gs as isize - 1;
        let mut acc_freq = 0u64;
        while acc_freq < target && (ge as isize) < alphabet_size as isize - 1 {
            ge += 1;
            acc_freq += freq[ge as usize] as u64;
        }
        if ge > gs as isize
            && part != num_tables
            && part != 1
            && (num_tables - part) % 2 == 1
        {
            acc_freq -= freq[ge as usize] as u64;
            ge -= 1;
        }
        let table_idx = part - 1;
        let ge_usize = ge.max(gs as isize) as usize;
        for v in gs..=ge_usize.min(alphabet_size - 1) {
            tables[table_idx][v] = 0;
        }
        part -= 1;
        gs = ge_usize + 1;
        remaining_freq = remaining_freq.saturating_sub(acc_freq);
    }
    tables
}

/// The MTF/ZRLE/multi-table-Huffman back end: turns one block's BWT output
/// into selectors, per-table code lengths, and the final coded payload.
/// Everything in here is computed before any bits reach the sink, so it can
/// run off the main thread per block (see [`crate::encode::compress_parallel`]).
struct HuffmanBackEnd {
    presence: [bool; 256],
    symbols: Vec<u16>,
    tables: Vec<HuffmanTable>,
    lengths: Vec<Vec<u8>>,
    selectors: Vec<usize>,
}

impl HuffmanBackEnd {
    fn build(permuted: &[u32], presence: &[bool; 256]) -> Result<Self> {
        let alphabet = SymbolAlphabet::from_presence(presence);
        let k = alphabet.len();
        let eob = (k + 1) as u16;
        let alphabet_size = eob as usize + 1;

        let mut mtf = MtfList::new(k);
        let mut symbols = Vec::with_capacity(permuted.len());
        let mut zero_run: u32 = 0;

        for &value in permuted {
            let byte = value as u8;
            let sym = alphabet.byte_to_symbol[byte as usize];
            let d = mtf.access(sym as u16);
            if d == 0 {
                zero_run += 1;
            } else {
                if zero_run > 0 {
                    rle::encode_zero_run(zero_run, |s| symbols.push(s));
                    zero_run = 0;
                }
                symbols.push(d as u16 + 1);
            }
        }
        if zero_run > 0 {
            rle::encode_zero_run(zero_run, |s| symbols.push(s));
        }
        symbols.push(eob);

        let num_tables = select_num_tables(symbols.len());
        let groups: Vec<&[u16]> = symbols.chunks(SYMBOLS_PER_GROUP).collect();
        let num_selectors = groups.len();

        let mut overall_freq = vec![0u32; alphabet_size];
        for &s in &symbols {
            overall_freq[s as usize] += 1;
        }

        let mut lengths = seed_initial_lengths(&overall_freq, alphabet_size, num_tables);
        let mut selectors = vec![0usize; num_selectors];

        const ITERATIONS: usize = 4;
        for _ in 0..ITERATIONS {
            let mut table_freq = vec![vec![0u32; alphabet_size]; num_tables];

            for (gi, group) in groups.iter().enumerate() {
                let mut best_table = 0usize;
                let mut best_cost = u64::MAX;
                for (t, table_lengths) in lengths.iter().enumerate() {
                    let cost: u64 = group
                        .iter()
                        .map(|&s| table_lengths[s as usize] as u64)
                        .sum();
                    if cost < best_cost {
                        best_cost = cost;
                        best_table = t;
                    }
                }
                selectors[gi] = best_table;
                for &s in *group {
                    table_freq[best_table][s as usize] += 1;
                }
            }

            lengths = table_freq
                .iter()
                .map(|f| huffman::allocate_lengths(f, ENCODER_MAX_CODE_LEN))
                .collect();
        }

        let tables: Vec<HuffmanTable> = lengths
            .iter()
            .map(|l| HuffmanTable::from_lengths(l))
            .collect::<Result<_>>()?;

        Ok(Self {
            presence: *presence,
            symbols,
            tables,
            lengths,
            selectors,
        })
    }

    fn write<W: Write>(&self, sink: &mut BitSink<W>) -> Result<()> {
        write_presence_bitmap(sink, &self.presence)?;

        sink.write_bits(3, self.tables.len() as u32)?;
        sink.write_bits(15, self.selectors.len() as u32)?;

        let mut selector_mtf = MtfList::new(self.tables.len());
        for &sel in &self.selectors {
            let d = selector_mtf.access(sel as u16);
            sink.write_unary(d as u32)?;
        }

        for table_lengths in &self.lengths {
            let mut curr = table_lengths[0] as i32;
            sink.write_bits(5, curr as u32)?;
            for &target in table_lengths.iter() {
                let target = target as i32;
                while curr < target {
                    sink.write_bits(2, 0b10)?;
                    curr += 1;
                }
                while curr > target {
                    sink.write_bits(2, 0b11)?;
                    curr -= 1;
                }
                sink.write_bool(false)?;
            }
        }

        let groups: Vec<&[u16]> = self.symbols.chunks(SYMBOLS_PER_GROUP).collect();
        for (gi, group) in groups.iter().enumerate() {
            let table = &self.tables[self.selectors[gi]];
            for &s in *group {
                let (code, len) = table
                    .get_code(s as usize)
                    .expect("symbol must have a code in its selected table");
                sink.write_bits(len, code)?;
            }
        }

        Ok(())
    }
}

/// Decode one block's MTF/ZRLE/Huffman payload back into the permuted BWT
/// byte column, given the symbol-presence bitmap already read from the
/// stream.
pub fn decode_block_payload<R: std::io::Read>(
    src: &mut crate::bitsource::BitSource<R>,
    presence: &[bool; 256],
) -> Result<Vec<u8>> {
    let mut symbol_to_byte = Vec::new();
    for (byte, &present) in presence.iter().enumerate() {
        if present {
            symbol_to_byte.push(byte as u8);
        }
    }
    let k = symbol_to_byte.len();
    let eob = (k + 1) as u16;
    let alphabet_size = eob as usize + 1;

    let num_tables = src.read_bits(3)? as usize;
    let num_selectors = src.read_bits(15)? as usize;

    let mut selector_mtf = MtfList::new(num_tables);
    let mut selectors = Vec::with_capacity(num_selectors);
    for _ in 0..num_selectors {
        let d = src.read_unary()? as usize;
        selectors.push(selector_mtf.symbol_at(d) as usize);
    }

    let mut tables = Vec::with_capacity(num_tables);
    for _ in 0..num_tables {
        let mut curr = src.read_bits(5)? as i32;
        let mut lengths = vec![0u8; alphabet_size];
        for slot in lengths.iter_mut() {
            loop {
                if !src.read_bool()? {
                    break;
                }
                if src.read_bool()? {
                    curr -= 1;
                } else {
                    curr += 1;
                }
            }
            *slot = curr as u8;
        }
        tables.push(HuffmanTable::from_lengths(&lengths)?);
    }

    let mut mtf = MtfList::new(k.max(1));
    let mut zero_acc = rle::ZeroRunAccumulator::new();
    let mut permuted = Vec::new();
    let mut group_idx = 0usize;
    let mut in_group = 0usize;

    'outer: loop {
        if in_group == SYMBOLS_PER_GROUP {
            group_idx += 1;
            in_group = 0;
        }
        let table = &tables[*selectors
            .get(group_idx)
            .ok_or_else(|| oxiarc_core::error::OxiArcError::corrupted(0, "selector underrun"))?];
        let sym = table.decode(src)?;
        in_group += 1;

        match sym {
            s if s == RUNA || s == RUNB => zero_acc.push(s),
            s if s == eob => {
                flush_zero_run(&mut zero_acc, &mut mtf, &symbol_to_byte, &mut permuted);
                break 'outer;
            }
            s => {
                flush_zero_run(&mut zero_acc, &mut mtf, &symbol_to_byte, &mut permuted);
                let d = s as usize - 1;
                let resolved = mtf.symbol_at(d);
                permuted.push(symbol_to_byte[resolved as usize]);
            }
        }
    }

    Ok(permuted)
}

fn flush_zero_run(
    acc: &mut rle::ZeroRunAccumulator,
    mtf: &mut MtfList,
    symbol_to_byte: &[u8],
    out: &mut Vec<u8>,
) {
    if !acc.is_active() {
        return;
    }
    let z = acc.take();
    let resolved = mtf.symbol_at(0);
    for _ in 0..z {
        out.push(symbol_to_byte[resolved as usize]);
    }
}

/// Reverse RLE1: expand literal-run-plus-count-byte encoding back to the
/// original byte stream.
pub fn rle1_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        let mut run = 1;
        while run < 4 && i + run < data.len() && data[i + run] == byte {
            run += 1;
        }
        for _ in 0..run {
            out.push(byte);
        }
        i += run;
        if run == 4 && i < data.len() {
            let extra = data[i] as usize;
            for _ in 0..extra {
                out.push(byte);
            }
            i += 1;
        }
    }
    out
}
