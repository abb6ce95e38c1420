//! Canonical Huffman coding for BZip2.
//!
//! BZip2 keeps up to [`MAX_TABLES`] independent Huffman tables per block and
//! switches between them every [`SYMBOLS_PER_GROUP`] symbols, selecting
//! lengths with a length-limited package-merge allocator rather than a plain
//! Huffman tree so no code ever exceeds [`MAX_CODE_LEN`] bits.

use crate::bitsource::BitSource;
use oxiarc_core::error::{OxiArcError, Result};
use std::io::Read;

/// Structural bound on a canonical table's code length: the `base`/`limit`
/// tables and the bit-at-a-time decoder never need to exceed this even
/// though the encoder caps lengths much tighter (see
/// [`ENCODER_MAX_CODE_LEN`]).
pub const MAX_CODE_LEN: u8 = 20;
/// Length cap the encoder's allocator is fed: every emitted code is at most
/// this many bits.
pub const ENCODER_MAX_CODE_LEN: u8 = 17;
pub const SYMBOLS_PER_GROUP: usize = 50;
pub const MAX_TABLES: usize = 6;
pub const MIN_TABLES: usize = 2;

/// A single canonical Huffman table: code lengths plus the lookup
/// structures needed for both encoding and bit-at-a-time decoding.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    lengths: Vec<u8>,
    /// Canonical code per symbol, valid for encoding directly.
    codes: Vec<u32>,
    min_len: u8,
    max_len: u8,
    /// Per-length starting code value.
    base: Vec<u32>,
    /// Per-length largest valid code value (exclusive of shorter matches).
    limit: Vec<i64>,
    /// Per-length starting index into `perm`.
    base_index: Vec<u32>,
    /// Symbols ordered by (length, symbol) ascending.
    perm: Vec<u16>,
}

impl HuffmanTable {
    /// Build a canonical table from per-symbol code lengths (0 = absent;
    /// `alphabet_size` is `lengths.len()`).
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        let min_len = lengths
            .iter()
            .filter(|&&l| l > 0)
            .copied()
            .min()
            .ok_or_else(|| OxiArcError::corrupted(0, "Huffman table has no symbols"))?;
        let max_len = lengths.iter().copied().max().unwrap_or(0);

        if max_len > MAX_CODE_LEN {
            return Err(OxiArcError::corrupted(0, "Huffman code length exceeds limit"));
        }

        let mut count = vec![0u32; max_len as usize + 1];
        for &l in lengths {
            if l > 0 {
                count[l as usize] += 1;
            }
        }

        // perm: symbols grouped by ascending length, ascending symbol index within each length.
        let mut perm = Vec::with_capacity(lengths.len());
        for len in min_len..=max_len {
            for (sym, &l) in lengths.iter().enumerate() {
                if l == len {
                    perm.push(sym as u16);
                }
            }
        }

        let mut base = vec![0u32; max_len as usize + 1];
        let mut limit = vec![-1i64; max_len as usize + 1];
        let mut base_index = vec![0u32; max_len as usize + 1];
        let mut code: u32 = 0;
        let mut index: u32 = 0;
        for len in min_len..=max_len {
            base[len as usize] = code;
            base_index[len as usize] = index;
            index += count[len as usize];
            code += count[len as usize];
            limit[len as usize] = code as i64 - 1;
            code <<= 1;
        }

        let mut codes = vec![0u32; lengths.len()];
        let mut assign = base.clone();
        for len in min_len..=max_len {
            for (sym, &l) in lengths.iter().enumerate() {
                if l == len {
                    codes[sym] = assign[len as usize];
                    assign[len as usize] += 1;
                }
            }
        }

        Ok(Self {
            lengths: lengths.to_vec(),
            codes,
            min_len,
            max_len,
            base,
            limit,
            base_index,
            perm,
        })
    }

    /// The `(code, length)` pair for `symbol`, for writing onto a bit sink.
    pub fn get_code(&self, symbol: usize) -> Option<(u32, u8)> {
        let len = *self.lengths.get(symbol)?;
        if len == 0 {
            return None;
        }
        Some((self.codes[symbol], len))
    }

    /// Estimated bit cost of encoding `symbol` with this table.
    pub fn cost(&self, symbol: usize) -> u32 {
        self.lengths.get(symbol).copied().unwrap_or(0) as u32
    }

    /// Decode one symbol by walking one bit at a time until the accumulated
    /// code falls within a known length class.
    pub fn decode<R: Read>(&self, src: &mut BitSource<R>) -> Result<u16> {
        let mut len = self.min_len;
        let mut code = src.read_bits(len)? as i64;
        loop {
            if len > self.max_len {
                return Err(OxiArcError::InvalidHuffmanCode { bit_position: 0 });
            }
            if code <= self.limit[len as usize] {
                let offset = code - self.base[len as usize] as i64;
                let idx = self.base_index[len as usize] as i64 + offset;
                return Ok(self.perm[idx as usize]);
            }
            code = (code << 1) | src.read_bool()? as i64;
            len += 1;
        }
    }

    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }
}

/// Allocate length-limited canonical code lengths from symbol frequencies,
/// minimizing total weighted length subject to `length <= max_length`.
///
/// Zero-frequency symbols still receive a valid length so every symbol in
/// the alphabet remains encodable.
pub fn allocate_lengths(freq: &[u32], max_length: u8) -> Vec<u8> {
    let n = freq.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1];
    }
    package_merge(freq, max_length as usize)
}

fn package_merge(freq: &[u32], lim: usize) -> Vec<u8> {
    let n = freq.len();
    let mut by_freq: Vec<(usize, u64)> = freq
        .iter()
        .enumerate()
        .map(|(i, &f)| (i, (f as u64).max(1)))
        .collect();
    by_freq.sort_by(|a, b| b.1.cmp(&a.1));
    let order: Vec<usize> = by_freq.iter().map(|&(i, _)| i).collect();
    let sorted_freq: Vec<u64> = by_freq.iter().map(|&(_, f)| f).collect();

    let mut max_elem = vec![0usize; lim];
    let mut b = vec![0usize; lim];
    let mut excess = (1usize << lim) - n;
    let half = 1usize << (lim - 1);
    max_elem[lim - 1] = n;
    for j in 0..lim {
        if excess >= half {
            b[j] = 1;
            excess -= half;
        }
        excess <<= 1;
        if lim >= 2 + j {
            max_elem[lim - 2 - j] = max_elem[lim - 1 - j] / 2 + n;
        }
    }
    max_elem[0] = b[0];
    for j in 1..lim {
        if max_elem[j] > 2 * max_elem[j - 1] + b[j] {
            max_elem[j] = 2 * max_elem[j - 1] + b[j];
        }
    }

    let mut val: Vec<Vec<u64>> = (0..lim).map(|i| vec![0u64; max_elem[i]]).collect();
    let mut ty: Vec<Vec<usize>> = (0..lim).map(|i| vec![0usize; max_elem[i]]).collect();
    let mut counts = vec![lim; n];

    for (t, &f) in sorted_freq.iter().enumerate().take(max_elem[lim - 1]) {
        val[lim - 1][t] = f;
        ty[lim - 1][t] = t;
    }

    let mut cur = vec![0usize; lim];
    if b[lim - 1] == 1 {
        counts[0] -= 1;
        cur[lim - 1] += 1;
    }

    let mut j = lim - 1;
    while j > 0 {
        let mut i = 0usize;
        let mut next = cur[j];
        for t in 0..max_elem[j - 1] {
            let weight = if next + 1 < max_elem[j] {
                val[j][next] + val[j][next + 1]
            } else {
                0
            };
            if weight > sorted_freq[i] {
                val[j - 1][t] = weight;
                ty[j - 1][t] = n;
                next += 2;
            } else {
                val[j - 1][t] = sorted_freq[i];
                ty[j - 1][t] = i;
                i += 1;
                if i >= n {
                    break;
                }
            }
        }
        j -= 1;
        cur[j] = 0;
        if b[j] == 1 {
            take_package(&ty, &mut counts, &mut cur, j, n);
        }
    }

    let mut lengths = vec![0u8; n];
    for (sorted_pos, &orig_idx) in order.iter().enumerate() {
        lengths[orig_idx] = counts[sorted_pos] as u8;
    }
    lengths
}

fn take_package(ty: &[Vec<usize>], counts: &mut [usize], cur: &mut [usize], i: usize, n: usize) {
    let x = ty[i][cur[i]];
    if x == n {
        take_package(ty, counts, cur, i + 1, n);
        take_package(ty, counts, cur, i + 1, n);
    } else {
        counts[x] -= 1;
    }
    cur[i] += 1;
}
