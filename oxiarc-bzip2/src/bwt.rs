//! Burrows-Wheeler Transform for BZip2.
//!
//! The BWT is a reversible transformation that groups similar bytes together,
//! making the data more compressible. BZip2's block layer hands the kernel a
//! buffer one byte longer than the logical block, with `block[length] ==
//! block[0]` as an explicit wrap byte, rather than relying on the kernel to
//! take a modulus of the raw length.

/// Run the forward transform over `block[0..length]`, where `block` has
/// `length + 1` entries and `block[length] == block[0]`.
///
/// Returns the permuted last column (widened to `u32`, though every value
/// fits in a byte) and the row index of the original string in sorted
/// rotation order.
pub fn transform(block: &[u8], length: usize) -> (Vec<u32>, u32) {
    debug_assert_eq!(block.len(), length + 1);
    debug_assert_eq!(block[length], block[0]);
    assert!(length > 0, "BWT: block length must be nonzero");

    let data = &block[..length];
    let n = length;
    let mut indices: Vec<usize> = (0..n).collect();

    // Pre-compute a short prefix key per rotation for cache-friendlier
    // comparisons; fall back to a full rotation comparison on key ties.
    let key_len = n.min(4);
    let mut keys: Vec<u32> = Vec::with_capacity(n);
    for i in 0..n {
        let mut key = 0u32;
        for j in 0..key_len {
            key = (key << 8) | (data[(i + j) % n] as u32);
        }
        keys.push(key);
    }

    indices.sort_by(|&a, &b| {
        match keys[a].cmp(&keys[b]) {
            std::cmp::Ordering::Equal => {
                for i in key_len..n {
                    let byte_a = data[(a + i) % n];
                    let byte_b = data[(b + i) % n];
                    match byte_a.cmp(&byte_b) {
                        std::cmp::Ordering::Equal => continue,
                        other => return other,
                    }
                }
                std::cmp::Ordering::Equal
            }
            other => other,
        }
    });

    let orig_ptr = indices
        .iter()
        .position(|&i| i == 0)
        .expect("BWT: index 0 must exist in sorted indices") as u32;

    let permuted: Vec<u32> = indices
        .iter()
        .map(|&i| data[(i + n - 1) % n] as u32)
        .collect();

    (permuted, orig_ptr)
}

/// Reconstruct the original `length`-byte block from the permuted last
/// column and its origin pointer.
pub fn inverse_transform(permuted: &[u8], orig_ptr: u32, length: usize) -> Vec<u8> {
    if length == 0 {
        return Vec::new();
    }
    debug_assert_eq!(permuted.len(), length);

    let n = length;
    let mut counts = [0usize; 256];
    for &byte in permuted {
        counts[byte as usize] += 1;
    }

    let mut cumulative = [0usize; 256];
    let mut total = 0;
    for i in 0..256 {
        cumulative[i] = total;
        total += counts[i];
    }

    let mut next = vec![0usize; n];
    let mut positions = cumulative;
    for (i, &byte) in permuted.iter().enumerate() {
        next[positions[byte as usize]] = i;
        positions[byte as usize] += 1;
    }

    let mut result = Vec::with_capacity(n);
    let mut idx = next[orig_ptr as usize];
    for _ in 0..n {
        result.push(permuted[idx]);
        idx = next[idx];
    }

    result
}

/// Build the `length + 1` wrap-byte buffer the forward transform expects.
pub fn wrap_block(data: &[u8]) -> Vec<u8> {
    let mut block = Vec::with_capacity(data.len() + 1);
    block.extend_from_slice(data);
    block.push(data.first().copied().unwrap_or(0));
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let block = wrap_block(data);
        let (permuted, ptr) = transform(&block, data.len());
        let permuted_bytes: Vec<u8> = permuted.iter().map(|&v| v as u8).collect();
        let recovered = inverse_transform(&permuted_bytes, ptr, data.len());
        assert_eq!(recovered, data, "failed for {:?}", data);
    }

    #[test]
    fn single_byte() {
        let block = wrap_block(b"a");
        let (permuted, ptr) = transform(&block, 1);
        assert_eq!(permuted, vec![b'a' as u32]);
        assert_eq!(ptr, 0);
    }

    #[test]
    fn banana_roundtrips() {
        roundtrip(b"banana");
    }

    #[test]
    fn mixed_cases_roundtrip() {
        for data in [
            b"hello world".as_slice(),
            b"abracadabra",
            b"mississippi",
            b"aaaaa",
            b"abcde",
            b"the quick brown fox jumps over the lazy dog",
        ] {
            roundtrip(data);
        }
    }

    #[test]
    fn groups_similar_bytes() {
        let data = b"abababab";
        let block = wrap_block(data);
        let (permuted, _) = transform(&block, data.len());
        let mut runs = 1;
        for i in 1..permuted.len() {
            if permuted[i] != permuted[i - 1] {
                runs += 1;
            }
        }
        assert!(runs <= 4, "BWT should group similar bytes");
    }
}
