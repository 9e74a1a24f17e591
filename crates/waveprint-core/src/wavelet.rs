//! 2-D Haar decomposition and top-wavelet bit encoding
//!
//! A fingerprint image is decomposed with the standard 2-D Haar transform
//! (full decomposition of every row, then of every column, using the
//! averaging/differencing form). The `top_wavelets` largest coefficients by
//! absolute magnitude are kept as their signs; everything else becomes zero.
//! The resulting signed-ternary vector is serialized two bits per cell.

use std::cmp::Ordering;

use crate::image::FingerprintImage;

/// In-place standard 2-D Haar decomposition.
///
/// Rows are transformed first (log2(cols) levels), then columns
/// (log2(rows) levels). All coefficients are treated uniformly; there is no
/// level-dependent gain.
pub fn decompose(image: &mut FingerprintImage) {
    let rows = image.rows();
    let cols = image.cols();
    let data = image.as_mut_slice();

    let mut scratch = vec![0.0_f32; rows.max(cols)];

    for r in 0..rows {
        haar_1d(&mut data[r * cols..(r + 1) * cols], &mut scratch);
    }

    let mut column = vec![0.0_f32; rows];
    for c in 0..cols {
        for r in 0..rows {
            column[r] = data[r * cols + c];
        }
        haar_1d(&mut column, &mut scratch);
        for r in 0..rows {
            data[r * cols + c] = column[r];
        }
    }
}

/// Full 1-D Haar decomposition: averages in the front half, differences in
/// the back, repeated until one average remains. `data.len()` must be a
/// power of two.
fn haar_1d(data: &mut [f32], scratch: &mut [f32]) {
    let mut len = data.len();
    while len > 1 {
        let half = len / 2;
        for i in 0..half {
            let a = data[2 * i];
            let b = data[2 * i + 1];
            scratch[i] = (a + b) / 2.0;
            scratch[half + i] = (a - b) / 2.0;
        }
        data[..len].copy_from_slice(&scratch[..len]);
        len = half;
    }
}

/// Select the `top_wavelets` coefficients and serialize their signs.
///
/// Ordering is by absolute magnitude descending; equal magnitudes at the
/// cut boundary break ties by row-major linear index ascending, which keeps
/// the output deterministic. Retained coefficients map to `+1` when the
/// original value is non-negative and `-1` otherwise.
pub fn encode_top_wavelets(image: &FingerprintImage, top_wavelets: usize) -> Vec<u8> {
    let data = image.as_slice();
    let cells = data.len();
    debug_assert!(top_wavelets <= cells);

    let mut order: Vec<usize> = (0..cells).collect();
    order.sort_unstable_by(|&a, &b| {
        data[b]
            .abs()
            .partial_cmp(&data[a].abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });

    let mut bits = vec![0u8; signature_bytes(cells)];
    for &cell in order.iter().take(top_wavelets) {
        if data[cell] >= 0.0 {
            set_bit(&mut bits, 2 * cell + 1);
        } else {
            set_bit(&mut bits, 2 * cell);
        }
    }
    bits
}

/// Serialize a signed-ternary vector to the two-bits-per-cell layout.
pub fn encode_ternary(values: &[i8]) -> Vec<u8> {
    let mut bits = vec![0u8; signature_bytes(values.len())];
    for (cell, &v) in values.iter().enumerate() {
        match v.cmp(&0) {
            Ordering::Greater => set_bit(&mut bits, 2 * cell + 1),
            Ordering::Less => set_bit(&mut bits, 2 * cell),
            Ordering::Equal => {}
        }
    }
    bits
}

/// Parse the two-bits-per-cell layout back into a signed-ternary vector.
pub fn decode_ternary(bits: &[u8], cells: usize) -> Vec<i8> {
    (0..cells)
        .map(|cell| {
            let neg = get_bit(bits, 2 * cell);
            let pos = get_bit(bits, 2 * cell + 1);
            match (pos, neg) {
                (true, false) => 1,
                (false, true) => -1,
                _ => 0,
            }
        })
        .collect()
}

/// Count cells whose bit pair is nonzero.
pub fn count_nonzero_cells(bits: &[u8], cells: usize) -> usize {
    (0..cells)
        .filter(|&cell| get_bit(bits, 2 * cell) || get_bit(bits, 2 * cell + 1))
        .count()
}

/// Hamming distance between two serialized fingerprints.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x ^ y).count_ones())
        .sum()
}

/// Hamming similarity: `1 - distance / total_bits`.
pub fn similarity(a: &[u8], b: &[u8], total_bits: usize) -> f32 {
    1.0 - hamming_distance(a, b) as f32 / total_bits as f32
}

fn signature_bytes(cells: usize) -> usize {
    (2 * cells + 7) / 8
}

/// Serialized fingerprints are little-endian by cell index: bit `k` lives in
/// byte `k / 8` at position `k % 8`.
fn set_bit(bits: &mut [u8], k: usize) {
    bits[k / 8] |= 1 << (k % 8);
}

fn get_bit(bits: &[u8], k: usize) -> bool {
    bits[k / 8] & (1 << (k % 8)) != 0
}
