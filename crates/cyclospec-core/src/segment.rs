//! Block Segmenter
//!
//! Frames a signal into `P = ⌊(L − ws)/step⌋ + 1` overlapping blocks of
//! `ws` samples, block `i` starting at offset `i·step`:
//!
//! ```text
//! signal:  |-------------------------------------------|  L samples
//! block 0: |======ws======|
//! block 1:      |======ws======|
//! block 2:           |======ws======|
//!          <step>                          <- dropped tail ->
//! ```
//!
//! A [`SegmentMatrix`] is a view: it only stores the borrowed signal plus
//! the framing parameters and resolves blocks by offset arithmetic. Blocks
//! are copied into owned buffers only when a transform needs them.

use ndarray::Array2;

use crate::types::{CycloError, CycloResult};

/// Read-only view of a signal framed into fixed-length blocks.
#[derive(Debug, Clone, Copy)]
pub struct SegmentMatrix<'a, T> {
    signal: &'a [T],
    window_size: usize,
    step: usize,
    num_blocks: usize,
}

/// Frame `signal` into blocks of `window_size` samples spaced `step` apart.
///
/// Samples after the last complete block are dropped.
pub fn segment<T>(signal: &[T], window_size: usize, step: usize) -> CycloResult<SegmentMatrix<'_, T>> {
    if window_size == 0 {
        return Err(CycloError::InvalidParameter(
            "window_size must be > 0".to_string(),
        ));
    }
    if step == 0 {
        return Err(CycloError::InvalidParameter("step must be > 0".to_string()));
    }
    if window_size > signal.len() {
        return Err(CycloError::DimensionMismatch {
            window_size,
            signal_len: signal.len(),
        });
    }

    Ok(SegmentMatrix {
        signal,
        window_size,
        step,
        num_blocks: block_count(signal.len(), window_size, step),
    })
}

/// Number of complete blocks for the given framing.
///
/// Callers must ensure `window_size <= len` and `step > 0`.
pub fn block_count(len: usize, window_size: usize, step: usize) -> usize {
    (len - window_size) / step + 1
}

impl<'a, T> SegmentMatrix<'a, T> {
    /// Number of blocks (P).
    pub fn len(&self) -> usize {
        self.num_blocks
    }

    /// Always false for a successfully constructed matrix.
    pub fn is_empty(&self) -> bool {
        self.num_blocks == 0
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Offset of block `index` within the signal.
    pub fn offset(&self, index: usize) -> usize {
        index * self.step
    }

    /// Block `index` as a borrowed slice.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn block(&self, index: usize) -> &'a [T] {
        assert!(index < self.num_blocks, "block index {} out of range", index);
        let start = self.offset(index);
        &self.signal[start..start + self.window_size]
    }

    /// Block `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&'a [T]> {
        (index < self.num_blocks).then(|| self.block(index))
    }

    /// Iterate over the blocks in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &'a [T]> + '_ {
        (0..self.num_blocks).map(move |i| self.block(i))
    }

    /// Number of leading signal samples covered by at least one block.
    pub fn covered_len(&self) -> usize {
        self.offset(self.num_blocks - 1) + self.window_size
    }
}

impl<'a, T: Clone> SegmentMatrix<'a, T> {
    /// Copy the blocks into an owned `(P, ws)` matrix.
    pub fn to_array(&self) -> Array2<T> {
        Array2::from_shape_fn((self.num_blocks, self.window_size), |(p, n)| {
            self.signal[self.offset(p) + n].clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_block_count_and_contents() {
        let signal = ramp(1000);
        for &(ws, step) in &[(64usize, 16usize), (100, 33), (1000, 1), (7, 7), (128, 200)] {
            let blocks = segment(&signal, ws, step).unwrap();
            let expected = (signal.len() - ws) / step + 1;
            assert_eq!(blocks.len(), expected, "ws={} step={}", ws, step);
            for (i, block) in blocks.iter().enumerate() {
                assert_eq!(block, &signal[i * step..i * step + ws]);
            }
        }
    }

    #[test]
    fn test_trailing_samples_dropped() {
        let signal = ramp(10);
        let blocks = segment(&signal, 4, 3).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks.covered_len(), 10);

        let blocks = segment(&signal, 4, 4).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks.covered_len(), 8);
        assert!(blocks.get(2).is_none());
    }

    #[test]
    fn test_non_overlapping_round_trip() {
        let signal = ramp(1030);
        let ws = 64;
        let blocks = segment(&signal, ws, ws).unwrap();
        let rebuilt: Vec<f64> = blocks.iter().flatten().copied().collect();
        assert_eq!(rebuilt.len(), blocks.len() * ws);
        assert_eq!(rebuilt.as_slice(), &signal[..rebuilt.len()]);
        assert_eq!(signal.len() - rebuilt.len(), 1030 % 64);
    }

    #[test]
    fn test_to_array_matches_blocks() {
        let signal = ramp(50);
        let blocks = segment(&signal, 8, 5).unwrap();
        let matrix = blocks.to_array();
        assert_eq!(matrix.dim(), (blocks.len(), 8));
        for p in 0..blocks.len() {
            assert_eq!(matrix.row(p).to_vec(), blocks.block(p).to_vec());
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let signal = ramp(16);
        assert!(matches!(
            segment(&signal, 0, 1),
            Err(CycloError::InvalidParameter(_))
        ));
        assert!(matches!(
            segment(&signal, 4, 0),
            Err(CycloError::InvalidParameter(_))
        ));
        assert_eq!(
            segment(&signal, 17, 1).unwrap_err(),
            CycloError::DimensionMismatch {
                window_size: 17,
                signal_len: 16
            }
        );
    }

    #[test]
    fn test_exact_fit_is_single_block() {
        let signal = ramp(32);
        let blocks = segment(&signal, 32, 5).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.block(0), signal.as_slice());
    }
}
