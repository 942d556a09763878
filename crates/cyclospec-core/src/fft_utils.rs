//! FFT Utilities for Cyclic Spectral Estimation
//!
//! Both estimator families use the same two building blocks:
//!
//! 1. A forward FFT of fixed size, planned once and reused for every block,
//!    lag row or correlation lane.
//! 2. A centering shift (`fftshift`) that moves the zero-frequency bin to
//!    the middle of the axis, so that spectral and cyclic frequency axes run
//!    from negative to positive.
//!
//! ```text
//! FFT bins:      [ 0  1  2  3 | -4 -3 -2 -1 ]
//! after shift:   [ -4 -3 -2 -1 | 0  1  2  3 ]
//!                               ^
//!                        index n/2 = DC
//! ```
//!
//! For odd lengths the shift rolls by `n/2` (floor), so the DC bin lands at
//! index `n/2`.

use ndarray::{ArrayBase, Axis, DataMut, Dimension};
use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Forward FFT processor with a reusable scratch buffer
pub struct FftProcessor {
    /// FFT size
    size: usize,
    /// Forward FFT instance
    fft_forward: Arc<dyn Fft<f64>>,
    /// Scratch buffer for FFT operations
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftProcessor")
            .field("size", &self.size)
            .finish()
    }
}

impl Clone for FftProcessor {
    /// Shares the plan, allocates a private scratch buffer.
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            fft_forward: Arc::clone(&self.fft_forward),
            scratch: vec![Complex64::new(0.0, 0.0); self.scratch.len()],
        }
    }
}

impl FftProcessor {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::new(0.0, 0.0); fft_forward.get_inplace_scratch_len()];

        Self {
            size,
            fft_forward,
            scratch,
        }
    }

    /// Get the FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Compute the forward FFT in-place
    pub fn fft_inplace(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_forward.process_with_scratch(buffer, &mut self.scratch);
    }

    /// Forward FFT followed by a centering shift, in-place
    pub fn fft_shifted_inplace(&mut self, buffer: &mut [Complex64]) {
        self.fft_inplace(buffer);
        fft_shift_inplace(buffer);
    }

    /// Centered forward FFT of every lane of `data` along `axis`.
    ///
    /// Lanes do not need to be contiguous; each one is staged through a
    /// temporary buffer. The axis length must equal the FFT size.
    pub fn shifted_fft_lanes<S, D>(&mut self, data: &mut ArrayBase<S, D>, axis: Axis)
    where
        S: DataMut<Elem = Complex64>,
        D: Dimension,
    {
        assert_eq!(data.len_of(axis), self.size);
        let mut buffer = vec![Complex64::new(0.0, 0.0); self.size];

        for mut lane in data.lanes_mut(axis) {
            for (dst, src) in buffer.iter_mut().zip(lane.iter()) {
                *dst = *src;
            }
            self.fft_shifted_inplace(&mut buffer);
            for (dst, src) in lane.iter_mut().zip(buffer.iter()) {
                *dst = *src;
            }
        }
    }
}

/// Move the zero-frequency bin to the center of the buffer (numpy `fftshift`)
pub fn fft_shift_inplace<T>(buffer: &mut [T]) {
    let n = buffer.len();
    buffer.rotate_right(n / 2);
}

/// Apply a centered forward FFT to every lane of `data` along `axis`.
///
/// Plans a transform for the axis length; see
/// [`FftProcessor::shifted_fft_lanes`] to reuse an existing plan.
pub fn shifted_fft_along<S, D>(data: &mut ArrayBase<S, D>, axis: Axis)
where
    S: DataMut<Elem = Complex64>,
    D: Dimension,
{
    let n = data.len_of(axis);
    if n == 0 {
        return;
    }
    FftProcessor::new(n).shifted_fft_lanes(data, axis);
}
