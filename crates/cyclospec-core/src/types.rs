//! Core types for cyclostationary spectral estimation
//!
//! This module defines the sample abstraction shared by every estimator and
//! the error taxonomy returned by the public API.
//!
//! ## Real and Complex Inputs
//!
//! Estimators accept real or complex signals uniformly. Internally every
//! stage that needs a Fourier transform works on `Complex64`, so a sample
//! type only has to know how to widen itself:
//!
//! ```text
//!   f32 ──┐
//!   f64 ──┤
//!         ├──► Sample::to_complex() ──► Complex64 ──► FFT / kernels
//!   c32 ──┤
//!   c64 ──┘
//! ```

use num_complex::{Complex32, Complex64};

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// Result type for estimator operations
pub type CycloResult<T> = Result<T, CycloError>;

/// Errors that can occur while estimating or normalizing a cyclic spectrum
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CycloError {
    #[error("Invalid shape: batch must be 2-dimensional, got {ndim} dimension(s)")]
    InvalidShape { ndim: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Window size {window_size} exceeds signal length {signal_len}")]
    DimensionMismatch { window_size: usize, signal_len: usize },

    #[error("Degenerate normalization: surface is constant at {value}")]
    NumericDegeneracy { value: f64 },
}

/// A scalar signal sample, real or complex.
///
/// `Default` must be the additive zero; it is used when a signal is
/// zero-padded before framing.
pub trait Sample: Copy + Default + Send + Sync {
    /// Widen the sample to a double-precision complex value.
    fn to_complex(self) -> Complex64;
}

impl Sample for f64 {
    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
}

impl Sample for f32 {
    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self as f64, 0.0)
    }
}

impl Sample for Complex64 {
    #[inline]
    fn to_complex(self) -> Complex64 {
        self
    }
}

impl Sample for Complex32 {
    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self.re as f64, self.im as f64)
    }
}

/// Widen a borrowed slice into an owned complex buffer.
pub fn to_complex_vec<T: Sample>(samples: &[T]) -> Vec<Complex64> {
    samples.iter().map(|s| s.to_complex()).collect()
}

/// Mean of a set of values, computed relative to the first element.
///
/// Shifting by a reference keeps the result exact for constant input, so a
/// constant array minus its own mean is exactly zero.
pub(crate) fn shifted_mean<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut iter = values.into_iter();
    let reference = match iter.next() {
        Some(&v) => v,
        None => return 0.0,
    };
    let (sum, count) = iter.fold((0.0, 1usize), |(acc, n), &v| (acc + (v - reference), n + 1));
    reference + sum / count as f64
}
