//! Batch Drivers and Normalization
//!
//! A batch is a 2-dimensional array whose rows are independent signals
//! sharing one set of estimator parameters. The driver:
//!
//! 1. rejects anything that is not 2-dimensional (`InvalidShape`),
//! 2. validates the parameters against the common row length once,
//! 3. estimates every row independently (on the thread pool if enabled),
//! 4. min-max normalizes each surface to `[0, 1]`.
//!
//! Steps 1 and 2 abort the whole call. A row whose surface is constant
//! cannot be normalized; it is reported as `NumericDegeneracy` in its own
//! slot while the other rows are still returned.
//!
//! ```rust
//! use cyclospec_core::batch::batch_scd;
//! use cyclospec_core::fam::ScdMode;
//! use ndarray::Array2;
//!
//! let batch = Array2::from_shape_fn((3, 512), |(r, n)| ((r + 1) as f64 * 0.01 * n as f64).sin());
//! let out = batch_scd(batch.view().into_dyn(), 32, 8, true, ScdMode::Coarse).unwrap();
//! assert!(out.all_valid());
//! let stacked = out.into_array3().unwrap();
//! assert_eq!(stacked.dim(), (3, 32, 32));
//! ```

use ndarray::{Array2, Array3, ArrayViewD, Axis, Ix2};
use std::borrow::Cow;
use tracing::{debug, warn};

use crate::ccsd::{Boundary, CcsdConfig, CcsdEstimator, Kernel};
use crate::fam::{FamEstimator, ScdConfig, ScdMode};
use crate::parallel::{self, map_indices};
use crate::types::{CycloError, CycloResult, Sample};

/// A spectral estimator that maps one signal to a real surface.
///
/// Implemented by [`FamEstimator`] and [`CcsdEstimator`]; the batch driver
/// is written once against this trait.
pub trait CyclicEstimator: Sync {
    /// Estimate the surface of one signal.
    fn estimate<T: Sample>(&self, signal: &[T]) -> CycloResult<Array2<f64>>;

    /// Check whether signals of `len` samples can be processed, without
    /// computing anything.
    fn check_signal_len(&self, len: usize) -> CycloResult<()>;

    /// Whether rows may be processed on the thread pool.
    fn parallel(&self) -> bool;

    /// Estimate and normalize every row of a 2-dimensional batch.
    fn estimate_batch<T: Sample>(&self, batch: ArrayViewD<'_, T>) -> CycloResult<NormalizedBatch>
    where
        Self: Sized,
    {
        run_batch(self, batch)
    }
}

/// Outcome of a batch run: one normalized surface or error per row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    rows: Vec<CycloResult<Array2<f64>>>,
}

impl NormalizedBatch {
    /// Per-row results in input order.
    pub fn rows(&self) -> &[CycloResult<Array2<f64>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when every row was normalized successfully.
    pub fn all_valid(&self) -> bool {
        self.rows.iter().all(|r| r.is_ok())
    }

    /// Indices of rows that could not be normalized.
    pub fn degenerate_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_err())
            .map(|(i, _)| i)
            .collect()
    }

    /// Stack all rows into a `(rows, h, w)` array.
    ///
    /// Fails with the first row error if any row is degenerate.
    pub fn into_array3(self) -> CycloResult<Array3<f64>> {
        let surfaces = self.rows.into_iter().collect::<CycloResult<Vec<_>>>()?;
        let (h, w) = surfaces.first().map(|s| s.dim()).unwrap_or((0, 0));
        Ok(Array3::from_shape_fn((surfaces.len(), h, w), |(r, i, j)| surfaces[r][[i, j]]))
    }
}

/// Rescale a surface to `[0, 1]` via `(x - min) / (max - min)`.
///
/// A constant surface (or one containing NaN) has no usable range and is
/// reported as `NumericDegeneracy`.
pub fn min_max_normalize(surface: &Array2<f64>) -> CycloResult<Array2<f64>> {
    let (min, max) = surface
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if !(range.is_finite() && range > 0.0) || surface.iter().any(|v| v.is_nan()) {
        return Err(CycloError::NumericDegeneracy { value: min });
    }
    Ok(surface.mapv(|v| (v - min) / range))
}

/// Drive `estimator` over every row of `batch`.
pub fn run_batch<E, T>(estimator: &E, batch: ArrayViewD<'_, T>) -> CycloResult<NormalizedBatch>
where
    E: CyclicEstimator,
    T: Sample,
{
    let ndim = batch.ndim();
    let batch = batch
        .into_dimensionality::<Ix2>()
        .map_err(|_| CycloError::InvalidShape { ndim })?;
    let (num_rows, row_len) = batch.dim();
    estimator.check_signal_len(row_len)?;

    debug!(
        rows = num_rows,
        row_len,
        parallel = estimator.parallel() && parallel::available(),
        "processing batch"
    );
    let rows = map_indices(num_rows, estimator.parallel(), |r| {
        let row = batch.index_axis(Axis(0), r);
        let signal: Cow<'_, [T]> = match row.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(row.to_vec()),
        };
        let surface = estimator.estimate(&signal[..])?;
        min_max_normalize(&surface).map_err(|err| {
            warn!(row = r, %err, "row could not be normalized");
            err
        })
    });

    Ok(NormalizedBatch { rows })
}

/// Batch FAM SCD with per-row min-max normalization.
pub fn batch_scd<T: Sample>(
    batch: ArrayViewD<'_, T>,
    window_size: usize,
    step: usize,
    padding: bool,
    mode: ScdMode,
) -> CycloResult<NormalizedBatch> {
    let config = ScdConfig::builder()
        .window_size(window_size)
        .step(step)
        .padding(padding)
        .mode(mode)
        .build();
    FamEstimator::new(config)?.estimate_batch(batch)
}

/// Batch cyclic-lag CCSD with per-row min-max normalization.
pub fn batch_ccsd<T: Sample>(
    batch: ArrayViewD<'_, T>,
    window_size: usize,
    step: usize,
    sigma: f64,
    kernel: Kernel,
    boundary: Boundary,
) -> CycloResult<NormalizedBatch> {
    let config = CcsdConfig::builder()
        .window_size(window_size)
        .step(step)
        .sigma(sigma)
        .kernel(kernel)
        .boundary(boundary)
        .build();
    CcsdEstimator::new(config)?.estimate_batch(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, Array3};
    use num_complex::Complex64;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tones(rows: usize, len: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, len), |(r, n)| {
            (2.0 * std::f64::consts::PI * (0.05 + 0.07 * r as f64) * n as f64).cos()
        })
    }

    #[test]
    fn test_normalize_range() {
        let surface = Array2::from_shape_vec((2, 2), vec![2.0, 4.0, 6.0, 10.0]).unwrap();
        let norm = min_max_normalize(&surface).unwrap();
        assert_relative_eq!(norm[[0, 0]], 0.0);
        assert_relative_eq!(norm[[0, 1]], 0.25);
        assert_relative_eq!(norm[[1, 0]], 0.5);
        assert_relative_eq!(norm[[1, 1]], 1.0);
    }

    #[test]
    fn test_normalize_constant_is_degenerate() {
        let surface = Array2::from_elem((3, 3), 0.7);
        assert_eq!(
            min_max_normalize(&surface).unwrap_err(),
            CycloError::NumericDegeneracy { value: 0.7 }
        );

        let mut with_nan = Array2::from_elem((2, 2), 1.0);
        with_nan[[0, 1]] = f64::NAN;
        with_nan[[1, 1]] = 3.0;
        assert!(min_max_normalize(&with_nan).is_err());
    }

    #[test]
    fn test_one_dimensional_batch_rejected() {
        let signal = Array1::from_elem(1024, 1.0_f64);
        let err = batch_scd(signal.view().into_dyn(), 64, 16, true, ScdMode::Coarse).unwrap_err();
        assert_eq!(err, CycloError::InvalidShape { ndim: 1 });

        let cube = Array3::from_elem((2, 2, 256), 1.0_f64);
        let err = batch_ccsd(
            cube.view().into_dyn(),
            16,
            16,
            1.0,
            Kernel::GaussianDifference,
            Boundary::ZeroPad,
        )
        .unwrap_err();
        assert_eq!(err, CycloError::InvalidShape { ndim: 3 });
    }

    struct CountingEstimator {
        calls: AtomicUsize,
    }

    impl CyclicEstimator for CountingEstimator {
        fn estimate<T: Sample>(&self, signal: &[T]) -> CycloResult<Array2<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Array2::from_shape_fn((1, signal.len()), |(_, n)| n as f64))
        }

        fn check_signal_len(&self, len: usize) -> CycloResult<()> {
            if len < 8 {
                return Err(CycloError::DimensionMismatch {
                    window_size: 8,
                    signal_len: len,
                });
            }
            Ok(())
        }

        fn parallel(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_validation_happens_before_any_row() {
        let estimator = CountingEstimator {
            calls: AtomicUsize::new(0),
        };
        let flat = Array1::from_elem(16, 0.0_f64);
        assert!(estimator.estimate_batch(flat.view().into_dyn()).is_err());

        let short = Array2::from_elem((4, 4), 0.0_f64);
        assert!(matches!(
            estimator.estimate_batch(short.view().into_dyn()),
            Err(CycloError::DimensionMismatch { .. })
        ));
        assert_eq!(estimator.calls.load(Ordering::SeqCst), 0);

        let ok = Array2::from_elem((3, 10), 0.0_f64);
        let out = estimator.estimate_batch(ok.view().into_dyn()).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(estimator.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_batch_scd_rows_in_unit_range() {
        let batch = tones(4, 600);
        let out = batch_scd(batch.view().into_dyn(), 32, 8, true, ScdMode::FamFull).unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.all_valid());
        for row in out.rows() {
            let surface = row.as_ref().unwrap();
            // (600 - 32) / 8 + 1 = 72 -> 128 blocks
            assert_eq!(surface.dim(), (32, 2 * 128 * 8));
            assert!(surface.iter().all(|&v| (0.0..=1.0).contains(&v)));
            assert_relative_eq!(surface.iter().cloned().fold(f64::MIN, f64::max), 1.0);
            assert_relative_eq!(surface.iter().cloned().fold(f64::MAX, f64::min), 0.0);
        }
    }

    #[test]
    fn test_batch_matches_single_row_estimates() {
        let batch = tones(3, 400);
        let config = ScdConfig::builder()
            .window_size(16)
            .step(4)
            .mode(ScdMode::CyclicResolved)
            .build();
        let estimator = FamEstimator::new(config).unwrap();
        let out = estimator.estimate_batch(batch.view().into_dyn()).unwrap();
        for (r, row) in out.rows().iter().enumerate() {
            let signal = batch.row(r).to_vec();
            let expected = min_max_normalize(&estimator.estimate(&signal).unwrap()).unwrap();
            assert_eq!(row.as_ref().unwrap(), &expected);
        }
    }

    #[test]
    fn test_degenerate_row_flagged_without_losing_others() {
        let mut batch = Array2::<Complex64>::zeros((3, 1024));
        for n in 0..1024 {
            batch[[0, n]] = Complex64::from_polar(1.0, 0.3 * n as f64);
            batch[[2, n]] = Complex64::new(((n / 4) % 2) as f64, 0.0);
        }
        let out = batch_ccsd(
            batch.view().into_dyn(),
            64,
            32,
            0.5,
            Kernel::GaussianDifference,
            Boundary::WrapToNextBlock,
        )
        .unwrap();

        assert!(!out.all_valid());
        assert_eq!(out.degenerate_rows(), vec![1]);
        assert!(matches!(
            out.rows()[1],
            Err(CycloError::NumericDegeneracy { .. })
        ));
        assert!(out.rows()[0].is_ok());
        assert!(out.rows()[2].is_ok());
        assert!(out.clone().into_array3().is_err());
    }

    #[test]
    fn test_column_major_rows() {
        // Transposed view: rows are not contiguous in memory.
        let data = tones(2, 256);
        let transposed = data.t().to_owned();
        let view = transposed.t();
        let out = batch_scd(view.into_dyn(), 32, 8, false, ScdMode::Coarse).unwrap();
        let direct = batch_scd(data.view().into_dyn(), 32, 8, false, ScdMode::Coarse).unwrap();
        assert_eq!(out, direct);
    }

    #[test]
    fn test_into_array3_shape() {
        let batch = tones(2, 512);
        let out = batch_ccsd(
            batch.view().into_dyn(),
            32,
            32,
            1.0,
            Kernel::TanhProduct,
            Boundary::WrapToNextBlock,
        )
        .unwrap();
        let stacked = out.into_array3().unwrap();
        assert_eq!(stacked.dim(), (2, 32, 32));
    }
}
