//! # FFT Accumulation Method (FAM)
//!
//! Estimates the Spectral Correlation Density (SCD) of a signal by
//! channelizing it with short windowed FFTs and correlating the channel
//! outputs across blocks.
//!
//! ## Pipeline
//!
//! ```text
//! signal ──► frame (ws, step) ──► [zero-pad to 2^n blocks]
//!        ──► Hamming (Σw² = 1) ──► FFT_ws ──► fftshift
//!        ──► phase correction exp(-iπ·step·p·ω_m)
//!        ──► X_p[k,l] = conj(S_p[k]) · S_p[l]          (P × ws × ws)
//!        ──► Coarse:         |mean_p X_p|
//!            CyclicResolved: |mean_c FFT_P(X)[c]|
//!            FamFull:        |FFT_P(X)| remapped to (f, α) plane
//! ```
//!
//! The phase correction compensates the time shift `p·step` of block `p`,
//! so that the second FFT along the block axis resolves cyclic frequency.
//!
//! ## FamFull Remap
//!
//! Each channel pair `(k, l)` owns a cyclic-frequency strip of `2·Mp`
//! samples taken around the middle of the block-axis spectrum. The strip is
//! written into row `i = ⌊(k+l)/2⌋` of the output, centered on column
//! `a = ⌊((k−l)/ws + 1)·P·step⌋`. Strips from different pairs can land on
//! the same cells; pairs are applied in lexicographic `(k, l)` order and the
//! last write wins.
//!
//! ## Example
//!
//! ```rust
//! use cyclospec_core::fam::{FamEstimator, ScdConfig, ScdMode};
//!
//! let signal: Vec<f64> = (0..1024).map(|i| (0.3 * i as f64).cos()).collect();
//! let config = ScdConfig::builder()
//!     .window_size(32)
//!     .step(8)
//!     .mode(ScdMode::Coarse)
//!     .build();
//! let estimator = FamEstimator::new(config).unwrap();
//! let scd = estimator.estimate(&signal).unwrap();
//! assert_eq!(scd.dim(), (32, 32));
//! ```

use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::f64::consts::PI;
use tracing::{debug, trace};

use crate::batch::CyclicEstimator;
use crate::fft_utils::FftProcessor;
use crate::parallel::map_indices;
use crate::segment::{block_count, segment, SegmentMatrix};
use crate::types::{CycloError, CycloResult, Sample};
use crate::windows::unit_energy_hamming;

/// Output mode of the FAM estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScdMode {
    /// Magnitude of the block-averaged correlation (ws × ws).
    Coarse,
    /// Block-axis FFT, centered, averaged over cyclic frequency (ws × ws).
    CyclicResolved,
    /// Full FAM remap into the spectral / cyclic frequency plane
    /// (ws × 2·P·step).
    #[default]
    FamFull,
}

/// FAM estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScdConfig {
    /// Block length and FFT size (ws).
    pub window_size: usize,
    /// Hop between blocks; 0 selects `window_size / 4`.
    pub step: usize,
    /// Zero-pad the signal so the block count is a power of two.
    pub padding: bool,
    /// Output mode.
    pub mode: ScdMode,
    /// Run per-channel work on the thread pool.
    pub parallel: bool,
}

impl Default for ScdConfig {
    fn default() -> Self {
        Self {
            window_size: 256,
            step: 0,
            padding: true,
            mode: ScdMode::FamFull,
            parallel: true,
        }
    }
}

impl ScdConfig {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> ScdConfigBuilder {
        ScdConfigBuilder::default()
    }

    /// Hop size after applying the `step == 0` default.
    pub fn effective_step(&self) -> usize {
        if self.step == 0 {
            self.window_size / 4
        } else {
            self.step
        }
    }

    /// Check the signal-independent parameters.
    pub fn validate(&self) -> CycloResult<()> {
        if self.window_size == 0 {
            return Err(CycloError::InvalidParameter(
                "window_size must be > 0".to_string(),
            ));
        }
        if self.effective_step() == 0 {
            return Err(CycloError::InvalidParameter(format!(
                "step defaults to window_size / 4, which is 0 for window_size {}",
                self.window_size
            )));
        }
        Ok(())
    }
}

/// Builder for [`ScdConfig`]
#[derive(Debug, Clone, Default)]
pub struct ScdConfigBuilder {
    config: ScdConfig,
}

impl ScdConfigBuilder {
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = window_size;
        self
    }

    pub fn step(mut self, step: usize) -> Self {
        self.config.step = step;
        self
    }

    pub fn padding(mut self, padding: bool) -> Self {
        self.config.padding = padding;
        self
    }

    pub fn mode(mut self, mode: ScdMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn build(self) -> ScdConfig {
        self.config
    }
}

/// Spectral Correlation Density estimator using the FFT Accumulation Method.
#[derive(Debug, Clone)]
pub struct FamEstimator {
    config: ScdConfig,
    step: usize,
    /// Unit-energy Hamming taper.
    window: Vec<f64>,
    /// Normalized frequency coordinate of each (shifted) bin.
    omega: Vec<f64>,
    /// Per-block FFT of size ws.
    fft: FftProcessor,
}

impl FamEstimator {
    /// Create an estimator, validating the configuration.
    pub fn new(config: ScdConfig) -> CycloResult<Self> {
        config.validate()?;
        let ws = config.window_size;
        let step = config.effective_step();

        let delta = (2.0 - 2.0 * ws as f64) / (ws * ws) as f64;
        let omega = (0..ws).map(|m| 1.0 + m as f64 * delta).collect();

        Ok(Self {
            step,
            window: unit_energy_hamming(ws),
            omega,
            fft: FftProcessor::new(ws),
            config,
        })
    }

    pub fn config(&self) -> &ScdConfig {
        &self.config
    }

    /// Hop size actually used.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Block count P for a signal of `len` samples, after padding.
    pub fn block_count(&self, len: usize) -> CycloResult<usize> {
        let ws = self.config.window_size;
        if ws > len {
            return Err(CycloError::DimensionMismatch {
                window_size: ws,
                signal_len: len,
            });
        }
        let blocks = block_count(len, ws, self.step);
        if self.config.padding && !blocks.is_power_of_two() {
            Ok(blocks.next_power_of_two())
        } else {
            Ok(blocks)
        }
    }

    /// Shape of the surface produced for a signal of `len` samples.
    pub fn output_shape(&self, len: usize) -> CycloResult<(usize, usize)> {
        let ws = self.config.window_size;
        let blocks = self.block_count(len)?;
        match self.config.mode {
            ScdMode::Coarse | ScdMode::CyclicResolved => Ok((ws, ws)),
            ScdMode::FamFull => {
                let half_strip = self.half_strip(blocks);
                if half_strip > blocks / 2 {
                    return Err(CycloError::InvalidParameter(format!(
                        "fam_full needs step <= window_size (step {}, window_size {})",
                        self.step, ws
                    )));
                }
                Ok((ws, 2 * blocks * self.step))
            }
        }
    }

    /// The spectral correlation tensor `X[p, k, l] = conj(S_p[k]) · S_p[l]`.
    ///
    /// Shape `(P, ws, ws)`, with P the padded block count.
    pub fn correlation_tensor<T: Sample>(&self, signal: &[T]) -> CycloResult<Array3<Complex64>> {
        let signal = self.pad_signal(signal)?;
        let blocks = segment(&signal[..], self.config.window_size, self.step)?;
        let spectra = self.block_spectra(&blocks);
        let (p, ws) = spectra.dim();

        Ok(Array3::from_shape_fn((p, ws, ws), |(b, k, l)| {
            spectra[[b, k]].conj() * spectra[[b, l]]
        }))
    }

    /// Estimate the SCD surface of one signal.
    pub fn estimate<T: Sample>(&self, signal: &[T]) -> CycloResult<Array2<f64>> {
        self.output_shape(signal.len())?;
        let signal = self.pad_signal(signal)?;
        let blocks = segment(&signal[..], self.config.window_size, self.step)?;
        let spectra = self.block_spectra(&blocks);

        match self.config.mode {
            ScdMode::Coarse => Ok(self.coarse(&spectra)),
            ScdMode::CyclicResolved => Ok(self.cyclic_resolved(&spectra)),
            ScdMode::FamFull => Ok(self.fam_full(&spectra)),
        }
    }

    /// Zero-pad so the block count becomes a power of two, if enabled.
    fn pad_signal<'s, T: Sample>(&self, signal: &'s [T]) -> CycloResult<Cow<'s, [T]>> {
        let ws = self.config.window_size;
        let blocks = segment(signal, ws, self.step)?.len();
        let padded_blocks = self.block_count(signal.len())?;
        if padded_blocks == blocks {
            return Ok(Cow::Borrowed(signal));
        }

        let padded_len = (padded_blocks - 1) * self.step + ws;
        debug!(
            blocks,
            padded_blocks,
            signal_len = signal.len(),
            padded_len,
            "zero-padding signal to a power-of-two block count"
        );
        let mut padded = Vec::with_capacity(padded_len);
        padded.extend_from_slice(signal);
        padded.resize(padded_len, T::default());
        Ok(Cow::Owned(padded))
    }

    /// Windowed, centered and phase-corrected spectrum of every block, `(P, ws)`.
    fn block_spectra<T: Sample>(&self, blocks: &SegmentMatrix<'_, T>) -> Array2<Complex64> {
        let ws = self.config.window_size;
        let step = self.step as f64;

        let rows = map_indices(blocks.len(), self.config.parallel, |p| {
            let mut fft = self.fft.clone();
            let mut buffer: Vec<Complex64> = blocks
                .block(p)
                .iter()
                .zip(self.window.iter())
                .map(|(s, &w)| s.to_complex() * w)
                .collect();
            fft.fft_shifted_inplace(&mut buffer);

            for (bin, &omega) in buffer.iter_mut().zip(self.omega.iter()) {
                *bin *= Complex64::from_polar(1.0, -PI * step * p as f64 * omega);
            }
            buffer
        });

        trace!(blocks = rows.len(), window_size = ws, "block spectra ready");
        Array2::from_shape_fn((rows.len(), ws), |(p, m)| rows[p][m])
    }

    /// Correlation plane for channel `k`, transformed along the block axis.
    ///
    /// Returns `FFT_P(X[:, k, :])` with the cyclic axis centered, `(P, ws)`.
    fn cyclic_plane(&self, spectra: &Array2<Complex64>, k: usize, fft: &mut FftProcessor) -> Array2<Complex64> {
        let (p, ws) = spectra.dim();
        let mut plane = Array2::from_shape_fn((p, ws), |(b, l)| spectra[[b, k]].conj() * spectra[[b, l]]);
        fft.shifted_fft_lanes(&mut plane, Axis(0));
        plane
    }

    fn coarse(&self, spectra: &Array2<Complex64>) -> Array2<f64> {
        let (p, ws) = spectra.dim();
        let rows = map_indices(ws, self.config.parallel, |k| {
            (0..ws)
                .map(|l| {
                    let sum: Complex64 = (0..p).map(|b| spectra[[b, k]].conj() * spectra[[b, l]]).sum();
                    (sum / p as f64).norm()
                })
                .collect::<Vec<f64>>()
        });
        stack_rows(rows, ws)
    }

    fn cyclic_resolved(&self, spectra: &Array2<Complex64>) -> Array2<f64> {
        let (p, ws) = spectra.dim();
        let cyclic_fft = FftProcessor::new(p);
        let rows = map_indices(ws, self.config.parallel, |k| {
            let mut fft = cyclic_fft.clone();
            let plane = self.cyclic_plane(spectra, k, &mut fft);
            plane
                .sum_axis(Axis(0))
                .iter()
                .map(|c| (*c / p as f64).norm())
                .collect::<Vec<f64>>()
        });
        stack_rows(rows, ws)
    }

    fn fam_full(&self, spectra: &Array2<Complex64>) -> Array2<f64> {
        let (p, ws) = spectra.dim();
        let half_strip = self.half_strip(p);
        let strip_len = 2 * half_strip;
        let strip_start = p / 2 - half_strip;
        let width = 2 * p * self.step;
        let cyclic_fft = FftProcessor::new(p);

        // strips[k][[l, j]] = |FFT_P(X)|[strip_start + j, k, l]
        let strips = map_indices(ws, self.config.parallel, |k| {
            let mut fft = cyclic_fft.clone();
            let plane = self.cyclic_plane(spectra, k, &mut fft);
            Array2::from_shape_fn((ws, strip_len), |(l, j)| plane[[strip_start + j, l]].norm())
        });

        debug!(
            blocks = p,
            half_strip,
            width,
            "remapping cyclic strips into the frequency plane"
        );

        // Row i is fed by pairs with k + l in {2i, 2i + 1}; walking k upward
        // visits them in the same order as a lexicographic (k, l) sweep.
        let rows = map_indices(ws, self.config.parallel, |i| {
            let mut row = vec![0.0; width];
            if strip_len == 0 {
                return row;
            }
            for k in 0..ws {
                for sum in [2 * i, 2 * i + 1] {
                    if sum < k || sum - k >= ws {
                        continue;
                    }
                    let l = sum - k;
                    // Floor of ((k - l)/ws + 1)·P·step, not rounded.
                    let center = (k + ws - l) * p * self.step / ws;
                    debug_assert!(center >= half_strip && center + half_strip <= width);
                    let start = center - half_strip;
                    for (dst, src) in row[start..start + strip_len].iter_mut().zip(strips[k].row(l)) {
                        *dst = *src;
                    }
                }
            }
            row
        });
        stack_rows(rows, width)
    }

    /// Mp: half the cyclic strip copied per channel pair.
    fn half_strip(&self, blocks: usize) -> usize {
        blocks * self.step / self.config.window_size / 2
    }
}

impl CyclicEstimator for FamEstimator {
    fn estimate<T: Sample>(&self, signal: &[T]) -> CycloResult<Array2<f64>> {
        FamEstimator::estimate(self, signal)
    }

    fn check_signal_len(&self, len: usize) -> CycloResult<()> {
        self.output_shape(len).map(|_| ())
    }

    fn parallel(&self) -> bool {
        self.config.parallel
    }
}

/// Assemble equally sized rows into a matrix.
pub(crate) fn stack_rows(rows: Vec<Vec<f64>>, width: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), width), |(r, c)| rows[r][c])
}

/// Estimate the SCD of `signal` with the FAM.
///
/// `step == 0` selects `window_size / 4`.
pub fn estimate_scd<T: Sample>(
    signal: &[T],
    window_size: usize,
    step: usize,
    padding: bool,
    mode: ScdMode,
) -> CycloResult<Array2<f64>> {
    let config = ScdConfig::builder()
        .window_size(window_size)
        .step(step)
        .padding(padding)
        .mode(mode)
        .build();
    FamEstimator::new(config)?.estimate(signal)
}
