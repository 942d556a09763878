//! # Cyclic-Lag Spectral Density (CCSD)
//!
//! Time-domain estimator of cyclic spectral structure. Instead of
//! correlating FFT channels (see [`crate::fam`]), it measures how similar
//! each block is to a lag-shifted copy of itself and transforms the
//! resulting lag profile twice:
//!
//! ```text
//! block p:     [x_0 ... x_{ws-1}]  ++  continuation (ZeroPad | next block)
//!                     │                          │
//!                     └──── K(x_t, x_{t+τ}) ─────┘        τ = 0..ws
//!
//! profile[τ, t] = mean_p K(ext_p[t], ext_p[t+τ])           (ws × ws)
//!            ──► remove mean
//!            ──► FFT along t  (spectral frequency), fftshift
//!            ──► FFT along τ  (cyclic frequency),   fftshift
//!            ──► |·|
//! ```
//!
//! Two kernels are available:
//!
//! | Kernel               | K(a, b)                                  |
//! |----------------------|------------------------------------------|
//! | `GaussianDifference` | exp(−\|a − b\|² / 2σ²) / (2πσ²)          |
//! | `TanhProduct`        | tanh(\|a · b\|)                          |
//!
//! The tanh-product kernel with the wrap-to-next-block boundary is the CHTC
//! estimator, available directly as [`estimate_chtc`].
//!
//! ## Example
//!
//! ```rust
//! use cyclospec_core::ccsd::{CcsdConfig, CcsdEstimator, Kernel};
//!
//! let signal: Vec<f64> = (0..2048).map(|i| ((i / 8) % 2) as f64 * 2.0 - 1.0).collect();
//! let config = CcsdConfig::builder()
//!     .window_size(64)
//!     .step(64)
//!     .sigma(0.5)
//!     .kernel(Kernel::GaussianDifference)
//!     .build();
//! let ccsd = CcsdEstimator::new(config).unwrap().estimate(&signal).unwrap();
//! assert_eq!(ccsd.dim(), (64, 64));
//! ```

use ndarray::{Array2, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, trace};

use crate::batch::CyclicEstimator;
use crate::fam::stack_rows;
use crate::fft_utils::FftProcessor;
use crate::parallel::map_indices;
use crate::segment::{segment, SegmentMatrix};
use crate::types::{shifted_mean, to_complex_vec, CycloError, CycloResult, Sample};

/// Similarity kernel applied between a sample and its lagged counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// Gaussian density of the complex difference, bandwidth `sigma`.
    #[default]
    GaussianDifference,
    /// Bounded nonlinearity of the lagged product.
    TanhProduct,
}

impl Kernel {
    /// Evaluate the kernel for one sample pair.
    #[inline]
    pub fn evaluate(&self, a: Complex64, b: Complex64, sigma: f64) -> f64 {
        match self {
            Kernel::GaussianDifference => {
                let variance = sigma * sigma;
                (-(a - b).norm_sqr() / (2.0 * variance)).exp() / (2.0 * PI * variance)
            }
            Kernel::TanhProduct => (a * b).norm().tanh(),
        }
    }
}

/// What follows a block in its extended lag buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Append `ws` zeros.
    ZeroPad,
    /// Append the next block; the last block gets zeros.
    #[default]
    WrapToNextBlock,
}

/// DC removal applied to the lag profile before the transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeanRemoval {
    /// Subtract the grand mean over all lags and samples.
    #[default]
    Global,
    /// Subtract each lag row's own mean.
    PerLag,
}

/// Cyclic-lag estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcsdConfig {
    /// Block length (ws); also the number of lags.
    pub window_size: usize,
    /// Hop between blocks.
    pub step: usize,
    /// Gaussian kernel bandwidth.
    pub sigma: f64,
    pub kernel: Kernel,
    pub boundary: Boundary,
    pub mean_removal: MeanRemoval,
    /// Evaluate lags on the thread pool.
    pub parallel: bool,
}

impl Default for CcsdConfig {
    fn default() -> Self {
        Self {
            window_size: 512,
            step: 512,
            sigma: 1.0,
            kernel: Kernel::GaussianDifference,
            boundary: Boundary::WrapToNextBlock,
            mean_removal: MeanRemoval::Global,
            parallel: true,
        }
    }
}

impl CcsdConfig {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> CcsdConfigBuilder {
        CcsdConfigBuilder::default()
    }

    /// Check the signal-independent parameters.
    pub fn validate(&self) -> CycloResult<()> {
        if self.window_size == 0 {
            return Err(CycloError::InvalidParameter(
                "window_size must be > 0".to_string(),
            ));
        }
        if self.step == 0 {
            return Err(CycloError::InvalidParameter("step must be > 0".to_string()));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(CycloError::InvalidParameter(format!(
                "sigma must be a positive finite number, got {}",
                self.sigma
            )));
        }
        Ok(())
    }
}

/// Builder for [`CcsdConfig`]
#[derive(Debug, Clone, Default)]
pub struct CcsdConfigBuilder {
    config: CcsdConfig,
}

impl CcsdConfigBuilder {
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = window_size;
        self
    }

    pub fn step(mut self, step: usize) -> Self {
        self.config.step = step;
        self
    }

    pub fn sigma(mut self, sigma: f64) -> Self {
        self.config.sigma = sigma;
        self
    }

    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.config.kernel = kernel;
        self
    }

    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.config.boundary = boundary;
        self
    }

    pub fn mean_removal(mut self, mean_removal: MeanRemoval) -> Self {
        self.config.mean_removal = mean_removal;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn build(self) -> CcsdConfig {
        self.config
    }
}

/// Cyclic/conjugate spectral density estimator over lagged kernel statistics.
#[derive(Debug, Clone)]
pub struct CcsdEstimator {
    config: CcsdConfig,
}

impl CcsdEstimator {
    /// Create an estimator, validating the configuration.
    pub fn new(config: CcsdConfig) -> CycloResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CcsdConfig {
        &self.config
    }

    /// Block-averaged kernel statistic, `profile[τ, t]`, shape `(ws, ws)`.
    ///
    /// No mean has been removed yet.
    pub fn lag_profile<T: Sample>(&self, signal: &[T]) -> CycloResult<Array2<f64>> {
        let blocks = segment(signal, self.config.window_size, self.config.step)?;
        let extended = self.extend_blocks(&blocks);
        let ws = self.config.window_size;
        let kernel = self.config.kernel;
        let sigma = self.config.sigma;

        let rows = map_indices(ws, self.config.parallel, |tau| {
            (0..ws)
                .map(|t| {
                    // Averaged relative to the first block so that a
                    // constant statistic stays exactly constant.
                    let mut values = extended.iter().map(|ext| kernel.evaluate(ext[t], ext[t + tau], sigma));
                    let reference = values.next().unwrap_or_default();
                    let deviation: f64 = values.map(|v| v - reference).sum();
                    reference + deviation / extended.len() as f64
                })
                .collect::<Vec<f64>>()
        });

        trace!(lags = ws, blocks = extended.len(), "lag profile ready");
        Ok(stack_rows(rows, ws))
    }

    /// Estimate the cyclic spectral surface of one signal, shape `(ws, ws)`.
    ///
    /// Rows index cyclic frequency (from the lag axis), columns spectral
    /// frequency; both axes are centered.
    pub fn estimate<T: Sample>(&self, signal: &[T]) -> CycloResult<Array2<f64>> {
        let mut profile = self.lag_profile(signal)?;

        match self.config.mean_removal {
            MeanRemoval::Global => {
                let mean = shifted_mean(profile.iter());
                profile.mapv_inplace(|v| v - mean);
            }
            MeanRemoval::PerLag => {
                for mut row in profile.rows_mut() {
                    let mean = shifted_mean(row.iter());
                    row.mapv_inplace(|v| v - mean);
                }
            }
        }

        let ws = self.config.window_size;
        let mut spectrum = profile.mapv(|v| Complex64::new(v, 0.0));
        let mut fft = FftProcessor::new(ws);
        fft.shifted_fft_lanes(&mut spectrum, Axis(1));
        fft.shifted_fft_lanes(&mut spectrum, Axis(0));

        debug!(
            window_size = ws,
            kernel = ?self.config.kernel,
            boundary = ?self.config.boundary,
            "cyclic-lag spectrum computed"
        );
        Ok(spectrum.mapv(|c| c.norm()))
    }

    /// Per-block buffers of `2·ws` samples: the block followed by its continuation.
    fn extend_blocks<T: Sample>(&self, blocks: &SegmentMatrix<'_, T>) -> Vec<Vec<Complex64>> {
        let ws = self.config.window_size;
        let zero = Complex64::new(0.0, 0.0);

        (0..blocks.len())
            .map(|p| {
                let mut ext = to_complex_vec(blocks.block(p));
                match (self.config.boundary, blocks.get(p + 1)) {
                    (Boundary::WrapToNextBlock, Some(next)) => {
                        ext.extend(next.iter().map(|s| s.to_complex()));
                    }
                    _ => ext.resize(2 * ws, zero),
                }
                ext
            })
            .collect()
    }
}

impl CyclicEstimator for CcsdEstimator {
    fn estimate<T: Sample>(&self, signal: &[T]) -> CycloResult<Array2<f64>> {
        CcsdEstimator::estimate(self, signal)
    }

    fn check_signal_len(&self, len: usize) -> CycloResult<()> {
        if self.config.window_size > len {
            return Err(CycloError::DimensionMismatch {
                window_size: self.config.window_size,
                signal_len: len,
            });
        }
        Ok(())
    }

    fn parallel(&self) -> bool {
        self.config.parallel
    }
}

/// Estimate the cyclic-lag spectral density of `signal`.
pub fn estimate_ccsd<T: Sample>(
    signal: &[T],
    window_size: usize,
    step: usize,
    sigma: f64,
    kernel: Kernel,
    boundary: Boundary,
) -> CycloResult<Array2<f64>> {
    let config = CcsdConfig::builder()
        .window_size(window_size)
        .step(step)
        .sigma(sigma)
        .kernel(kernel)
        .boundary(boundary)
        .build();
    CcsdEstimator::new(config)?.estimate(signal)
}

/// CHTC: tanh-product kernel over blocks wrapped into their successors.
pub fn estimate_chtc<T: Sample>(signal: &[T], window_size: usize, step: usize) -> CycloResult<Array2<f64>> {
    let config = CcsdConfig::builder()
        .window_size(window_size)
        .step(step)
        .kernel(Kernel::TanhProduct)
        .boundary(Boundary::WrapToNextBlock)
        .build();
    CcsdEstimator::new(config)?.estimate(signal)
}
