//! # Cyclostationary Spectral Estimation
//!
//! This crate estimates second-order cyclostationary signatures of sampled
//! signals. Signals whose statistics repeat periodically (modulated
//! carriers, keyed data, rotating machinery) concentrate energy along
//! cyclic frequencies that ordinary power spectra cannot show.
//!
//! ## Overview
//!
//! Two estimator families share one block segmentation:
//!
//! - **FAM SCD** ([`fam`]): windowed block FFTs, phase correction and a
//!   spectral correlation tensor, reduced to a surface in one of three
//!   [`ScdMode`]s (coarse, cyclic-resolved, full FAM remap).
//! - **Cyclic-lag CCSD** ([`ccsd`]): a lag profile of a nonlinear similarity
//!   kernel, transformed along both axes into a cyclic spectral map. The
//!   tanh / wrap-to-next-block variant is exposed as [`estimate_chtc`].
//!
//! The batch drivers ([`batch`]) run either estimator over the rows of a 2-D
//! array and min-max normalize each result to `[0, 1]`.
//!
//! ## Signal Flow
//!
//! ```text
//! FAM:  signal → segment → (pad) → window → FFT → phase → conj(S)·S → mode → |·|
//! CCSD: signal → segment → extend → kernel(τ) → mean over blocks → −mean
//!                                  → FFT(t) → FFT(τ) → |·|
//! batch: rows → estimator → min-max normalize
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cyclospec_core::prelude::*;
//!
//! let signal: Vec<f64> = (0..4096).map(|n| if (n / 8) % 2 == 0 { 1.0 } else { -1.0 }).collect();
//!
//! let scd = FamEstimator::new(
//!     ScdConfig::builder().window_size(64).step(16).mode(ScdMode::Coarse).build(),
//! )
//! .unwrap();
//! assert_eq!(scd.estimate(&signal).unwrap().dim(), (64, 64));
//!
//! let ccsd = estimate_ccsd(&signal, 64, 64, 1.0, Kernel::GaussianDifference, Boundary::ZeroPad).unwrap();
//! assert_eq!(ccsd.dim(), (64, 64));
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): run rows, lags and correlation planes on the
//!   Rayon pool. Each config also has a runtime `parallel` flag.

pub mod batch;
pub mod ccsd;
pub mod config;
pub mod fam;
pub mod fft_utils;
pub mod observe;
pub mod parallel;
pub mod segment;
pub mod types;
pub mod windows;

// Re-export main types
pub use batch::{batch_ccsd, batch_scd, min_max_normalize, CyclicEstimator, NormalizedBatch};
pub use ccsd::{
    estimate_ccsd, estimate_chtc, Boundary, CcsdConfig, CcsdEstimator, Kernel, MeanRemoval,
};
pub use config::{ConfigError, CyclospecConfig};
pub use fam::{estimate_scd, FamEstimator, ScdConfig, ScdMode};
pub use segment::{segment, SegmentMatrix};
pub use types::{Complex, CycloError, CycloResult, Sample};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{batch_ccsd, batch_scd, CyclicEstimator, NormalizedBatch};
    pub use crate::ccsd::{
        estimate_ccsd, estimate_chtc, Boundary, CcsdConfig, CcsdEstimator, Kernel, MeanRemoval,
    };
    pub use crate::fam::{estimate_scd, FamEstimator, ScdConfig, ScdMode};
    pub use crate::types::{Complex, CycloError, CycloResult, Sample};
}
