//! Parallel Processing Support
//!
//! Every estimator in this crate is embarrassingly parallel along at least
//! one axis (batch rows, lags, correlation planes, remap rows). This module
//! provides the single helper they share: an index map that runs on the
//! Rayon thread pool when the `parallel` feature is enabled and the caller
//! asks for it, and sequentially otherwise.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! cyclospec-core = { version = "0.1", default-features = false }  # sequential only
//! ```
//!
//! Results are always returned in index order, so both paths produce
//! identical output.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Whether this build can run work on the Rayon pool.
pub const fn available() -> bool {
    cfg!(feature = "parallel")
}

/// Evaluate `f` for every index in `0..n`, collecting results in index order.
///
/// Runs on the Rayon pool when `parallel` is true and the feature is
/// enabled.
pub fn map_indices<R, F>(n: usize, parallel: bool, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Send + Sync,
{
    #[cfg(feature = "parallel")]
    if parallel {
        return (0..n).into_par_iter().map(f).collect();
    }

    let _ = parallel;
    (0..n).map(f).collect()
}
