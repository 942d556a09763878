//! Analysis Windows
//!
//! The FAM front end tapers every block with a Hamming window before its
//! FFT. The window is rescaled to unit energy so that the spectral
//! correlation surface does not depend on the block length:
//!
//! ```text
//! w[n] = 0.54 - 0.46 * cos(2πn/(N-1))        symmetric Hamming
//! ŵ[n] = w[n] / sqrt(Σ w[k]²)                 Σ ŵ[n]² = 1
//! ```

use std::f64::consts::PI;

/// Generate a symmetric Hamming window.
///
/// w[n] = 0.54 - 0.46 * cos(2πn/(N-1))
pub fn hamming_window(length: usize) -> Vec<f64> {
    if length == 0 {
        return vec![];
    }
    if length == 1 {
        return vec![1.0];
    }

    let n_minus_1 = (length - 1) as f64;
    (0..length)
        .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f64 / n_minus_1).cos())
        .collect()
}

/// Rescale window coefficients in-place so that their squares sum to one.
///
/// An all-zero window is left untouched.
pub fn normalize_energy(window: &mut [f64]) {
    let energy: f64 = window.iter().map(|w| w * w).sum();
    if energy > 0.0 {
        let scale = 1.0 / energy.sqrt();
        for w in window.iter_mut() {
            *w *= scale;
        }
    }
}

/// Hamming window with unit energy, as used by the FAM analysis stage.
pub fn unit_energy_hamming(length: usize) -> Vec<f64> {
    let mut window = hamming_window(length);
    normalize_energy(&mut window);
    window
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hamming_endpoints_and_symmetry() {
        let w = hamming_window(64);
        assert_relative_eq!(w[0], 0.08, epsilon = 1e-12);
        assert_relative_eq!(w[63], 0.08, epsilon = 1e-12);
        for i in 0..32 {
            assert_relative_eq!(w[i], w[63 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_hamming_odd_length_peak() {
        let w = hamming_window(9);
        assert_relative_eq!(w[4], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_energy() {
        for &n in &[1usize, 2, 7, 64, 256, 1000] {
            let w = unit_energy_hamming(n);
            let energy: f64 = w.iter().map(|x| x * x).sum();
            assert_relative_eq!(energy, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(hamming_window(0).is_empty());
        assert!(unit_energy_hamming(0).is_empty());

        let mut zeros = vec![0.0; 4];
        normalize_energy(&mut zeros);
        assert_eq!(zeros, vec![0.0; 4]);
    }
}
