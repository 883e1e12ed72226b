//! Discrete Fourier transform of a window's value sequence.
//!
//! The transform is unnormalised and unwindowed, so bin `k` of a length-`N`
//! input is `sum_n x[n] * exp(-2πi·k·n/N)`. The planner is kept between calls
//! so repeated queries on a window of the same length reuse the cached plan.

use crate::types::SpectrumBin;
use rustfft::{num_complex::Complex, FftPlanner};

pub struct SpectrumTransform {
    planner: FftPlanner<f64>,
}

impl SpectrumTransform {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Compute `values.len()` complex bins for a real input sequence
    pub fn compute(&mut self, values: &[f64]) -> Vec<SpectrumBin> {
        if values.is_empty() {
            return Vec::new();
        }

        let fft = self.planner.plan_fft_forward(values.len());

        let mut buffer: Vec<Complex<f64>> =
            values.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);

        buffer
            .iter()
            .map(|c| SpectrumBin {
                real: c.re,
                imag: c.im,
            })
            .collect()
    }
}

impl Default for SpectrumTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpectrumTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumTransform").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;

    fn naive_dft(values: &[f64]) -> Vec<SpectrumBin> {
        let n = values.len();
        (0..n)
            .map(|k| {
                let mut bin = SpectrumBin::default();
                for (t, &x) in values.iter().enumerate() {
                    let angle = -2.0 * PI * (k * t) as f64 / n as f64;
                    bin.real += x * angle.cos();
                    bin.imag += x * angle.sin();
                }
                bin
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let mut transform = SpectrumTransform::new();
        assert!(transform.compute(&[]).is_empty());
    }

    #[test]
    fn test_zero_input_gives_zero_bins() {
        let mut transform = SpectrumTransform::new();
        let bins = transform.compute(&[0.0; 4]);
        assert_eq!(bins.len(), 4);
        assert!(bins.iter().all(|b| b.real == 0.0 && b.imag == 0.0));
    }

    #[test]
    fn test_dc_component() {
        let mut transform = SpectrumTransform::new();
        let bins = transform.compute(&[1.0, 2.0, 3.0, 4.0]);
        assert!((bins[0].real - 10.0).abs() < EPS);
        assert!(bins[0].imag.abs() < EPS);
        // X[2] = 1 - 2 + 3 - 4
        assert!((bins[2].real + 2.0).abs() < EPS);
    }

    #[test]
    fn test_matches_naive_dft_for_odd_lengths() {
        let mut transform = SpectrumTransform::new();
        for n in [1usize, 3, 5, 7, 12] {
            let values: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin() + i as f64).collect();
            let fast = transform.compute(&values);
            let slow = naive_dft(&values);
            assert_eq!(fast.len(), n);
            for (a, b) in fast.iter().zip(slow.iter()) {
                assert!((a.real - b.real).abs() < 1e-6, "n={} real {} vs {}", n, a.real, b.real);
                assert!((a.imag - b.imag).abs() < 1e-6, "n={} imag {} vs {}", n, a.imag, b.imag);
            }
        }
    }
}
