//! Sliding-window smoothing of a spike raster.
//!
//! Each channel is convolved with a kernel of
//! `kernel_length = floor(window_seconds × sampling_rate)` samples in "same"
//! mode: the output has the raster's length and is aligned with the centre of
//! the full convolution, i.e.
//!
//! ```text
//! full[j] = Σ_k raster[j - k] · kernel[k]
//! same[i] = full[i + (kernel_length - 1) / 2]
//! ```
//!
//! For the boxcar kernel this is a sliding spike count, computed per channel
//! from a prefix sum in `O(T)`.
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Axis, Zip};

use crate::error::{check_sampling_rate, check_seconds, MeaError, Result};

/// Smoothing kernels supported by [`convolve_raster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    /// Uniform weights of 1.
    #[default]
    Boxcar,
}

impl FromStr for Kernel {
    type Err = MeaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boxcar" => Ok(Kernel::Boxcar),
            _ => Err(MeaError::InvalidKernel(s.to_string())),
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::Boxcar => write!(f, "boxcar"),
        }
    }
}

/// Kernel length in samples for a window of `window_seconds` over a
/// recording of `n_samples`.
///
/// The window must cover at least one sample and must not be longer than
/// the recording.
pub fn kernel_length(n_samples: usize, sampling_rate: f64, window_seconds: f64) -> Result<usize> {
    check_sampling_rate(sampling_rate)?;
    check_seconds("window_seconds", window_seconds)?;
    let duration = n_samples as f64 / sampling_rate;
    if window_seconds > duration {
        return Err(MeaError::invalid(
            "window_seconds",
            format!("{window_seconds} s exceeds the recording duration of {duration} s"),
        ));
    }
    let n = (window_seconds * sampling_rate) as usize;
    if n == 0 {
        return Err(MeaError::invalid(
            "window_seconds",
            format!("{window_seconds} s is shorter than one sample at {sampling_rate} Hz"),
        ));
    }
    Ok(n)
}

/// Smooth every channel of `raster` ([C, T]) in "same" mode.
///
/// Channels are processed in parallel; each output row depends only on its
/// own raster row.
pub fn convolve_raster(
    raster: &Array2<u8>,
    sampling_rate: f64,
    window_seconds: f64,
    kernel: Kernel,
) -> Result<Array2<f64>> {
    let n_k = kernel_length(raster.ncols(), sampling_rate, window_seconds)?;
    tracing::debug!(%kernel, kernel_length = n_k, "convolving raster");

    let mut out = Array2::<f64>::zeros(raster.dim());
    Zip::from(out.rows_mut())
        .and(raster.rows())
        .par_for_each(|out_row, row| match kernel {
            Kernel::Boxcar => boxcar_same(row, out_row, n_k),
        });
    Ok(out)
}

/// "Same"-mode convolution of one row with a boxcar of `n_k` ones.
fn boxcar_same(x: ArrayView1<u8>, mut out: ArrayViewMut1<f64>, n_k: usize) {
    let n = x.len();
    // prefix[j] = Σ x[..j]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0u64);
    for &v in x.iter() {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + u64::from(v));
    }

    let shift = (n_k - 1) / 2;
    for (i, o) in out.iter_mut().enumerate() {
        // same[i] = Σ x[j] for j in [i + shift + 1 - n_k, i + shift]
        let hi = (i + shift + 1).min(n);
        let lo = (i + shift + 1).saturating_sub(n_k).min(hi);
        *o = (prefix[hi] - prefix[lo]) as f64;
    }
}

/// Population firing rate in spikes per second:
/// `Σ_c convolved[c, t] / window_seconds`.
pub fn population_rate(convolved: &Array2<f64>, window_seconds: f64) -> Result<Array1<f64>> {
    check_seconds("window_seconds", window_seconds)?;
    Ok(convolved.sum_axis(Axis(0)) / window_seconds)
}

/// Sample times in seconds, `t[i] = i / sampling_rate`.
pub fn time_axis(n_samples: usize, sampling_rate: f64) -> Result<Array1<f64>> {
    check_sampling_rate(sampling_rate)?;
    Ok(Array1::from_shape_fn(n_samples, |i| i as f64 / sampling_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct "same"-mode convolution for reference.
    fn naive_same(x: &[u8], n_k: usize) -> Vec<f64> {
        let n = x.len();
        let full: Vec<f64> = (0..n + n_k - 1)
            .map(|j| {
                (0..n_k)
                    .filter(|&k| k <= j && j - k < n)
                    .map(|k| x[j - k] as f64)
                    .sum()
            })
            .collect();
        let start = (n_k - 1) / 2;
        full[start..start + n].to_vec()
    }

    #[test]
    fn boxcar_matches_direct_convolution() {
        let x: Vec<u8> = (0..37).map(|i| u8::from(i % 5 == 0 || i % 7 == 3)).collect();
        for n_k in [1usize, 2, 3, 4, 9, 36, 37] {
            let raster = Array2::from_shape_vec((1, x.len()), x.clone()).unwrap();
            let got = convolve_raster(&raster, 1.0, n_k as f64, Kernel::Boxcar).unwrap();
            let exp = naive_same(&x, n_k);
            for (g, e) in got.row(0).iter().zip(exp.iter()) {
                approx::assert_abs_diff_eq!(*g, *e, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn single_spike_spreads_over_window() {
        let mut raster = Array2::<u8>::zeros((2, 10));
        raster[[1, 5]] = 1;
        let y = convolve_raster(&raster, 1.0, 3.0, Kernel::Boxcar).unwrap();
        assert_eq!(y.row(0).sum(), 0.0);
        assert_eq!(y.row(1).to_vec(), vec![0., 0., 0., 0., 1., 1., 1., 0., 0., 0.]);
    }

    #[test]
    fn unknown_kernel_rejected() {
        assert_eq!("boxcar".parse::<Kernel>().unwrap(), Kernel::Boxcar);
        let err = "dual_exp".parse::<Kernel>().unwrap_err();
        assert_eq!(err, MeaError::InvalidKernel("dual_exp".into()));
    }

    #[test]
    fn window_shorter_than_sample_rejected() {
        let raster = Array2::<u8>::zeros((1, 10));
        assert!(convolve_raster(&raster, 10.0, 0.05, Kernel::Boxcar).is_err());
        assert!(convolve_raster(&raster, 10.0, -1.0, Kernel::Boxcar).is_err());
    }

    #[test]
    fn window_longer_than_recording_rejected() {
        let mut raster = Array2::<u8>::zeros((60, 10));
        raster[[0, 3]] = 1;
        let err = convolve_raster(&raster, 10.0, 5.0, Kernel::Boxcar).unwrap_err();
        assert!(matches!(err, MeaError::InvalidParameter { name: "window_seconds", .. }));
        // A window spanning the whole recording is still accepted.
        assert!(convolve_raster(&raster, 10.0, 1.0, Kernel::Boxcar).is_ok());
    }

    #[test]
    fn rate_divides_by_window() {
        let conv = Array2::from_elem((3, 4), 2.0);
        let rate = population_rate(&conv, 0.5).unwrap();
        assert_eq!(rate.to_vec(), vec![12.0; 4]);
        let t = time_axis(4, 2.0).unwrap();
        assert_eq!(t.to_vec(), vec![0.0, 0.5, 1.0, 1.5]);
    }
}
