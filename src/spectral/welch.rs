//! Welch power spectral density.
//!
//! Matches `scipy.signal.welch(x, fs, window, nperseg, noverlap, nfft,
//! detrend=False, scaling='density', average='mean')` for real input:
//!
//! 1. Cut `n_seg = (n - nperseg) / step + 1` segments, `step = nperseg - noverlap`.
//! 2. Multiply each segment by the window and zero-pad to `nfft`.
//! 3. `P_k = |FFT(seg)_k|² / (fs · Σ w²)`, averaged over segments.
//! 4. One-sided: bins `1..nfft/2` are doubled (DC and, for even `nfft`,
//!    Nyquist are not).
//!
//! Frequencies are `k · fs / nfft` for `k = 0..=nfft/2`.
use ndarray::Array1;
use rustfft::{num_complex::Complex, FftPlanner};

use super::ResolvedPsdParams;
use crate::error::{check_sampling_rate, MeaError, Result};

/// One-sided spectral density.
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    pub frequencies: Array1<f64>,
    pub power: Array1<f64>,
    /// Number of periodograms averaged.
    pub n_segments: usize,
}

/// Number of complete segments of `nperseg` samples advanced by `step`.
pub fn segment_count(n: usize, nperseg: usize, noverlap: usize) -> usize {
    if nperseg == 0 || n < nperseg || noverlap >= nperseg {
        return 0;
    }
    (n - nperseg) / (nperseg - noverlap) + 1
}

/// Welch estimate with fully specified parameters.
pub fn welch(x: &[f64], sampling_rate: f64, params: &ResolvedPsdParams) -> Result<Psd> {
    check_sampling_rate(sampling_rate)?;
    params.validate(x.len())?;

    let ResolvedPsdParams { window_length: nperseg, noverlap, nfft, window } = *params;
    let win = window.coefficients(nperseg);
    let energy: f64 = win.iter().map(|w| w * w).sum();
    if energy <= 0.0 {
        return Err(MeaError::invalid(
            "window_length",
            format!("{window} window of {nperseg} samples has zero energy"),
        ));
    }

    let step = nperseg - noverlap;
    let n_segments = segment_count(x.len(), nperseg, noverlap);
    let n_bins = nfft / 2 + 1;

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(nfft);
    let mut buf = vec![Complex::<f64>::default(); nfft];
    let mut acc = vec![0.0_f64; n_bins];

    for seg in 0..n_segments {
        let start = seg * step;
        for (b, (&v, &w)) in buf.iter_mut().zip(x[start..start + nperseg].iter().zip(win.iter())) {
            *b = Complex { re: v * w, im: 0.0 };
        }
        buf[nperseg..].fill(Complex::default());

        fft.process(&mut buf);

        for (a, c) in acc.iter_mut().zip(buf.iter()) {
            *a += c.norm_sqr();
        }
    }

    let scale = 1.0 / (sampling_rate * energy * n_segments as f64);
    // DC is never doubled; Nyquist only exists for even nfft.
    let doubled_end = if nfft % 2 == 0 { n_bins - 1 } else { n_bins };
    let power = Array1::from_shape_fn(n_bins, |k| {
        let p = acc[k] * scale;
        if k >= 1 && k < doubled_end { 2.0 * p } else { p }
    });
    let frequencies = Array1::from_shape_fn(n_bins, |k| k as f64 * sampling_rate / nfft as f64);

    Ok(Psd { frequencies, power, n_segments })
}
