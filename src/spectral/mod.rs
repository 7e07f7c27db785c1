//! Power spectral density of an aggregate rate signal.
//!
//! - [`detrend`]: least-squares linear detrending.
//! - [`window`]: periodic spectral windows.
//! - [`welch`]: averaged-periodogram estimator over fully resolved parameters.
//!
//! [`estimate_psd`] chains the three: detrend → resolve defaults
//! ([`PsdParams::resolve`]) → Welch → peak frequency.
//!
//! Defaults, applied in order and only when unset:
//!
//! ```text
//! window_length = len / 8
//! nfft          = next_pow2(window_length) · 2
//! noverlap      = window_length / 2
//! kernel        = "boxcar"
//! ```

pub mod detrend;
pub mod welch;
pub mod window;

pub use detrend::detrend_linear;
pub use welch::{segment_count, welch, Psd};
pub use window::Window;

use ndarray::Array1;

use crate::error::{check_sampling_rate, MeaError, Result};

/// Optional Welch parameters; `None` fields are defaulted by
/// [`resolve`](Self::resolve).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PsdParams {
    /// Segment length in samples (`nperseg`).
    pub window_length: Option<usize>,
    /// Overlap between consecutive segments in samples.
    pub noverlap: Option<usize>,
    /// FFT length; must be `>= window_length`.
    pub nfft: Option<usize>,
    /// Window name, e.g. `"boxcar"` or `"hann"`.
    pub kernel: Option<String>,
}

/// Welch parameters with every default applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPsdParams {
    pub window_length: usize,
    pub noverlap: usize,
    pub nfft: usize,
    pub window: Window,
}

impl ResolvedPsdParams {
    /// Check the parameters against a signal of `n` samples.
    pub fn validate(&self, n: usize) -> Result<()> {
        if self.window_length == 0 {
            return Err(MeaError::invalid("window_length", "must be at least one sample"));
        }
        if self.window_length > n {
            return Err(MeaError::invalid(
                "window_length",
                format!("{} exceeds the signal length {n}", self.window_length),
            ));
        }
        if self.noverlap >= self.window_length {
            return Err(MeaError::invalid(
                "noverlap",
                format!("{} must be smaller than window_length {}", self.noverlap, self.window_length),
            ));
        }
        if self.nfft < self.window_length {
            return Err(MeaError::invalid(
                "nfft",
                format!("{} must be at least window_length {}", self.nfft, self.window_length),
            ));
        }
        Ok(())
    }
}

impl PsdParams {
    /// Fill unset fields for a signal of `n` samples.
    ///
    /// A `window_length` longer than the signal is rejected, whether it was
    /// given or derived.
    pub fn resolve(&self, n: usize) -> Result<ResolvedPsdParams> {
        let window_length = self.window_length.unwrap_or(n / 8);
        if window_length == 0 {
            return Err(MeaError::invalid(
                "window_length",
                format!("resolves to 0 for a signal of {n} samples"),
            ));
        }
        let nfft = self.nfft.unwrap_or(next_pow2(window_length) * 2);
        let noverlap = self.noverlap.unwrap_or(window_length / 2);
        let window = match &self.kernel {
            Some(name) => name.parse()?,
            None => Window::Boxcar,
        };

        let resolved = ResolvedPsdParams { window_length, noverlap, nfft, window };
        resolved.validate(n)?;
        Ok(resolved)
    }
}

/// Smallest power of two `>= n` (`1` for `n = 0`).
pub fn next_pow2(n: usize) -> usize {
    n.next_power_of_two()
}

/// Spectral density of one signal and its dominant frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdEstimate {
    pub frequencies: Array1<f64>,
    pub power: Array1<f64>,
    /// Frequency of the first maximum of `power`.
    pub peak_frequency: f64,
    /// Parameters actually used.
    pub params: ResolvedPsdParams,
}

impl PsdEstimate {
    /// Frequency resolution `fs / nfft`.
    pub fn bin_width(&self) -> f64 {
        if self.frequencies.len() > 1 {
            self.frequencies[1] - self.frequencies[0]
        } else {
            0.0
        }
    }
}

/// Detrend `signal`, resolve `params`, and run Welch's method.
pub fn estimate_psd(signal: &[f64], sampling_rate: f64, params: &PsdParams) -> Result<PsdEstimate> {
    check_sampling_rate(sampling_rate)?;
    if signal.is_empty() {
        return Err(MeaError::invalid("signal", "cannot estimate the PSD of an empty signal"));
    }

    let detrended = detrend_linear(signal);
    let resolved = params.resolve(detrended.len())?;
    tracing::debug!(
        window_length = resolved.window_length,
        noverlap = resolved.noverlap,
        nfft = resolved.nfft,
        window = %resolved.window,
        "welch parameters resolved"
    );

    let Psd { frequencies, power, .. } = welch(&detrended, sampling_rate, &resolved)?;
    let peak_frequency = argmax(&power).map(|k| frequencies[k]).unwrap_or(0.0);

    Ok(PsdEstimate { frequencies, power, peak_frequency, params: resolved })
}

/// Index of the first maximum, ignoring NaN.
fn argmax(values: &Array1<f64>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
