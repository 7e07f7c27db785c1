//! Analysis configuration.
//!
//! [`AnalysisConfig`] holds the tunable parameters of [`crate::analyze`] plus
//! the waveform-snippet bounds passed to [`crate::Recording::spike_waveforms`].
//! The defaults are the values the recording dashboard starts with.
use crate::aggregate;
use crate::convolve::{self, Kernel};
use crate::error::Result;
use crate::spectral::PsdParams;

/// Configuration for a full analysis pass over one recording.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use mea::AnalysisConfig;
///
/// let cfg = AnalysisConfig {
///     bucket_seconds: 0.5,     // half-second heatmap frames
///     window_seconds: 0.1,     // sharper firing-rate trace
///     ..AnalysisConfig::default()
/// };
/// assert_eq!(cfg.bucket_samples(60_000, 30_000.0).unwrap(), 15_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Duration of one aggregation bucket in seconds.
    ///
    /// Buckets are non-overlapping; a trailing partial bucket is dropped.
    /// Must not exceed the recording duration.
    ///
    /// Default: `1.0` s.
    pub bucket_seconds: f64,

    /// Length of the smoothing window used for the firing-rate trace, in
    /// seconds.  The kernel spans `floor(window_seconds × fs)` samples.
    ///
    /// Default: `0.2` s.
    pub window_seconds: f64,

    /// Smoothing kernel for the firing-rate trace.
    ///
    /// Default: [`Kernel::Boxcar`].
    pub kernel: Kernel,

    /// Minimum total spike count for a channel to be reported as active.
    ///
    /// Default: `5.0`.
    pub active_threshold: f64,

    /// Seconds of signal kept before each spike in waveform snippets.
    /// Not used by [`crate::analyze`].
    ///
    /// Default: `0.2` s.
    pub waveform_left_seconds: f64,

    /// Seconds of signal kept after each spike in waveform snippets.
    ///
    /// Default: `0.3` s.
    pub waveform_right_seconds: f64,

    /// Welch parameters for the PSD of the firing-rate trace.  Unset fields
    /// are derived from the trace length.
    pub psd: PsdParams,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bucket_seconds: 1.0,
            window_seconds: 0.2,
            kernel: Kernel::Boxcar,
            active_threshold: 5.0,
            waveform_left_seconds: 0.2,
            waveform_right_seconds: 0.3,
            psd: PsdParams::default(),
        }
    }
}

impl AnalysisConfig {
    /// Samples per aggregation bucket, `floor(bucket_seconds × fs)`, for a
    /// recording of `n_samples`; see [`aggregate::bucket_samples`].
    pub fn bucket_samples(&self, n_samples: usize, sampling_rate: f64) -> Result<usize> {
        aggregate::bucket_samples(n_samples, sampling_rate, self.bucket_seconds)
    }

    /// Samples per smoothing window, `floor(window_seconds × fs)`; see
    /// [`convolve::kernel_length`].
    ///
    /// ```
    /// use mea::AnalysisConfig;
    /// assert_eq!(AnalysisConfig::default().window_samples(30_000, 30_000.0).unwrap(), 6_000);
    /// ```
    pub fn window_samples(&self, n_samples: usize, sampling_rate: f64) -> Result<usize> {
        convolve::kernel_length(n_samples, sampling_rate, self.window_seconds)
    }
}
