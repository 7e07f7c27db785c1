//! One loaded recording in canonical layout, with its derived views.
//!
//! [`Recording::new`] maps the raw rows once, builds the raster once, and
//! keeps the mapping diagnostics.  Everything else (bucket counts, presence,
//! smoothing, PSD, waveforms) is recomputed on demand from those immutable
//! buffers.
use ndarray::{Array1, Array2};

use crate::aggregate::{self, AggregatedCounts};
use crate::convolve::{self, Kernel};
use crate::error::{check_sampling_rate, MeaError, Result};
use crate::mapping::{ChannelMapper, ElectrodeMapping, MappingReport};
use crate::raster::{self, SpikeWaveforms};
use crate::spectral::{self, PsdEstimate, PsdParams};
use crate::N_CHANNELS;

/// Population firing rate paired with its time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FiringRate {
    /// Seconds, `i / fs`.
    pub time: Array1<f64>,
    /// Spikes per second summed over channels.
    pub rate: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct Recording {
    signal: Array2<f32>,
    timestamps: Vec<Vec<usize>>,
    raster: Array2<u8>,
    sampling_rate: f64,
    labels: Vec<u32>,
    report: MappingReport,
}

impl Recording {
    /// Map raw rows to the canonical layout and build the raster.
    ///
    /// * `raw_signal`     – `[R, T]` samples.
    /// * `raw_timestamps` – `R` lists of sample indices (`0` = no spike).
    /// * `channel_info`   – `R` custom channel ids (`0` = unused row).
    pub fn new(
        raw_signal: &Array2<f32>,
        raw_timestamps: &[Vec<usize>],
        sampling_rate: f64,
        channel_info: &[u32],
        mapping: &ElectrodeMapping,
    ) -> Result<Self> {
        check_sampling_rate(sampling_rate)?;
        let report = ChannelMapper::new(mapping).plan(channel_info)?;
        let signal = report.canonical_signal(raw_signal)?;
        let timestamps = report.canonical_timestamps(raw_timestamps)?;
        let labels = report
            .sources
            .iter()
            .map(|src| src.map(|i| channel_info[i]).unwrap_or(0))
            .collect();
        Self::build(signal, timestamps, sampling_rate, labels, report)
    }

    /// Wrap data that is already in canonical order (`[60, T]`).
    pub fn from_canonical(
        signal: Array2<f32>,
        timestamps: Vec<Vec<usize>>,
        sampling_rate: f64,
    ) -> Result<Self> {
        check_sampling_rate(sampling_rate)?;
        if signal.nrows() != N_CHANNELS {
            return Err(MeaError::shape("canonical signal rows", N_CHANNELS, signal.nrows()));
        }
        let labels = (0..N_CHANNELS as u32).collect();
        Self::build(signal, timestamps, sampling_rate, labels, MappingReport::identity())
    }

    fn build(
        signal: Array2<f32>,
        timestamps: Vec<Vec<usize>>,
        sampling_rate: f64,
        labels: Vec<u32>,
        report: MappingReport,
    ) -> Result<Self> {
        if timestamps.len() != N_CHANNELS {
            return Err(MeaError::shape("canonical timestamp rows", N_CHANNELS, timestamps.len()));
        }
        let raster = raster::build_raster(&timestamps, signal.ncols())?;
        tracing::debug!(
            n_samples = signal.ncols(),
            sampling_rate,
            spikes = raster.iter().filter(|&&v| v != 0).count(),
            "recording loaded"
        );
        Ok(Self { signal, timestamps, raster, sampling_rate, labels, report })
    }

    /// Canonical signal, `[60, T]`.
    pub fn signal(&self) -> &Array2<f32> {
        &self.signal
    }

    /// Canonical spike timestamps, 60 lists.
    pub fn timestamps(&self) -> &[Vec<usize>] {
        &self.timestamps
    }

    /// Binary spike raster, `[60, T]`.
    pub fn raster(&self) -> &Array2<u8> {
        &self.raster
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn n_samples(&self) -> usize {
        self.signal.ncols()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.n_samples() as f64 / self.sampling_rate
    }

    /// Custom id feeding each canonical row (`0` for empty rows).
    pub fn channel_labels(&self) -> &[u32] {
        &self.labels
    }

    /// Diagnostics from the channel mapping.
    pub fn mapping_report(&self) -> &MappingReport {
        &self.report
    }

    /// Signal snippets around every spike; see [`raster::extract_spike_waveforms`].
    pub fn spike_waveforms(&self, left_seconds: f64, right_seconds: f64) -> Result<SpikeWaveforms> {
        raster::extract_spike_waveforms(
            &self.signal,
            &self.timestamps,
            self.sampling_rate,
            left_seconds,
            right_seconds,
        )
    }

    pub fn aggregate_counts(&self, bucket_seconds: f64, total: bool) -> Result<AggregatedCounts> {
        aggregate::aggregate_counts(&self.raster, self.sampling_rate, bucket_seconds, total)
    }

    pub fn total_counts(&self) -> Array1<u32> {
        aggregate::total_counts(&self.raster)
    }

    pub fn bucket_counts(&self, bucket_seconds: f64) -> Result<Array2<u32>> {
        aggregate::bucket_counts(&self.raster, self.sampling_rate, bucket_seconds)
    }

    pub fn binary_presence(&self, bucket_seconds: f64) -> Result<Array2<u8>> {
        aggregate::downsample_binary_presence(&self.raster, self.sampling_rate, bucket_seconds)
    }

    /// Channels whose total spike count reaches `threshold`.
    pub fn active_channels(&self, threshold: f64) -> Vec<usize> {
        aggregate::active_channels(&AggregatedCounts::Total(self.total_counts()), threshold)
    }

    /// Sliding-window spike counts, `[60, T]`.
    pub fn convolve(&self, window_seconds: f64, kernel: Kernel) -> Result<Array2<f64>> {
        convolve::convolve_raster(&self.raster, self.sampling_rate, window_seconds, kernel)
    }

    /// Population firing rate in spikes per second.
    pub fn firing_rate(&self, window_seconds: f64, kernel: Kernel) -> Result<FiringRate> {
        let convolved = self.convolve(window_seconds, kernel)?;
        let rate = convolve::population_rate(&convolved, window_seconds)?;
        let time = convolve::time_axis(rate.len(), self.sampling_rate)?;
        Ok(FiringRate { time, rate })
    }

    /// PSD of the channel-summed smoothed raster.
    pub fn power_spectral_density(
        &self,
        window_seconds: f64,
        kernel: Kernel,
        params: &PsdParams,
    ) -> Result<PsdEstimate> {
        let convolved = self.convolve(window_seconds, kernel)?;
        let summed = convolved.sum_axis(ndarray::Axis(0)).to_vec();
        spectral::estimate_psd(&summed, self.sampling_rate, params)
    }
}
