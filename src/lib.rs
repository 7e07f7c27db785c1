//! # mea — microelectrode-array recording analysis in pure Rust
//!
//! `mea` turns a multi-electrode voltage recording and its spike timestamps
//! into the arrays a 60-electrode MEA dashboard plots: a canonical channel
//! layout, a binary spike raster, bucketed spike counts, a smoothed
//! population firing rate, its Welch power spectral density, and 8×8 grid
//! projections of per-channel values.
//!
//! ## Pipeline overview
//!
//! ```text
//! raw [R, T] + timestamps (R lists) + channel_info [R]
//!   │
//!   ├─ mapping::ChannelMapper      custom ids → canonical [60, T]
//!   ├─ raster::build_raster        timestamps → binary [60, T]
//!   ├─ aggregate                   bucket counts [60, B], presence, totals
//!   ├─ convolve::convolve_raster   sliding boxcar count [60, T]
//!   │     └─ population_rate       Σ_c / window → spikes/s [T]
//!   ├─ spectral::estimate_psd      detrend → Welch → peak frequency
//!   └─ grid::project               [60] → [8, 8] (corners NaN)
//! ```
//!
//! ## Quick start
//!
//! ```
//! use mea::{analyze, AnalysisConfig, ElectrodeMapping, Recording};
//! use ndarray::Array2;
//!
//! // Three raw rows; row 0 is unused, rows 1 and 2 carry ids 5 and 12.
//! let mapping = ElectrodeMapping::from_json_str(r#"{"5": 10, "12": 20}"#).unwrap();
//! let raw: Array2<f32> = Array2::zeros((3, 20_000));
//! let spikes = vec![vec![0], vec![1_500, 9_000], vec![12_000]];
//!
//! let rec = Recording::new(&raw, &spikes, 10_000.0, &[0, 5, 12], &mapping).unwrap();
//! assert_eq!(rec.raster().nrows(), 60);
//!
//! let out = analyze(&rec, &AnalysisConfig::default()).unwrap();
//! assert_eq!(out.bucket_counts.dim(), (60, 2));
//! assert_eq!(out.totals[10], 2);
//! ```
//!
//! ## Running individual steps
//!
//! ```
//! use mea::aggregate::{aggregate_counts, AggregatedCounts};
//! use mea::raster::build_raster;
//! use mea::grid::project;
//!
//! let mut ts = vec![vec![]; 60];
//! ts[3] = vec![15_000];
//! let raster = build_raster(&ts, 60_000).unwrap();
//!
//! let AggregatedCounts::Buckets(counts) = aggregate_counts(&raster, 30_000.0, 1.0, false).unwrap()
//! else { unreachable!() };
//! assert_eq!(counts[[3, 0]], 1);
//!
//! let totals: Vec<f64> = counts.sum_axis(ndarray::Axis(1)).iter().map(|&v| v as f64).collect();
//! let grid = project(&totals).unwrap();
//! assert!(grid[[0, 0]].is_nan());
//! ```

pub mod aggregate;
pub mod config;
pub mod convolve;
pub mod error;
pub mod grid;
pub mod io;
pub mod mapping;
pub mod raster;
pub mod recording;
pub mod spectral;

use ndarray::{Array1, Array2, Array3};

/// Number of electrodes in the canonical layout.
pub const N_CHANNELS: usize = 60;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config / errors
pub use config::AnalysisConfig;
pub use error::{MeaError, Result};

// mapping
pub use mapping::{
    channel_info_from_nodes, parse_node_table, ChannelMapper, ElectrodeMapping, MappingReport,
    NodeEntry, Slot, UnmappedChannel, UnmappedReason,
};

// raster
pub use raster::{build_raster, extract_spike_waveforms, SpikeWaveform, SpikeWaveforms};

// aggregate
pub use aggregate::{
    active_channels, aggregate_counts, bucket_counts, downsample_binary_presence,
    population_counts, total_counts, AggregatedCounts,
};

// convolve
pub use convolve::{convolve_raster, population_rate, time_axis, Kernel};

// spectral
pub use spectral::{estimate_psd, PsdEstimate, PsdParams, ResolvedPsdParams, Window};

// grid
pub use grid::{project, project_columns, project_labels, unproject, GRID_SIDE};

// recording
pub use recording::{FiringRate, Recording};

/// Every array the dashboard displays for one recording.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Spike count per channel over the whole recording, `[60]`.
    pub totals: Array1<u32>,
    /// Spike count per channel and bucket, `[60, B]`.
    pub bucket_counts: Array2<u32>,
    /// Whether a channel fired in a bucket, `[60, B]`.
    pub presence: Array2<u8>,
    /// Spike count per bucket summed over channels, `[B]`.
    pub population_counts: Array1<u32>,
    /// Channels with `totals >= cfg.active_threshold`.
    pub active_channels: Vec<usize>,
    /// Population firing rate in spikes/s with its time axis.
    pub firing_rate: FiringRate,
    /// Welch PSD of the channel-summed smoothed raster.
    pub psd: PsdEstimate,
    /// `totals` on the 8×8 grid.
    pub totals_grid: Array2<f64>,
    /// `bucket_counts` on the grid, one frame per bucket, `[B, 8, 8]`.
    pub bucket_frames: Array3<f64>,
}

/// Run the **full analysis pass** on one recording.
///
/// # Steps
///
/// 1. Total and per-bucket spike counts ([`AnalysisConfig::bucket_seconds`]).
/// 2. Binary presence per bucket and population counts per bucket.
/// 3. Active channels by total count ([`AnalysisConfig::active_threshold`]).
/// 4. Smooth the raster with [`AnalysisConfig::kernel`] over
///    [`AnalysisConfig::window_seconds`]; sum channels and divide by the
///    window to get spikes/s.
/// 5. Welch PSD of the channel-summed smoothed raster
///    ([`AnalysisConfig::psd`]).
/// 6. Grid projections of totals and of every bucket.
///
/// # Errors
///
/// Fails if the bucket or window duration is invalid for the recording
/// (non-positive, shorter than one sample, or longer than the recording) or
/// if the PSD parameters are inconsistent with the trace length.
pub fn analyze(rec: &Recording, cfg: &AnalysisConfig) -> Result<Analysis> {
    let fs = rec.sampling_rate();

    // 1–2. Bucketed summaries.
    let totals = rec.total_counts();
    let bucket_counts = rec.bucket_counts(cfg.bucket_seconds)?;
    let presence = rec.binary_presence(cfg.bucket_seconds)?;
    let population_counts = aggregate::population_counts(&bucket_counts);

    // 3. Active channels.
    let active_channels = rec.active_channels(cfg.active_threshold);

    // 4. Smoothed population rate.
    let convolved = convolve::convolve_raster(rec.raster(), fs, cfg.window_seconds, cfg.kernel)?;
    let rate = convolve::population_rate(&convolved, cfg.window_seconds)?;
    let time = convolve::time_axis(rate.len(), fs)?;

    // 5. PSD of the channel sum (rate × window).
    let summed: Vec<f64> = convolved.sum_axis(ndarray::Axis(0)).to_vec();
    let psd = spectral::estimate_psd(&summed, fs, &cfg.psd)?;

    // 6. Grid projections.
    let totals_f: Vec<f64> = totals.iter().map(|&v| f64::from(v)).collect();
    let totals_grid = grid::project(&totals_f)?;
    let bucket_frames = grid::project_columns(&bucket_counts.mapv(f64::from))?;

    tracing::info!(
        n_buckets = bucket_counts.ncols(),
        active = active_channels.len(),
        peak_hz = psd.peak_frequency,
        "analysis complete"
    );

    Ok(Analysis {
        totals,
        bucket_counts,
        presence,
        population_counts,
        active_channels,
        firing_rate: FiringRate { time, rate },
        psd,
        totals_grid,
        bucket_frames,
    })
}
