//! Spike raster construction and waveform snippets.
//!
//! `raster[c, ts] = 1` for every timestamp `ts` of channel `c`.  A timestamp
//! of `0` is the "no spike" sentinel used by the acquisition export and is
//! skipped everywhere in this module.
use std::collections::BTreeMap;

use ndarray::{s, Array1, Array2};

use crate::error::{check_sampling_rate, MeaError, Result};

/// Build a binary raster `[C, n_samples]` from per-channel timestamp lists.
///
/// Every non-sentinel timestamp must be `< n_samples`; the first offending
/// one aborts with [`MeaError::IndexOutOfRange`].  Repeated timestamps set
/// the same cell, so the raster stays binary.
pub fn build_raster(timestamps: &[Vec<usize>], n_samples: usize) -> Result<Array2<u8>> {
    let mut raster = Array2::<u8>::zeros((timestamps.len(), n_samples));
    for (channel, row) in timestamps.iter().enumerate() {
        for &ts in row.iter().filter(|&&ts| ts != 0) {
            if ts >= n_samples {
                return Err(MeaError::IndexOutOfRange { channel, timestamp: ts, n_samples });
            }
            raster[[channel, ts]] = 1;
        }
    }
    Ok(raster)
}

/// Signal excerpt around one spike.
///
/// `samples` covers `[start, start + samples.len())` of the channel.  Near
/// the recording edges the requested window is clamped to `[0, T)`, so a
/// truncated snippet is shorter than `left + right` samples and its `start`
/// is not `timestamp - left`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeWaveform {
    pub start: usize,
    pub samples: Array1<f32>,
}

/// Per-channel map `timestamp → snippet`; one entry per signal row.
pub type SpikeWaveforms = Vec<BTreeMap<usize, SpikeWaveform>>;

/// Cut `[ts - left, ts + right)` around every spike of every channel.
///
/// `left_seconds` and `right_seconds` are converted with
/// `floor(seconds × sampling_rate)`.
pub fn extract_spike_waveforms(
    signal: &Array2<f32>,
    timestamps: &[Vec<usize>],
    sampling_rate: f64,
    left_seconds: f64,
    right_seconds: f64,
) -> Result<SpikeWaveforms> {
    check_sampling_rate(sampling_rate)?;
    for (name, v) in [("left_seconds", left_seconds), ("right_seconds", right_seconds)] {
        if !(v.is_finite() && v >= 0.0) {
            return Err(MeaError::invalid(name, format!("must be a non-negative duration, got {v}")));
        }
    }
    if timestamps.len() != signal.nrows() {
        return Err(MeaError::shape("timestamp rows", signal.nrows(), timestamps.len()));
    }

    let left = (left_seconds * sampling_rate) as usize;
    let right = (right_seconds * sampling_rate) as usize;
    let n_t = signal.ncols();

    let mut out = Vec::with_capacity(timestamps.len());
    for (channel, row) in timestamps.iter().enumerate() {
        let mut snippets = BTreeMap::new();
        for &ts in row.iter().filter(|&&ts| ts != 0) {
            if ts >= n_t {
                return Err(MeaError::IndexOutOfRange { channel, timestamp: ts, n_samples: n_t });
            }
            let start = ts.saturating_sub(left);
            let stop = (ts + right).min(n_t);
            let samples = signal.slice(s![channel, start..stop]).to_owned();
            snippets.insert(ts, SpikeWaveform { start, samples });
        }
        out.push(snippets);
    }
    Ok(out)
}
