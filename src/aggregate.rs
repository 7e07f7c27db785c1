//! Fixed-bucket summaries of a spike raster.
//!
//! The recording is split into non-overlapping buckets of
//! `bucket_size = floor(bucket_seconds × sampling_rate)` samples.  Only
//! complete buckets are kept: `n_buckets = floor(T / bucket_size)` and the
//! trailing `T mod bucket_size` samples are dropped.
use ndarray::{s, Array1, Array2, Axis};

use crate::error::{check_sampling_rate, check_seconds, MeaError, Result};

/// Spike counts, either per bucket or over the whole recording.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatedCounts {
    /// `[C, n_buckets]`.
    Buckets(Array2<u32>),
    /// `[C]`.
    Total(Array1<u32>),
}

impl AggregatedCounts {
    /// Per-channel activity level used for thresholding: the bucket mean for
    /// [`Buckets`](Self::Buckets), the raw total for [`Total`](Self::Total).
    pub fn channel_level(&self) -> Array1<f64> {
        match self {
            AggregatedCounts::Total(t) => t.mapv(f64::from),
            AggregatedCounts::Buckets(b) => {
                if b.ncols() == 0 {
                    return Array1::zeros(b.nrows());
                }
                b.mapv(f64::from).mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(b.nrows()))
            }
        }
    }
}

/// Validate `bucket_seconds` against the recording and return the bucket
/// size in samples.
pub fn bucket_samples(n_samples: usize, sampling_rate: f64, bucket_seconds: f64) -> Result<usize> {
    check_sampling_rate(sampling_rate)?;
    check_seconds("bucket_seconds", bucket_seconds)?;
    let duration = n_samples as f64 / sampling_rate;
    if bucket_seconds > duration {
        return Err(MeaError::invalid(
            "bucket_seconds",
            format!("{bucket_seconds} s exceeds the recording duration of {duration} s"),
        ));
    }
    let size = (bucket_seconds * sampling_rate) as usize;
    if size == 0 {
        return Err(MeaError::invalid(
            "bucket_seconds",
            format!("{bucket_seconds} s is shorter than one sample at {sampling_rate} Hz"),
        ));
    }
    Ok(size)
}

/// Per-channel spike count over the whole raster.
pub fn total_counts(raster: &Array2<u8>) -> Array1<u32> {
    raster.map_axis(Axis(1), |row| row.iter().map(|&v| u32::from(v)).sum())
}

/// Per-channel spike count in each complete bucket.
pub fn bucket_counts(raster: &Array2<u8>, sampling_rate: f64, bucket_seconds: f64) -> Result<Array2<u32>> {
    let size = bucket_samples(raster.ncols(), sampling_rate, bucket_seconds)?;
    let n_buckets = raster.ncols() / size;
    let mut out = Array2::<u32>::zeros((raster.nrows(), n_buckets));
    for b in 0..n_buckets {
        let start = b * size;
        let window = raster.slice(s![.., start..start + size]);
        let sums = window.map_axis(Axis(1), |row| row.iter().map(|&v| u32::from(v)).sum::<u32>());
        out.column_mut(b).assign(&sums);
    }
    tracing::debug!(bucket_size = size, n_buckets, dropped = raster.ncols() % size, "bucketed spike counts");
    Ok(out)
}

/// Spike counts per bucket, or over the full recording when `total` is set.
///
/// The bucket duration is only validated for the per-bucket form.
pub fn aggregate_counts(
    raster: &Array2<u8>,
    sampling_rate: f64,
    bucket_seconds: f64,
    total: bool,
) -> Result<AggregatedCounts> {
    if total {
        return Ok(AggregatedCounts::Total(total_counts(raster)));
    }
    bucket_counts(raster, sampling_rate, bucket_seconds).map(AggregatedCounts::Buckets)
}

/// `1` where a channel fired at least once in a bucket, else `0`.
pub fn downsample_binary_presence(
    raster: &Array2<u8>,
    sampling_rate: f64,
    bucket_seconds: f64,
) -> Result<Array2<u8>> {
    let size = bucket_samples(raster.ncols(), sampling_rate, bucket_seconds)?;
    let n_buckets = raster.ncols() / size;
    Ok(Array2::from_shape_fn((raster.nrows(), n_buckets), |(c, b)| {
        let start = b * size;
        u8::from(raster.slice(s![c, start..start + size]).iter().any(|&v| v != 0))
    }))
}

/// Indices of channels whose activity level is at least `threshold`.
pub fn active_channels(counts: &AggregatedCounts, threshold: f64) -> Vec<usize> {
    counts
        .channel_level()
        .iter()
        .enumerate()
        .filter_map(|(c, &level)| (level >= threshold).then_some(c))
        .collect()
}

/// Spike count summed over channels in each bucket (`[n_buckets]`).
pub fn population_counts(buckets: &Array2<u32>) -> Array1<u32> {
    buckets.sum_axis(Axis(0))
}
