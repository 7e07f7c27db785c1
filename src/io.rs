//! Safetensors I/O for recordings and analysis outputs.
//!
//! Reader: a recording file carries
//!
//! | key               | shape    | dtype              |
//! |-------------------|----------|--------------------|
//! | `signal`          | `[R, T]` | F32 / F64          |
//! | `spike_timestamps`| `[R, K]` | I32 / I64 / F32 / F64, zero-padded |
//! | `channel_info`    | `[R]`    | I32 / I64 / F32 / F64 |
//! | `sampling_rate`   | `[1]`    | F32 / F64 / I32    |
//!
//! Zero entries in `spike_timestamps` are the "no spike" padding exported
//! by the acquisition software; they are kept and skipped downstream.
//!
//! Writer: [`StWriter`] collects named tensors and writes one file.
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Array3};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::Analysis;

// ── Low-level safetensors parser ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TensorEntry {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [usize; 2],
}

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, TensorEntry>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = usize::try_from(u64::from_le_bytes(len)).context("safetensors header length overflows")?;
    let data_start = n.checked_add(8).context("safetensors header length overflows")?;
    let header_bytes = bytes.get(8..data_start).context("truncated safetensors header")?;
    let raw: HashMap<String, serde_json::Value> =
        serde_json::from_slice(header_bytes).context("failed to parse safetensors header")?;

    let mut entries = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        if key == "__metadata__" {
            continue;
        }
        let entry: TensorEntry = serde_json::from_value(value)
            .with_context(|| format!("malformed header entry '{key}'"))?;
        entries.insert(key, entry);
    }
    Ok((entries, data_start))
}

/// Decode any supported numeric tensor to `f64`.
fn read_tensor_f64(bytes: &[u8], data_start: usize, name: &str, entry: &TensorEntry) -> Result<Vec<f64>> {
    let [s, e] = entry.data_offsets;
    let (start, end) = data_start
        .checked_add(s)
        .zip(data_start.checked_add(e))
        .with_context(|| format!("tensor '{name}': data offsets overflow"))?;
    let raw = bytes
        .get(start..end)
        .with_context(|| format!("tensor '{name}' exceeds file length"))?;
    let vals: Vec<f64> = match entry.dtype.as_str() {
        "F32" => raw.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "F64" => raw.chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        "I32" => raw.chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "I64" => raw.chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64)
            .collect(),
        "U32" => raw.chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "U8" => raw.iter().map(|&b| b as f64).collect(),
        other => bail!("tensor '{name}': unsupported dtype {other}"),
    };
    let expected: usize = entry.shape.iter().product();
    if vals.len() != expected {
        bail!("tensor '{name}': {} values for shape {:?}", vals.len(), entry.shape);
    }
    Ok(vals)
}

fn to_index(v: f64, name: &str) -> Result<usize> {
    if !(v.is_finite() && v >= 0.0 && v.fract() == 0.0) {
        bail!("{name}: {v} is not a non-negative integer");
    }
    Ok(v as usize)
}

// ── Recording file ──────────────────────────────────────────────────────────

/// Raw recording as exported by the acquisition side.
pub struct RecordingFile {
    /// [R, T] samples.
    pub signal: Array2<f32>,
    /// R spike-timestamp lists (sample indices, `0` = padding).
    pub spike_timestamps: Vec<Vec<usize>>,
    /// R custom channel ids.
    pub channel_info: Vec<u32>,
    /// Sampling rate in Hz, if stored in the file.
    pub sampling_rate: Option<f64>,
}

impl RecordingFile {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let entry = header.get("signal").context("missing 'signal' key")?;
        if entry.shape.len() != 2 {
            bail!("'signal' must be 2-D, got shape {:?}", entry.shape);
        }
        let (n_raw, n_t) = (entry.shape[0], entry.shape[1]);
        let vals = read_tensor_f64(&bytes, data_start, "signal", entry)?;
        let signal = Array2::from_shape_vec((n_raw, n_t), vals.into_iter().map(|v| v as f32).collect())?;

        let entry = header.get("spike_timestamps").context("missing 'spike_timestamps' key")?;
        let vals = read_tensor_f64(&bytes, data_start, "spike_timestamps", entry)?;
        let spike_timestamps: Vec<Vec<usize>> = match entry.shape.as_slice() {
            [r, 0] if *r == n_raw => vec![vec![]; n_raw],
            [r, k] if *r == n_raw => vals
                .chunks(*k)
                .map(|row| {
                    row.iter()
                        .map(|&v| to_index(v, "spike_timestamps"))
                        .collect::<Result<Vec<usize>>>()
                })
                .collect::<Result<_>>()?,
            shape => bail!("'spike_timestamps' must be [{n_raw}, K], got {shape:?}"),
        };

        let entry = header.get("channel_info").context("missing 'channel_info' key")?;
        let channel_info = read_tensor_f64(&bytes, data_start, "channel_info", entry)?
            .into_iter()
            .map(|v| to_index(v, "channel_info").map(|id| id as u32))
            .collect::<Result<Vec<u32>>>()?;
        if channel_info.len() != n_raw {
            bail!("'channel_info' has {} entries for {n_raw} signal rows", channel_info.len());
        }

        let sampling_rate = match header.get("sampling_rate") {
            Some(e) => read_tensor_f64(&bytes, data_start, "sampling_rate", e)?.first().copied(),
            None => None,
        };

        Ok(RecordingFile { signal, spike_timestamps, channel_info, sampling_rate })
    }
}

// ── Generic safetensors builder ─────────────────────────────────────────────

/// Safetensors writer for F64, F32, U32, U8 and I32 tensors.
///
/// ```rust,no_run
/// use mea::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("rate", &[1.0, 2.0, 3.0], &[3]);
/// w.add_u32("counts", &[4, 0, 1], &[3]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_u32(&mut self, name: &str, data: &[u32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "U32", shape.to_vec()));
    }

    pub fn add_u8(&mut self, name: &str, data: &[u8], shape: &[usize]) {
        self.entries.push((name.to_string(), data.to_vec(), "U8", shape.to_vec()));
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn add_f64_arr1(&mut self, name: &str, arr: &Array1<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.len()]);
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_f64_arr3(&mut self, name: &str, arr: &Array3<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, arr.shape());
    }

    pub fn add_u32_arr2(&mut self, name: &str, arr: &Array2<u32>) {
        let data: Vec<u32> = arr.iter().copied().collect();
        self.add_u32(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_u8_arr2(&mut self, name: &str, arr: &Array2<u8>) {
        let data: Vec<u8> = arr.iter().copied().collect();
        self.add_u8(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

// ── Analysis writer ─────────────────────────────────────────────────────────

/// Write every array of an [`Analysis`] to one safetensors file.
///
/// Keys: `totals`, `bucket_counts`, `presence`, `population_counts`,
/// `active_channels`, `rate_time`, `rate`, `psd_frequencies`, `psd_power`,
/// `psd_peak_frequency`, `totals_grid`, `bucket_frames`, and `raster` when
/// one is given.
pub fn write_analysis(analysis: &Analysis, raster: Option<&Array2<u8>>, path: &Path) -> Result<()> {
    let mut w = StWriter::new();

    w.add_u32("totals", &analysis.totals.to_vec(), &[analysis.totals.len()]);
    w.add_u32_arr2("bucket_counts", &analysis.bucket_counts);
    w.add_u8_arr2("presence", &analysis.presence);
    w.add_u32("population_counts", &analysis.population_counts.to_vec(), &[analysis.population_counts.len()]);

    let active: Vec<i32> = analysis.active_channels.iter().map(|&c| c as i32).collect();
    w.add_i32("active_channels", &active, &[active.len()]);

    w.add_f64_arr1("rate_time", &analysis.firing_rate.time);
    w.add_f64_arr1("rate", &analysis.firing_rate.rate);

    w.add_f64_arr1("psd_frequencies", &analysis.psd.frequencies);
    w.add_f64_arr1("psd_power", &analysis.psd.power);
    w.add_f64("psd_peak_frequency", &[analysis.psd.peak_frequency], &[1]);

    w.add_f64_arr2("totals_grid", &analysis.totals_grid);
    w.add_f64_arr3("bucket_frames", &analysis.bucket_frames);

    if let Some(r) = raster {
        w.add_u8_arr2("raster", r);
    }

    w.write(path)
}
