/// Shared helpers for integration tests: synthetic recordings and a minimal
/// safetensors reader for checking written outputs.
use mea::{ElectrodeMapping, Recording, N_CHANNELS};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;

#[allow(unused)]
/// Deterministic linear congruential generator (no RNG dependency needed).
pub struct Lcg(pub u64);

#[allow(unused)]
impl Lcg {
    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 11
    }

    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

#[allow(unused)]
/// Canonical recording with the given `(channel, sample)` spikes and a
/// zero signal.
pub fn sparse_recording(spikes: &[(usize, usize)], n_samples: usize, fs: f64) -> Recording {
    let mut ts = vec![vec![]; N_CHANNELS];
    for &(c, t) in spikes {
        ts[c].push(t);
    }
    Recording::from_canonical(Array2::zeros((N_CHANNELS, n_samples)), ts, fs).unwrap()
}

#[allow(unused)]
/// Canonical recording with `per_channel` random spikes on every channel.
pub fn random_recording(seed: u64, per_channel: usize, n_samples: usize, fs: f64) -> Recording {
    let mut rng = Lcg(seed);
    let mut spikes = Vec::new();
    for c in 0..N_CHANNELS {
        for _ in 0..per_channel {
            spikes.push((c, 1 + rng.below(n_samples - 1)));
        }
    }
    sparse_recording(&spikes, n_samples, fs)
}

#[allow(unused)]
/// Mapping `id → index` from explicit pairs.
pub fn mapping(pairs: &[(u32, i64)]) -> ElectrodeMapping {
    pairs.iter().copied().collect()
}

#[allow(unused)]
/// Mapping for the MEA labelling scheme `col·10 + row` (1-based) used by
/// 60-electrode arrays: 12..17, 21..28, …, 82..87, in grid order.
pub fn mea_label_mapping() -> (ElectrodeMapping, Vec<u32>) {
    let labels: Vec<u32> = mea::grid::grid_positions()
        .map(|(r, c)| ((c + 1) * 10 + (r + 1)) as u32)
        .collect();
    let m = labels.iter().enumerate().map(|(i, &id)| (id, i as i64)).collect();
    (m, labels)
}

#[allow(unused)]
/// Load every tensor of a safetensors file as `(shape, values as f64)`.
pub fn load_tensors_f64(path: &Path) -> HashMap<String, (Vec<usize>, Vec<f64>)> {
    let bytes = std::fs::read(path)
        .unwrap_or_else(|_| panic!("output not found: {}", path.display()));

    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    let header: serde_json::Value = serde_json::from_slice(&bytes[8..8 + n]).unwrap();
    let data_start = 8 + n;

    let mut out = HashMap::new();
    for (key, val) in header.as_object().unwrap() {
        if key == "__metadata__" { continue; }
        let dtype = val["dtype"].as_str().unwrap();
        let offsets = val["data_offsets"].as_array().unwrap();
        let s = offsets[0].as_u64().unwrap() as usize;
        let e = offsets[1].as_u64().unwrap() as usize;
        let raw = &bytes[data_start + s..data_start + e];
        let shape: Vec<usize> = val["shape"].as_array().unwrap()
            .iter().map(|v| v.as_u64().unwrap() as usize).collect();

        let vals: Vec<f64> = match dtype {
            "F64" => raw.chunks_exact(8)
                .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
                .collect(),
            "F32" => raw.chunks_exact(4)
                .map(|b| f32::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            "U32" => raw.chunks_exact(4)
                .map(|b| u32::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            "I32" => raw.chunks_exact(4)
                .map(|b| i32::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            "U8" => raw.iter().map(|&b| b as f64).collect(),
            _ => continue,
        };
        out.insert(key.clone(), (shape, vals));
    }
    out
}

#[allow(unused)]
/// Maximum absolute difference between two slices.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}
