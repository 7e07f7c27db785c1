mod common;
use approx::assert_abs_diff_eq;
use common::sparse_recording;
use mea::spectral::{estimate_psd, segment_count};
use mea::{Kernel, MeaError, PsdParams};
use std::f64::consts::PI;

fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
}

#[test]
fn pure_tone_peak_with_defaults() {
    let fs = 1_000.0;
    let x = tone(50.0, fs, 8_000);
    let psd = estimate_psd(&x, fs, &PsdParams::default()).unwrap();

    assert_eq!(psd.params.window_length, 1_000);
    assert_eq!(psd.params.nfft, 2_048);
    assert_eq!(psd.frequencies.len(), 1_025);
    assert!((psd.peak_frequency - 50.0).abs() <= psd.bin_width());
}

#[test]
fn pure_tone_peak_with_hann() {
    let fs = 2_000.0;
    let x = tone(123.0, fs, 16_384);
    let params = PsdParams {
        window_length: Some(1_024),
        noverlap: Some(512),
        nfft: Some(1_024),
        kernel: Some("hann".into()),
    };
    let psd = estimate_psd(&x, fs, &params).unwrap();
    assert!((psd.peak_frequency - 123.0).abs() <= psd.bin_width());
    assert_abs_diff_eq!(psd.frequencies[1], fs / 1_024.0, epsilon = 1e-12);
}

#[test]
fn linear_trend_is_removed() {
    let fs = 500.0;
    let x: Vec<f64> = tone(40.0, fs, 4_000)
        .iter()
        .enumerate()
        .map(|(i, v)| v + 0.5 * i as f64)
        .collect();
    let psd = estimate_psd(&x, fs, &PsdParams::default()).unwrap();
    assert!((psd.peak_frequency - 40.0).abs() <= psd.bin_width());
}

#[test]
fn periodic_bursts_peak_at_burst_rate() {
    // All channels fire every 250 samples at 1 kHz: 4 Hz bursts.
    let spikes: Vec<_> = (0..60)
        .flat_map(|c| (1..80).map(move |k| (c, k * 250)))
        .collect();
    let rec = sparse_recording(&spikes, 20_000, 1_000.0);
    let psd = rec.power_spectral_density(0.05, Kernel::Boxcar, &PsdParams::default()).unwrap();
    assert!((psd.peak_frequency - 4.0).abs() <= psd.bin_width());
}

#[test]
fn inconsistent_parameters_are_rejected() {
    let x = vec![1.0; 1_000];
    let overlap = PsdParams { window_length: Some(100), noverlap: Some(100), ..Default::default() };
    assert!(matches!(
        estimate_psd(&x, 100.0, &overlap),
        Err(MeaError::InvalidParameter { name: "noverlap", .. })
    ));

    let short_fft = PsdParams { window_length: Some(100), nfft: Some(64), ..Default::default() };
    assert!(matches!(
        estimate_psd(&x, 100.0, &short_fft),
        Err(MeaError::InvalidParameter { name: "nfft", .. })
    ));

    // Too short for the default segment length.
    assert!(estimate_psd(&[1.0; 7], 100.0, &PsdParams::default()).is_err());
}

#[test]
fn oversized_segment_is_rejected() {
    let x = tone(10.0, 100.0, 100);
    let p = PsdParams { window_length: Some(10_000), ..Default::default() };
    assert!(matches!(
        estimate_psd(&x, 100.0, &p),
        Err(MeaError::InvalidParameter { name: "window_length", .. })
    ));

    // A single segment spanning the whole signal is fine.
    let whole = PsdParams { window_length: Some(100), ..Default::default() };
    let psd = estimate_psd(&x, 100.0, &whole).unwrap();
    assert_eq!(psd.params.window_length, 100);
    assert_eq!(segment_count(100, 100, psd.params.noverlap), 1);
}
