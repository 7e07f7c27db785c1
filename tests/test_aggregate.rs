mod common;
use common::{random_recording, sparse_recording};
use mea::aggregate::{aggregate_counts, bucket_counts, downsample_binary_presence, total_counts};
use mea::{AggregatedCounts, MeaError, N_CHANNELS};
use ndarray::Axis;

#[test]
fn single_spike_lands_in_first_bucket() {
    // 2 s at 30 kHz, one spike on channel 3 at sample 15000.
    let rec = sparse_recording(&[(3, 15_000)], 60_000, 30_000.0);

    let raster = rec.raster();
    assert_eq!(raster.dim(), (N_CHANNELS, 60_000));
    assert_eq!(raster[[3, 15_000]], 1);
    assert_eq!(raster.iter().map(|&v| v as u32).sum::<u32>(), 1);

    let counts = rec.bucket_counts(1.0).unwrap();
    assert_eq!(counts.dim(), (N_CHANNELS, 2));
    assert_eq!(counts[[3, 0]], 1);
    assert_eq!(counts[[3, 1]], 0);
    assert_eq!(counts.sum(), 1);

    let presence = rec.binary_presence(1.0).unwrap();
    assert_eq!(presence[[3, 0]], 1);
    assert_eq!(presence.sum(), 1);
}

#[test]
fn totals_equal_raster_row_sums() {
    let rec = random_recording(7, 40, 12_345, 1_000.0);
    let totals = total_counts(rec.raster());
    let row_sums = rec.raster().map_axis(Axis(1), |r| r.iter().map(|&v| v as u32).sum::<u32>());
    assert_eq!(totals, row_sums);

    match aggregate_counts(rec.raster(), 1_000.0, 1.0, true).unwrap() {
        AggregatedCounts::Total(t) => assert_eq!(t, totals),
        other => panic!("expected totals, got {other:?}"),
    }
}

#[test]
fn bucket_sums_match_totals_when_evenly_divided() {
    // 10 s at 1 kHz, 2 s buckets: 5 buckets, nothing dropped.
    let rec = random_recording(11, 50, 10_000, 1_000.0);
    let buckets = bucket_counts(rec.raster(), 1_000.0, 2.0).unwrap();
    assert_eq!(buckets.ncols(), 5);
    assert_eq!(buckets.sum_axis(Axis(1)), rec.total_counts());
}

#[test]
fn trailing_remainder_is_dropped() {
    // 10.5 s at 1 kHz, 2 s buckets: samples 10000..10500 are outside every bucket.
    let spikes = [(0, 500), (0, 9_999), (0, 10_000), (0, 10_499), (1, 10_200)];
    let rec = sparse_recording(&spikes, 10_500, 1_000.0);
    let buckets = rec.bucket_counts(2.0).unwrap();

    assert_eq!(buckets.ncols(), 5);
    let totals = rec.total_counts();
    assert_eq!(totals[0] - buckets.row(0).sum(), 2);
    assert_eq!(totals[1] - buckets.row(1).sum(), 1);
}

#[test]
fn presence_is_binary_and_follows_counts() {
    let rec = random_recording(3, 25, 8_000, 1_000.0);
    let counts = rec.bucket_counts(0.5).unwrap();
    let presence = downsample_binary_presence(rec.raster(), 1_000.0, 0.5).unwrap();

    assert_eq!(presence.dim(), counts.dim());
    for (p, c) in presence.iter().zip(counts.iter()) {
        assert!(*p <= 1);
        assert_eq!(*p == 1, *c > 0);
    }
}

#[test]
fn bucket_longer_than_recording_is_rejected() {
    let rec = sparse_recording(&[], 1_000, 1_000.0);
    let err = rec.bucket_counts(2.0).unwrap_err();
    assert!(matches!(err, MeaError::InvalidParameter { name: "bucket_seconds", .. }));
    // Totals do not depend on the bucket size.
    assert!(rec.aggregate_counts(2.0, true).is_ok());
}

#[test]
fn active_channels_use_total_counts() {
    let mut spikes = Vec::new();
    for t in 1..=6 {
        spikes.push((12, t * 100));
    }
    for t in 1..=4 {
        spikes.push((40, t * 100));
    }
    let rec = sparse_recording(&spikes, 1_000, 1_000.0);
    assert_eq!(rec.active_channels(5.0), vec![12]);
    assert_eq!(rec.active_channels(4.0), vec![12, 40]);
}

#[test]
fn presence_rejects_invalid_buckets() {
    // 1 s at 1 kHz: 2 s is longer than the recording, 0.5 ms is below one sample.
    let rec = sparse_recording(&[(2, 10)], 1_000, 1_000.0);
    for bucket in [2.0, 0.0005] {
        assert!(matches!(
            rec.binary_presence(bucket),
            Err(MeaError::InvalidParameter { name: "bucket_seconds", .. })
        ));
        assert!(matches!(
            downsample_binary_presence(rec.raster(), 1_000.0, bucket),
            Err(MeaError::InvalidParameter { name: "bucket_seconds", .. })
        ));
        // Same rule as the bucketed counts.
        assert!(rec.bucket_counts(bucket).is_err());
    }
    assert_eq!(rec.binary_presence(1.0).unwrap().dim(), (N_CHANNELS, 1));
}
