/// mea_analyze: load a recording from safetensors, map it to the canonical
/// 60-electrode layout, run the full analysis, and write every output array
/// to a safetensors file.
///
/// Output keys: see `mea::io::write_analysis`.
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mea::{
    analyze,
    io::{write_analysis, RecordingFile},
    AnalysisConfig, ElectrodeMapping, Kernel, PsdParams, Recording,
};

#[derive(Parser, Debug)]
#[command(name = "mea_analyze", about = "MEA spike raster, rate and PSD analysis")]
struct Args {
    /// Recording safetensors (signal, spike_timestamps, channel_info[, sampling_rate]).
    #[arg(long)]
    input: PathBuf,

    /// Electrode mapping JSON (custom channel id → canonical index).
    #[arg(long)]
    mapping: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Sampling rate in Hz; overrides the value stored in the recording.
    #[arg(long)]
    sampling_rate: Option<f64>,

    /// Aggregation bucket duration (s).
    #[arg(long, default_value_t = 1.0)]
    bucket_seconds: f64,

    /// Firing-rate smoothing window (s).
    #[arg(long, default_value_t = 0.2)]
    window_seconds: f64,

    /// Smoothing kernel.
    #[arg(long, default_value = "boxcar")]
    kernel: String,

    /// Minimum total spike count for an active channel.
    #[arg(long, default_value_t = 5.0)]
    active_threshold: f64,

    /// Welch segment length in samples (default: trace length / 8).
    #[arg(long)]
    psd_window_length: Option<usize>,

    /// Welch segment overlap in samples (default: segment length / 2).
    #[arg(long)]
    psd_noverlap: Option<usize>,

    /// Welch FFT length (default: 2 · next power of two of the segment length).
    #[arg(long)]
    psd_nfft: Option<usize>,

    /// Welch window name (default: boxcar).
    #[arg(long)]
    psd_window: Option<String>,

    /// Also write the full [60, T] raster.
    #[arg(long)]
    with_raster: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = RecordingFile::load(&args.input)?;
    let mapping_file = std::fs::File::open(&args.mapping)
        .with_context(|| format!("opening {}", args.mapping.display()))?;
    let mapping = ElectrodeMapping::from_reader(std::io::BufReader::new(mapping_file))?;

    let sampling_rate = match (args.sampling_rate, file.sampling_rate) {
        (Some(fs), _) | (None, Some(fs)) => fs,
        (None, None) => bail!("recording has no 'sampling_rate'; pass --sampling-rate"),
    };
    tracing::info!(
        rows = file.signal.nrows(),
        samples = file.signal.ncols(),
        sampling_rate,
        mapping_entries = mapping.len(),
        "loaded recording"
    );

    let rec = Recording::new(
        &file.signal,
        &file.spike_timestamps,
        sampling_rate,
        &file.channel_info,
        &mapping,
    )?;
    let report = rec.mapping_report();
    tracing::info!(
        mapped = report.n_mapped(),
        unused = report.unused.len(),
        unmapped = report.n_unmapped(),
        "channel mapping"
    );

    let cfg = AnalysisConfig {
        bucket_seconds: args.bucket_seconds,
        window_seconds: args.window_seconds,
        kernel: args.kernel.parse::<Kernel>()?,
        active_threshold: args.active_threshold,
        psd: PsdParams {
            window_length: args.psd_window_length,
            noverlap: args.psd_noverlap,
            nfft: args.psd_nfft,
            kernel: args.psd_window,
        },
        ..AnalysisConfig::default()
    };

    let analysis = analyze(&rec, &cfg)?;
    println!(
        "{} buckets  {} active channels  peak {:.3} Hz",
        analysis.bucket_counts.ncols(),
        analysis.active_channels.len(),
        analysis.psd.peak_frequency,
    );

    write_analysis(&analysis, args.with_raster.then(|| rec.raster()), &args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}
