//! cw-cli - decode Morse (CW) from a WAV file
//!
//! Streams the file through the listener in capture-sized chunks, the same
//! way live audio would arrive, printing every display update and finally
//! the confirmed history.

use anyhow::{bail, Context, Result};
use clap::Parser;
use cw_core::{
    synthesize_cw, DecoderParams, DisplayUpdate, Listener, SymbolTable, SynthParams, TrackState,
    WindowStatus,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cw-cli", version, about = "Decode Morse (CW) audio from a WAV file")]
struct Args {
    /// WAV file to decode (first channel is used)
    wav: Option<PathBuf>,

    /// JSON file with decoder parameters; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only print updates that show a live track or a new confirmed string
    #[arg(long)]
    visible_only: bool,

    /// Capture buffer length in milliseconds
    #[arg(long, default_value_t = 300)]
    chunk_ms: u32,

    /// Decode a synthesized rendering of TEXT instead of a file
    #[arg(long, value_name = "TEXT", conflicts_with = "wav")]
    selftest: Option<String>,
}

struct Audio {
    samples: Vec<f32>,
    sample_rate: u32,
}

fn load_params(path: Option<&Path>) -> Result<DecoderParams> {
    let Some(path) = path else {
        return Ok(DecoderParams::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    DecoderParams::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
}

fn read_wav(path: &Path) -> Result<Audio> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("Failed to read float samples")?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .context("Failed to read integer samples")?
        }
    };

    if channels > 1 {
        info!(channels, "using first channel only");
    }
    Ok(Audio {
        samples: interleaved.into_iter().step_by(channels).collect(),
        sample_rate: spec.sample_rate,
    })
}

fn format_update(window: u64, update: &DisplayUpdate) -> String {
    let status = match update.status {
        WindowStatus::NoiseOnly => "noise",
        WindowStatus::Confirmed => "confirmed",
        WindowStatus::InProgress => "decoding",
    };
    let mut line = format!("[{window:>4}] {status:<9}");
    if update.active.is_empty() {
        line.push_str("(no signal)");
    }
    for view in &update.active {
        let state = match view.state {
            TrackState::Live => "live",
            TrackState::Provisional => "new",
        };
        line.push_str(&format!(" {:>6.1} Hz {state:<4} {:?}", view.frequency, view.label));
    }
    line
}

/// Print filter for `--visible-only`
fn worth_showing(update: &DisplayUpdate, history_seen: usize) -> bool {
    update.history.len() != history_seen
        || update.status == WindowStatus::Confirmed
        || update.active.iter().any(|v| v.state == TrackState::Live)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cw_core=info,cw_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let params = load_params(args.config.as_deref())?;

    let audio = match (&args.wav, &args.selftest) {
        (Some(path), _) => read_wav(path)?,
        (None, Some(text)) => {
            let synth = SynthParams::default();
            let samples = synthesize_cw(text, &synth).context("Failed to synthesize")?;
            Audio {
                samples,
                sample_rate: synth.sample_rate,
            }
        }
        (None, None) => bail!("Provide a WAV file or --selftest TEXT"),
    };
    if audio.samples.is_empty() {
        warn!("input holds no samples");
    }
    info!(
        samples = audio.samples.len(),
        sample_rate = audio.sample_rate,
        "decoding {:.1} s of audio",
        audio.samples.len() as f32 / audio.sample_rate.max(1) as f32
    );

    let visible_only = args.visible_only;
    let mut window = 0u64;
    let mut history_seen = 0usize;
    let sink = move |update: &DisplayUpdate| {
        if !visible_only || worth_showing(update, history_seen) {
            println!("{}", format_update(window, update));
        }
        history_seen = update.history.len();
        window += 1;
    };

    let mut listener = Listener::new(params, SymbolTable::standard(), audio.sample_rate, sink)
        .context("Failed to start listener")?;

    let chunk = ((args.chunk_ms as u64 * audio.sample_rate as u64) / 1000).max(1) as usize;
    for piece in audio.samples.chunks(chunk) {
        listener.push_samples(piece);
    }
    // A trailing silent window lets tones that were still live get confirmed
    let silence = vec![0.0; listener.window_len()];
    listener.push_samples(&silence);

    let snapshot = listener.finish();
    println!("--- confirmed ---");
    for entry in &snapshot.history {
        println!("{entry}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_core::TrackView;

    fn view(state: TrackState, label: &str) -> TrackView {
        TrackView {
            frequency: 700.0,
            state,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_format_update() {
        let update = DisplayUpdate {
            status: WindowStatus::InProgress,
            active: vec![view(TrackState::Live, "CQ")],
            history: Vec::new(),
        };
        assert_eq!(format_update(3, &update), "[   3] decoding   700.0 Hz live \"CQ\"");
        assert_eq!(
            format_update(0, &DisplayUpdate::default()),
            "[   0] noise    (no signal)"
        );

        let done = DisplayUpdate {
            status: WindowStatus::Confirmed,
            active: vec![view(TrackState::Live, "CQ CQ DE TEST")],
            history: vec!["CQ CQ DE TEST".to_string()],
        };
        assert_eq!(
            format_update(9, &done),
            "[   9] confirmed  700.0 Hz live \"CQ CQ DE TEST\""
        );
    }

    #[test]
    fn test_worth_showing() {
        let provisional = DisplayUpdate {
            status: WindowStatus::InProgress,
            active: vec![view(TrackState::Provisional, "-")],
            history: Vec::new(),
        };
        assert!(!worth_showing(&provisional, 0));

        let confirmed = DisplayUpdate {
            status: WindowStatus::Confirmed,
            active: Vec::new(),
            history: vec!["CQ".to_string()],
        };
        assert!(worth_showing(&confirmed, 0));
        assert!(worth_showing(&confirmed, 1));
        assert!(!worth_showing(&DisplayUpdate::default(), 1));
    }

    #[test]
    fn test_read_wav_first_channel() {
        let path = std::env::temp_dir().join(format!("cw-cli-test-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for (left, right) in [(16384i16, -1), (-16384, 5), (0, 9)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let audio = read_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.samples, vec![0.5, -0.5, 0.0]);
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let params = load_params(None).unwrap();
        assert_eq!(params.window_seconds, 0.5);
        assert!(load_params(Some(Path::new("/nonexistent/cw.json"))).is_err());
    }
}
