// Streaming CW (Morse) decoder
// Spectral tone detection, envelope timing analysis and per-frequency text tracking

pub mod analysis;
pub mod classify;
pub mod edges;
pub mod envelope;
pub mod error;
pub mod listener;
pub mod pcm;
pub mod peaks;
pub mod pipeline;
pub mod spectrum;
pub mod symbols;
pub mod synth;
pub mod tracker;
pub mod types;

// Re-export main public API
pub use analysis::{AnalysisBuffer, AnalysisJob};
pub use error::{Error, Result};
pub use listener::{ChannelSink, DisplaySink, Listener};
pub use pipeline::decode_window;
pub use symbols::{SymbolTable, UNKNOWN_SYMBOL};
pub use tracker::{OutputHistory, Tracker};
pub use types::*;

// Public API for direct Rust usage
pub fn decode(samples: &[f32], sample_rate: u32, params: &DecoderParams) -> WindowResult {
    pipeline::decode_window(samples, sample_rate, params, SymbolTable::standard())
}

pub fn synthesize_cw(text: &str, params: &SynthParams) -> Result<Vec<f32>> {
    synth::synthesize(text, params, SymbolTable::standard())
}

pub fn detect_tones(samples: &[f32], sample_rate: u32, params: &DecoderParams) -> Vec<SpectralPeak> {
    spectrum::detect_tones(samples, sample_rate, params)
}
