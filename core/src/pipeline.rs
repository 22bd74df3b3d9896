//! Per-window decoding: spectrum → envelope → edges → timing → text
//!
//! Every window is decoded on its own; nothing here keeps state between
//! calls, so windows can be processed on any thread in any order.

use crate::classify::classify;
use crate::edges::{extract_transitions, intervals};
use crate::envelope::extract_envelope;
use crate::spectrum::detect_tones;
use crate::symbols::{signal_string, SymbolTable};
use crate::types::{DecoderParams, Interval, ToneDecode, WindowResult};
use tracing::{debug, trace};

/// Scale a window so its largest absolute sample is 1.0
pub fn normalize(samples: &[f32]) -> Vec<f64> {
    let peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    if peak == 0.0 {
        return vec![0.0; samples.len()];
    }
    let norm = 1.0 / peak as f64;
    samples.iter().map(|&s| s as f64 * norm).collect()
}

/// Turn classified intervals into a signal string and its text
pub fn decode_intervals(
    spans: &[Interval],
    params: &DecoderParams,
    table: &SymbolTable,
) -> Option<(String, String)> {
    if spans.is_empty() {
        return None;
    }
    let classification = classify(spans, params);
    if classification.symbols.is_empty() {
        return None;
    }
    trace!(
        unit = classification.unit,
        method = ?classification.method,
        "classified {} intervals",
        spans.len()
    );

    let signal = signal_string(&classification.symbols);
    let text = table.decode(&signal);
    Some((signal, text))
}

/// Decode one isolated envelope
pub fn decode_envelope(
    envelope: &[f64],
    params: &DecoderParams,
    table: &SymbolTable,
) -> Option<(String, String)> {
    let transitions = extract_transitions(envelope, params.edge_threshold);
    decode_intervals(&intervals(&transitions), params, table)
}

/// Decode every retained tone in one audio window.
///
/// Silence, tones without usable edges and windows too short to analyse all
/// simply contribute nothing.
pub fn decode_window(
    samples: &[f32],
    sample_rate: u32,
    params: &DecoderParams,
    table: &SymbolTable,
) -> WindowResult {
    let peaks = detect_tones(samples, sample_rate, params);
    if peaks.is_empty() {
        trace!(len = samples.len(), "no signal in window");
        return WindowResult::default();
    }

    let normalized = normalize(samples);
    let tones: Vec<ToneDecode> = peaks
        .iter()
        .filter_map(|peak| {
            let envelope = extract_envelope(&normalized, sample_rate, peak.frequency, params);
            let (signal, text) = decode_envelope(&envelope, params, table)?;
            Some(ToneDecode {
                frequency: peak.frequency,
                power: peak.power,
                signal,
                text,
            })
        })
        .collect();

    debug!(
        peaks = peaks.len(),
        decoded = tones.len(),
        "window decoded: {:?}",
        tones.iter().map(|t| t.text.as_str()).collect::<Vec<_>>()
    );

    WindowResult {
        tones,
        finished: false,
    }
}
