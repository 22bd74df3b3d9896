//! Synthetic CW generator
//!
//! Renders text as a keyed sine at ITU timing. Used to exercise the decoder
//! end to end without a sound card.

use crate::error::{Error, Result};
use crate::symbols::SymbolTable;
use crate::types::SynthParams;
use std::f32::consts::PI;

// ITU timing constants
const DOT_LENGTH_WPM: f32 = 1.2; // dot duration = 1.2 / WPM seconds
const DOTS_PER_DASH: f32 = 3.0;
const DOTS_PER_CHAR_GAP: f32 = 3.0;
const DOTS_PER_WORD_GAP: f32 = 7.0;

// Deterministic noise source
struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    fn new(seed: u32) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    /// Uniform in [-1, 1)
    fn next_bipolar(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        (self.state >> 16) as f32 / 32768.0 - 1.0
    }
}

/// Key-down/key-up schedule for `text` as `(tone on, seconds)` pairs.
///
/// Whitespace separates words. Characters the table cannot encode are
/// skipped.
pub fn keying(text: &str, wpm: f32, table: &SymbolTable) -> Vec<(bool, f32)> {
    let dot_sec = DOT_LENGTH_WPM / wpm;
    let mut schedule = Vec::new();

    for (w, word) in text.split_whitespace().enumerate() {
        let mut word_started = false;
        for glyph in word.chars() {
            let Some(tokens) = table.encode(glyph) else {
                continue;
            };

            if !schedule.is_empty() {
                let gap = if word_started || w == 0 {
                    DOTS_PER_CHAR_GAP
                } else {
                    DOTS_PER_WORD_GAP
                };
                schedule.push((false, dot_sec * gap));
            }
            word_started = true;

            for (i, element) in tokens.chars().enumerate() {
                if i > 0 {
                    schedule.push((false, dot_sec));
                }
                let units = if element == '_' { DOTS_PER_DASH } else { 1.0 };
                schedule.push((true, dot_sec * units));
            }
        }
    }

    schedule
}

/// Render `text` as mono f32 samples
pub fn synthesize(text: &str, params: &SynthParams, table: &SymbolTable) -> Result<Vec<f32>> {
    if !(params.wpm > 0.0) {
        return Err(Error::Synthesis("wpm must be positive".to_string()));
    }
    if params.sample_rate == 0 {
        return Err(Error::Synthesis("sample rate must be positive".to_string()));
    }
    let nyquist = params.sample_rate as f32 / 2.0;
    if !(params.frequency_hz > 0.0 && params.frequency_hz < nyquist) {
        return Err(Error::Synthesis(format!(
            "frequency {} Hz outside (0, {nyquist})",
            params.frequency_hz
        )));
    }
    if !params.amplitude.is_finite() || !params.noise_level.is_finite() {
        return Err(Error::Synthesis("amplitude and noise must be finite".to_string()));
    }

    let rate = params.sample_rate as f32;
    let to_samples = |seconds: f32| (seconds.max(0.0) * rate).round() as usize;
    let ramp = to_samples(params.ramp_ms / 1000.0);

    let mut samples = vec![0.0f32; to_samples(params.lead_in_seconds)];
    for (on, seconds) in keying(text, params.wpm, table) {
        let len = to_samples(seconds);
        if !on {
            samples.resize(samples.len() + len, 0.0);
            continue;
        }

        // Linear attack/release to prevent key clicks
        let attack = ramp.min(len / 2);
        let release_start = len.saturating_sub(attack);
        let start = samples.len();
        samples.extend((0..len).map(|j| {
            let envelope = if j < attack {
                j as f32 / attack as f32
            } else if j >= release_start {
                (len - j) as f32 / attack as f32
            } else {
                1.0
            };
            let t = (start + j) as f32 / rate;
            params.amplitude * envelope * (2.0 * PI * params.frequency_hz * t).sin()
        }));
    }
    samples.resize(samples.len() + to_samples(params.tail_seconds), 0.0);

    if params.noise_level > 0.0 {
        let mut rng = SimpleRng::new(params.noise_seed);
        for sample in samples.iter_mut() {
            *sample += params.noise_level * rng.next_bipolar();
        }
    }

    Ok(samples)
}

/// Sum two renders, padding the shorter with silence
pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| a.get(i).copied().unwrap_or(0.0) + b.get(i).copied().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(schedule: &[(bool, f32)], wpm: f32) -> Vec<(bool, u32)> {
        let dot = DOT_LENGTH_WPM / wpm;
        schedule
            .iter()
            .map(|&(on, s)| (on, (s / dot).round() as u32))
            .collect()
    }

    #[test]
    fn test_keying_ratios() {
        let table = SymbolTable::standard();
        let schedule = keying("AE T", 20.0, table);
        assert_eq!(
            units(&schedule, 20.0),
            vec![
                (true, 1),
                (false, 1),
                (true, 3),
                (false, 3),
                (true, 1),
                (false, 7),
                (true, 3),
            ]
        );
    }

    #[test]
    fn test_keying_skips_unknown() {
        let table = SymbolTable::standard();
        assert_eq!(keying("E~E", 20.0, table), keying("EE", 20.0, table));
        assert!(keying("~~", 20.0, table).is_empty());
        assert!(keying("", 20.0, table).is_empty());
    }

    #[test]
    fn test_synthesize_length_and_level() {
        let params = SynthParams {
            noise_level: 0.0,
            ..Default::default()
        };
        let samples = synthesize("E", &params, SymbolTable::standard()).unwrap();
        // 0.2 s lead-in, one 60 ms dot, 0.3 s tail
        assert_eq!(samples.len(), 8820 + 2646 + 13230);
        assert!(samples[..8820].iter().all(|&s| s == 0.0));
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.45 && peak <= 0.5);
    }

    #[test]
    fn test_noise_is_deterministic() {
        let params = SynthParams {
            noise_level: 0.05,
            ..Default::default()
        };
        let table = SymbolTable::standard();
        let a = synthesize("K", &params, table).unwrap();
        let b = synthesize("K", &params, table).unwrap();
        assert_eq!(a, b);
        assert!(a[..100].iter().any(|&s| s != 0.0));
        assert!(a.iter().all(|s| s.abs() <= 0.55));
    }

    #[test]
    fn test_invalid_params() {
        let table = SymbolTable::standard();
        let bad_wpm = SynthParams {
            wpm: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            synthesize("E", &bad_wpm, table),
            Err(Error::Synthesis(_))
        ));
        let bad_freq = SynthParams {
            frequency_hz: 30000.0,
            ..Default::default()
        };
        assert!(synthesize("E", &bad_freq, table).is_err());
    }

    #[test]
    fn test_mix() {
        assert_eq!(mix(&[1.0, 1.0], &[0.5]), vec![1.5, 1.0]);
        assert!(mix(&[], &[]).is_empty());
    }
}
