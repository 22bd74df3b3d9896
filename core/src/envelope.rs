use crate::types::DecoderParams;
use std::f64::consts::PI;

// Biquad filter structure
#[derive(Clone, Default)]
struct BiquadFilter {
    a0: f64,
    a1: f64,
    a2: f64,
    b1: f64,
    b2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadFilter {
    /// Constant 0 dB peak gain band-pass centred at `center_freq`
    fn new_bandpass(center_freq: f64, q: f64, sample_rate: f64) -> Self {
        let mut filter = Self::default();

        let w = 2.0 * PI * center_freq / sample_rate;
        let cos_w = w.cos();
        let alpha = w.sin() / (2.0 * q);

        let norm = 1.0 + alpha;
        filter.a0 = alpha / norm;
        filter.a1 = 0.0;
        filter.a2 = -alpha / norm;
        filter.b1 = (-2.0 * cos_w) / norm;
        filter.b2 = (1.0 - alpha) / norm;

        filter
    }

    fn process(&mut self, input: f64) -> f64 {
        let output = self.a0 * input + self.a1 * self.x1 + self.a2 * self.x2
            - self.b1 * self.y1
            - self.b2 * self.y2;

        // Update state
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Band-limit a window around `frequency`, running the filter `passes` times
/// with fresh state each pass.
pub fn bandpass(
    samples: &[f64],
    sample_rate: u32,
    frequency: f64,
    relative_width: f64,
    passes: usize,
) -> Vec<f64> {
    let q = 1.0 / (2.0 * relative_width);
    let mut filter = BiquadFilter::new_bandpass(frequency, q, sample_rate as f64);
    let mut signal = samples.to_vec();

    for _ in 0..passes {
        filter.reset();
        for sample in signal.iter_mut() {
            *sample = filter.process(*sample);
        }
    }

    signal
}

/// Moving average over `width` samples. The output is `width` samples
/// shorter than the input and never negative for non-negative input.
pub fn moving_average(source: &[f64], width: usize) -> Vec<f64> {
    if width == 0 {
        return source.to_vec();
    }
    if source.len() <= width {
        return Vec::new();
    }

    let len = source.len() - width;
    let scale = 1.0 / width as f64;
    let mut result = Vec::with_capacity(len);
    let mut sum: f64 = source[..width].iter().sum();
    result.push(sum * scale);

    for i in 1..len {
        sum += source[i + width - 1] - source[i - 1];
        // running-sum rounding can dip just below zero after a tone ends
        result.push((sum * scale).max(0.0));
    }

    result
}

/// Smoothing width for a tone: a fixed number of carrier periods
pub fn smoothing_width(sample_rate: u32, frequency: f64, cycles: usize) -> usize {
    let period = (sample_rate as f64 / frequency).round().max(1.0) as usize;
    cycles * period
}

/// Isolate one tone and return its smoothed power envelope.
///
/// The result is empty when the window is too short to survive the
/// smoothing cascade.
pub fn extract_envelope(
    samples: &[f64],
    sample_rate: u32,
    frequency: f64,
    params: &DecoderParams,
) -> Vec<f64> {
    if frequency <= 0.0 || sample_rate == 0 {
        return Vec::new();
    }

    let filtered = bandpass(
        samples,
        sample_rate,
        frequency,
        params.bandpass_relative_width,
        params.bandpass_passes,
    );
    let mut power: Vec<f64> = filtered.iter().map(|s| s * s).collect();

    let width = smoothing_width(sample_rate, frequency, params.smoothing_cycles);
    for _ in 0..params.smoothing_passes {
        power = moving_average(&power, width);
        if power.is_empty() {
            break;
        }
    }

    power
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, len: usize, rate: u32) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / rate as f64).sin())
            .collect()
    }

    fn rms(values: &[f64]) -> f64 {
        (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
    }

    #[test]
    fn test_moving_average() {
        let result = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(result, vec![1.5, 2.5, 3.5]);
        assert!(moving_average(&[1.0, 2.0], 2).is_empty());
    }

    #[test]
    fn test_bandpass_rejects_other_tone() {
        let rate = 44100;
        let passed = bandpass(&sine(700.0, 8820, rate), rate, 700.0, 0.1, 4);
        let rejected = bandpass(&sine(1400.0, 8820, rate), rate, 700.0, 0.1, 4);
        // Compare after the filters have settled
        let passed = rms(&passed[4410..]);
        let rejected = rms(&rejected[4410..]);
        assert!(passed > 0.5);
        assert!(rejected < passed * 0.01);
    }

    #[test]
    fn test_envelope_length_and_sign() {
        let params = DecoderParams::default();
        let rate = 44100;
        let samples = sine(700.0, 22050, rate);
        let envelope = extract_envelope(&samples, rate, 700.0, &params);

        let width = smoothing_width(rate, 700.0, params.smoothing_cycles);
        assert_eq!(width, 378);
        assert_eq!(envelope.len(), 22050 - 4 * width);
        assert!(envelope.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_envelope_tracks_keying() {
        let params = DecoderParams::default();
        let rate = 44100;
        let mut samples = vec![0.0; 22050];
        let tone = sine(700.0, 22050, rate);
        samples[8000..14000].copy_from_slice(&tone[8000..14000]);

        let envelope = extract_envelope(&samples, rate, 700.0, &params);
        let peak = envelope.iter().cloned().fold(0.0, f64::max);
        // Quiet well before the key-down, loud in the middle of it
        assert!(envelope[2000] < peak * 0.01);
        assert!(envelope[10000] > peak * 0.9);
    }

    #[test]
    fn test_short_window_gives_empty_envelope() {
        let params = DecoderParams::default();
        let envelope = extract_envelope(&sine(700.0, 1000, 44100), 44100, 700.0, &params);
        assert!(envelope.is_empty());
    }
}
