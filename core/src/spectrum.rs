//! Spectral tone detection
//!
//! Estimates the power spectral density of a window with Welch's method,
//! restricts it to the CW passband and picks the strongest local maxima.

use crate::peaks::{detect_extrema, ExtremumKind};
use crate::types::{DecoderParams, SpectralPeak, WelchWindow};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;
use tracing::trace;

/// One-sided power spectral density
#[derive(Debug, Clone)]
pub struct Psd {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
}

fn window_coefficients(kind: WelchWindow, len: usize) -> Vec<f64> {
    match kind {
        WelchWindow::Rectangular => vec![1.0; len],
        WelchWindow::Hann => (0..len)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / len as f64).cos())
            .collect(),
    }
}

/// Welch averaged periodogram.
///
/// Segments of `segment` samples overlap by `overlap`; a signal shorter than
/// one segment is zero-padded into a single segment.
pub fn welch_psd(
    samples: &[f32],
    sample_rate: u32,
    segment: usize,
    overlap: usize,
    window: WelchWindow,
) -> Psd {
    let fs = sample_rate as f64;
    let step = segment.saturating_sub(overlap).max(1);
    let coefficients = window_coefficients(window, segment);
    let window_power: f64 = coefficients.iter().map(|w| w * w).sum();
    let scale = 1.0 / (fs * window_power);

    let mut starts: Vec<usize> = (0..)
        .map(|k| k * step)
        .take_while(|start| start + segment <= samples.len())
        .collect();
    if starts.is_empty() {
        starts.push(0);
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(segment);
    let bins = segment / 2 + 1;
    let mut power = vec![0.0; bins];
    let mut buffer = vec![Complex::new(0.0, 0.0); segment];

    for &start in &starts {
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = samples.get(start + i).copied().unwrap_or(0.0) as f64;
            *slot = Complex::new(sample * coefficients[i], 0.0);
        }
        fft.process(&mut buffer);
        for (k, bin) in power.iter_mut().enumerate() {
            // One-sided: fold negative frequencies except DC and Nyquist
            let fold = if k == 0 || (segment % 2 == 0 && k == segment / 2) {
                1.0
            } else {
                2.0
            };
            *bin += buffer[k].norm_sqr() * scale * fold;
        }
    }

    let count = starts.len() as f64;
    power.iter_mut().for_each(|p| *p /= count);
    let frequencies = (0..bins).map(|k| k as f64 * fs / segment as f64).collect();

    Psd { frequencies, power }
}

/// Find the carrier frequencies present in a window, strongest first.
///
/// Returns nothing for silence or when the strongest passband bin does not
/// stand out from the passband mean by `min_peak_to_mean`.
pub fn detect_tones(samples: &[f32], sample_rate: u32, params: &DecoderParams) -> Vec<SpectralPeak> {
    let amplitude = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    if samples.is_empty() || amplitude == 0.0 || sample_rate == 0 {
        return Vec::new();
    }

    let psd = welch_psd(
        samples,
        sample_rate,
        params.welch_segment,
        params.welch_overlap,
        params.welch_window,
    );

    let band: Vec<(f64, f64)> = psd
        .frequencies
        .iter()
        .zip(psd.power.iter())
        .filter(|(f, _)| **f >= params.passband_low_hz && **f <= params.passband_high_hz)
        .map(|(&f, &p)| (f, p))
        .collect();
    if band.is_empty() {
        return Vec::new();
    }

    let band_power: Vec<f64> = band.iter().map(|&(_, p)| p).collect();
    let mean = band_power.iter().sum::<f64>() / band_power.len() as f64;
    let (max_index, max_power) = band_power
        .iter()
        .enumerate()
        .fold((0, 0.0f64), |(bi, bp), (i, &p)| if p > bp { (i, p) } else { (bi, bp) });

    if mean <= 0.0 || max_power / mean < params.min_peak_to_mean {
        trace!(ratio = max_power / mean.max(f64::MIN_POSITIVE), "no tone above noise floor");
        return Vec::new();
    }

    let mut peaks: Vec<SpectralPeak> = detect_extrema(&band_power, params.spectral_threshold)
        .into_iter()
        .filter(|e| e.kind == ExtremumKind::Max)
        .map(|e| SpectralPeak {
            frequency: band[e.index].0,
            power: e.value,
        })
        .collect();

    if peaks.is_empty() {
        peaks.push(SpectralPeak {
            frequency: band[max_index].0,
            power: max_power,
        });
    }

    peaks.sort_by(|a, b| b.power.partial_cmp(&a.power).unwrap_or(std::cmp::Ordering::Equal));
    peaks.truncate(params.max_tones);
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amplitude: f64, len: usize, rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / rate as f64).sin()) as f32)
            .collect()
    }

    #[test]
    fn test_silence_has_no_peaks() {
        let params = DecoderParams::default();
        assert!(detect_tones(&[0.0; 22050], 44100, &params).is_empty());
        assert!(detect_tones(&[], 44100, &params).is_empty());
    }

    #[test]
    fn test_single_tone() {
        let params = DecoderParams::default();
        let samples = sine(700.0, 0.5, 22050, 44100);
        let peaks = detect_tones(&samples, 44100, &params);
        assert_eq!(peaks.len(), 1);
        let bin = 44100.0 / 4096.0;
        assert!((peaks[0].frequency - 700.0).abs() <= bin);
    }

    #[test]
    fn test_two_tones_ranked_by_power() {
        let params = DecoderParams::default();
        // Both tones sit close to FFT bin centres (bins 56 and 111)
        let strong = sine(603.0, 0.6, 22050, 44100);
        let weak = sine(1195.0, 0.4, 22050, 44100);
        let mixed: Vec<f32> = strong.iter().zip(weak.iter()).map(|(a, b)| a + b).collect();

        let peaks = detect_tones(&mixed, 44100, &params);
        assert_eq!(peaks.len(), 2);
        assert!((peaks[0].frequency - 603.0).abs() < 11.0);
        assert!((peaks[1].frequency - 1195.0).abs() < 11.0);
        assert!(peaks[0].power > peaks[1].power);
    }

    #[test]
    fn test_out_of_band_tone_ignored() {
        let params = DecoderParams::default();
        let samples = sine(3500.0, 0.5, 22050, 44100);
        assert!(detect_tones(&samples, 44100, &params).is_empty());
    }

    #[test]
    fn test_short_window_is_padded() {
        let psd = welch_psd(&[1.0; 100], 8000, 256, 64, WelchWindow::Hann);
        assert_eq!(psd.power.len(), 129);
        assert_eq!(psd.frequencies.len(), 129);
        assert!(psd.power[0] > psd.power[64]);
    }
}
