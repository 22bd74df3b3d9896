use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Placeholder shown for a track whose text is not yet known
pub const PLACEHOLDER_LABEL: &str = "-";

/// Window function applied to each Welch segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum WelchWindow {
    Rectangular = 0,
    Hann = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPeak {
    pub frequency: f64,
    pub power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rising,
    Falling,
}

/// A tone onset or offset, indexed in envelope-difference samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub index: usize,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub duration: usize,
    pub kind: IntervalKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Symbol {
    Dot,
    Dash,
    IntraSpace,
    LetterSpace,
    WordSpace,
}

/// Decoded output for one tone of one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneDecode {
    pub frequency: f64,
    pub power: f64,
    pub signal: String,
    pub text: String,
}

/// Everything one window contributed; empty means no decodable signal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub tones: Vec<ToneDecode>,
    /// The transmission ended in this window: the tones carry their final text
    #[serde(default)]
    pub finished: bool,
}

impl WindowResult {
    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Provisional,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackView {
    pub frequency: f64,
    pub state: TrackState,
    pub label: String,
}

/// Row status of a display update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowStatus {
    /// Nothing heard in this window or the one before
    #[default]
    NoiseOnly,
    /// A transmission just ended; labels show the full final text
    Confirmed,
    InProgress,
}

/// What the display collaborator receives after every processed window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayUpdate {
    pub status: WindowStatus,
    pub active: Vec<TrackView>,
    /// Confirmed strings, oldest first
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecoderParams {
    pub window_seconds: f32,
    /// Longest stretch of audio kept for one transmission
    pub max_record_seconds: f32,
    pub welch_segment: usize,
    pub welch_overlap: usize,
    pub welch_window: WelchWindow,
    pub passband_low_hz: f64,
    pub passband_high_hz: f64,
    pub min_peak_to_mean: f64,
    pub spectral_threshold: f64,
    pub max_tones: usize,
    pub bandpass_relative_width: f64,
    pub bandpass_passes: usize,
    pub smoothing_cycles: usize,
    pub smoothing_passes: usize,
    pub edge_threshold: f64,
    pub kmeans_max_iterations: usize,
    pub kmeans_min_separation: f64,
    pub frequency_quantum_hz: f64,
    pub liveness_threshold: u32,
    pub history_capacity: usize,
    pub worker_threads: usize,
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self {
            window_seconds: 0.5,
            max_record_seconds: 60.0,
            welch_segment: 4096,
            welch_overlap: 1024,
            welch_window: WelchWindow::Rectangular,
            passband_low_hz: 200.0,
            passband_high_hz: 2000.0,
            min_peak_to_mean: 8.0,
            spectral_threshold: 0.2,
            max_tones: 3,
            bandpass_relative_width: 0.1,
            bandpass_passes: 4,
            smoothing_cycles: 6,
            smoothing_passes: 4,
            edge_threshold: 0.5,
            kmeans_max_iterations: 50,
            kmeans_min_separation: 1.5,
            frequency_quantum_hz: 20.0,
            liveness_threshold: 2,
            history_capacity: 10,
            worker_threads: 2,
        }
    }
}

impl DecoderParams {
    /// Overlay a (possibly partial) JSON object onto the defaults
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::InvalidParams(msg.to_string()));

        if !(self.window_seconds > 0.0) {
            return fail("windowSeconds must be positive");
        }
        if !(self.max_record_seconds >= self.window_seconds) {
            return fail("maxRecordSeconds must be at least windowSeconds");
        }
        if self.welch_segment < 2 {
            return fail("welchSegment must be at least 2");
        }
        if self.welch_overlap >= self.welch_segment {
            return fail("welchOverlap must be smaller than welchSegment");
        }
        if !(self.passband_low_hz >= 0.0 && self.passband_low_hz < self.passband_high_hz) {
            return fail("passband must satisfy 0 <= low < high");
        }
        for (name, value) in [
            ("spectralThreshold", self.spectral_threshold),
            ("edgeThreshold", self.edge_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::InvalidParams(format!("{name} must be in (0, 1]")));
            }
        }
        if !(self.bandpass_relative_width > 0.0 && self.bandpass_relative_width < 1.0) {
            return fail("bandpassRelativeWidth must be in (0, 1)");
        }
        if self.max_tones == 0 {
            return fail("maxTones must be at least 1");
        }
        if self.bandpass_passes == 0 || self.smoothing_passes == 0 || self.smoothing_cycles == 0 {
            return fail("filter passes and smoothing cycles must be at least 1");
        }
        if self.kmeans_max_iterations == 0 {
            return fail("kmeansMaxIterations must be at least 1");
        }
        if !(self.kmeans_min_separation >= 1.0) {
            return fail("kmeansMinSeparation must be >= 1");
        }
        if !(self.frequency_quantum_hz > 0.0) {
            return fail("frequencyQuantumHz must be positive");
        }
        if self.history_capacity == 0 {
            return fail("historyCapacity must be at least 1");
        }
        if self.worker_threads == 0 {
            return fail("workerThreads must be at least 1");
        }
        Ok(())
    }

    /// Number of samples in one capture window at the given rate
    pub fn window_len(&self, sample_rate: u32) -> usize {
        ((self.window_seconds * sample_rate as f32).round() as usize).max(1)
    }

    /// Cap on the accumulated analysis buffer, in samples
    pub fn max_record_len(&self, sample_rate: u32) -> usize {
        ((self.max_record_seconds * sample_rate as f32).round() as usize).max(self.window_len(sample_rate))
    }
}

/// Parameters for the synthetic CW generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthParams {
    pub wpm: f32,
    pub frequency_hz: f32,
    pub sample_rate: u32,
    pub amplitude: f32,
    pub ramp_ms: f32,
    pub noise_level: f32,
    pub noise_seed: u32,
    pub lead_in_seconds: f32,
    pub tail_seconds: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            wpm: 20.0,
            frequency_hz: 700.0,
            sample_rate: 44100,
            amplitude: 0.5,
            ramp_ms: 5.0,
            noise_level: 0.0,
            noise_seed: 12345,
            lead_in_seconds: 0.2,
            tail_seconds: 0.3,
        }
    }
}
