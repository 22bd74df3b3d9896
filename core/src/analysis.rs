//! Rolling analysis buffer
//!
//! A letter can take most of a second to send, so a single capture window
//! rarely holds enough timing to decode. Capture windows are appended here
//! while a transmission lasts and the whole accumulated audio is decoded
//! each time; the decoded text then grows from one window to the next. A
//! capture window without any tone ends the transmission and clears the
//! buffer.

use crate::spectrum::detect_tones;
use crate::types::DecoderParams;
use tracing::{debug, trace};

/// Audio to decode for one capture window
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisJob {
    pub samples: Vec<f32>,
    /// The capture window was silent, so this is the final decode of the
    /// transmission
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct AnalysisBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    max_len: usize,
}

impl AnalysisBuffer {
    pub fn new(params: &DecoderParams, sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            max_len: params.max_record_len(sample_rate),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append one capture window and return the audio to decode for it
    pub fn push_window(&mut self, window: &[f32], params: &DecoderParams) -> AnalysisJob {
        let finished = detect_tones(window, self.sample_rate, params).is_empty();

        self.samples.extend_from_slice(window);
        if self.samples.len() > self.max_len {
            let excess = self.samples.len() - self.max_len;
            self.samples.drain(..excess);
            trace!(dropped = excess, "analysis buffer full, oldest audio dropped");
        }

        if finished {
            if self.samples.len() > window.len() {
                debug!(
                    seconds = self.samples.len() as f32 / self.sample_rate.max(1) as f32,
                    "transmission ended"
                );
            }
            AnalysisJob {
                samples: std::mem::take(&mut self.samples),
                finished,
            }
        } else {
            AnalysisJob {
                samples: self.samples.clone(),
                finished,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * 700.0 * i as f32 / 8000.0).sin())
            .collect()
    }

    #[test]
    fn test_accumulates_until_silence() {
        let params = DecoderParams::default();
        let mut buffer = AnalysisBuffer::new(&params, 8000);

        let job = buffer.push_window(&tone(4000), &params);
        assert!(!job.finished);
        assert_eq!(job.samples.len(), 4000);

        let job = buffer.push_window(&tone(4000), &params);
        assert!(!job.finished);
        assert_eq!(job.samples.len(), 8000);

        // The silent window is still analysed with the rest, then cleared
        let job = buffer.push_window(&[0.0; 4000], &params);
        assert!(job.finished);
        assert_eq!(job.samples.len(), 12000);
        assert!(buffer.is_empty());

        let job = buffer.push_window(&[0.0; 4000], &params);
        assert!(job.finished);
        assert_eq!(job.samples.len(), 4000);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_capped_at_max_record() {
        let params = DecoderParams {
            window_seconds: 0.5,
            max_record_seconds: 1.0,
            ..Default::default()
        };
        let mut buffer = AnalysisBuffer::new(&params, 8000);
        for _ in 0..5 {
            let job = buffer.push_window(&tone(4000), &params);
            assert!(job.samples.len() <= 8000);
        }
        assert_eq!(buffer.len(), 8000);
    }
}
