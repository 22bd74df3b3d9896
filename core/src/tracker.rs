//! Streaming confirmation of per-frequency decodes
//!
//! Each window re-decodes the whole transmission heard so far, so the raw
//! text for one tone grows but its tail can change while a letter is still
//! being sent. The tracker keys tones by quantised frequency, shows only the
//! part of the text that two windows in a row agree on, and moves a tone's
//! text into the history once the tone has been heard long enough and then
//! goes away or its transmission ends.

use crate::symbols::UNKNOWN_SYMBOL;
use crate::types::{
    DecoderParams, DisplayUpdate, ToneDecode, TrackState, TrackView, WindowResult, WindowStatus,
    PLACEHOLDER_LABEL,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace};

/// Bounded FIFO of confirmed strings, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl OutputHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest one when full
    pub fn push(&mut self, entry: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTrack {
    pub key: u32,
    pub frequency: f64,
    pub power: f64,
    /// Consecutive windows the tone has been matched after its first one
    pub age: u32,
    pub last_text: String,
    pub displayed: String,
}

impl FrequencyTrack {
    fn new(key: u32, tone: &ToneDecode) -> Self {
        Self {
            key,
            frequency: tone.frequency,
            power: tone.power,
            age: 0,
            last_text: tone.text.clone(),
            displayed: PLACEHOLDER_LABEL.to_string(),
        }
    }

    pub fn state(&self, liveness_threshold: u32) -> TrackState {
        if self.age >= liveness_threshold {
            TrackState::Live
        } else {
            TrackState::Provisional
        }
    }

    fn observe(&mut self, tone: &ToneDecode) {
        let agreed = common_prefix(&self.last_text, &tone.text);
        self.displayed = if agreed.trim().is_empty() {
            PLACEHOLDER_LABEL.to_string()
        } else {
            agreed.to_string()
        };
        self.age = self.age.saturating_add(1);
        self.frequency = tone.frequency;
        self.power = tone.power;
        self.last_text = tone.text.clone();
    }

    fn view(&self, liveness_threshold: u32) -> TrackView {
        TrackView {
            frequency: self.frequency,
            state: self.state(liveness_threshold),
            label: self.displayed.clone(),
        }
    }
}

/// Longest leading part shared by both strings, on character boundaries
fn common_prefix<'a>(previous: &'a str, next: &str) -> &'a str {
    let end = previous
        .char_indices()
        .zip(next.chars())
        .find(|((_, a), b)| a != b)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| previous.len().min(next.len()));
    &previous[..end]
}

/// Whether a decoded string carries any recognised character
pub fn is_meaningful(text: &str) -> bool {
    if text == PLACEHOLDER_LABEL {
        return false;
    }
    let stripped: String = text.split_whitespace().collect();
    !stripped.replace(UNKNOWN_SYMBOL, "").is_empty()
}

#[derive(Debug, Clone)]
pub struct Tracker {
    tracks: BTreeMap<u32, FrequencyTrack>,
    history: OutputHistory,
    quantum_hz: f64,
    liveness_threshold: u32,
    /// Whether the previous window ended a transmission
    prev_finished: bool,
}

impl Tracker {
    pub fn new(params: &DecoderParams) -> Self {
        Self {
            tracks: BTreeMap::new(),
            history: OutputHistory::new(params.history_capacity),
            quantum_hz: params.frequency_quantum_hz,
            liveness_threshold: params.liveness_threshold,
            prev_finished: true,
        }
    }

    fn key_for(&self, frequency: f64) -> u32 {
        (frequency / self.quantum_hz).round().max(0.0) as u32
    }

    /// Find an unclaimed track at this key or next to it, exact key first
    fn find_track(&self, key: u32, claimed: &[u32]) -> Option<u32> {
        [Some(key), key.checked_sub(1), key.checked_add(1)]
            .into_iter()
            .flatten()
            .find(|k| self.tracks.contains_key(k) && !claimed.contains(k))
    }

    fn confirm(&mut self, key: u32, track: FrequencyTrack) {
        let live = track.state(self.liveness_threshold) == TrackState::Live;
        if live && is_meaningful(&track.last_text) {
            let text = track.last_text.trim().to_string();
            debug!(key, text = %text, "tone ended, text confirmed");
            self.history.push(text);
        } else {
            trace!(key, age = track.age, "tone ended without confirmation");
        }
    }

    /// Fold one window's detections into the tracks and return what to show
    pub fn apply(&mut self, window: &WindowResult) -> DisplayUpdate {
        let finished = window.finished || window.tones.is_empty();
        let status = match (self.prev_finished, finished) {
            (true, true) => WindowStatus::NoiseOnly,
            (false, true) => WindowStatus::Confirmed,
            _ => WindowStatus::InProgress,
        };
        self.prev_finished = finished;

        // Claimed keys in detection order, which is power order
        let mut claimed: Vec<u32> = Vec::with_capacity(window.tones.len());

        for tone in &window.tones {
            let key = self.key_for(tone.frequency);
            match self.find_track(key, &claimed) {
                Some(existing) => {
                    if let Some(track) = self.tracks.get_mut(&existing) {
                        track.observe(tone);
                        trace!(key = existing, age = track.age, label = %track.displayed, "track matched");
                    }
                    claimed.push(existing);
                }
                None if self.tracks.contains_key(&key) => {
                    // Already claimed by a stronger tone this window
                    trace!(key, frequency = tone.frequency, "detection merged into existing track");
                }
                None => {
                    self.tracks.insert(key, FrequencyTrack::new(key, tone));
                    debug!(key, frequency = tone.frequency, "new provisional track");
                    claimed.push(key);
                }
            }
        }

        let gone: Vec<u32> = self
            .tracks
            .keys()
            .filter(|k| !claimed.contains(k))
            .copied()
            .collect();
        for key in gone {
            if let Some(track) = self.tracks.remove(&key) {
                self.confirm(key, track);
            }
        }

        if finished {
            // Final decode of the transmission: nothing left to agree on
            for track in self.tracks.values_mut() {
                if is_meaningful(&track.last_text) {
                    track.displayed = track.last_text.trim().to_string();
                }
            }
        }

        let active = claimed
            .iter()
            .filter_map(|k| self.tracks.get(k))
            .map(|t| t.view(self.liveness_threshold))
            .collect();

        if finished {
            for (key, track) in std::mem::take(&mut self.tracks) {
                self.confirm(key, track);
            }
        }

        DisplayUpdate {
            status,
            active,
            history: self.history.to_vec(),
        }
    }

    /// Current state without applying a window, strongest track first
    pub fn snapshot(&self) -> DisplayUpdate {
        let mut tracks: Vec<&FrequencyTrack> = self.tracks.values().collect();
        tracks.sort_by(|a, b| b.power.total_cmp(&a.power));
        let status = if self.tracks.is_empty() {
            WindowStatus::NoiseOnly
        } else {
            WindowStatus::InProgress
        };
        DisplayUpdate {
            status,
            active: tracks
                .into_iter()
                .map(|t| t.view(self.liveness_threshold))
                .collect(),
            history: self.history.to_vec(),
        }
    }

    pub fn history(&self) -> &OutputHistory {
        &self.history
    }

    /// Active tracks in frequency order
    pub fn tracks(&self) -> impl Iterator<Item = &FrequencyTrack> {
        self.tracks.values()
    }
}
