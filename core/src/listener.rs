//! Streaming listener
//!
//! Audio is cut into fixed capture windows. Each one is appended to the
//! [`AnalysisBuffer`] and the accumulated transmission is decoded on a
//! worker pool without waiting for earlier windows; results flow over a
//! channel to a single actor thread that owns the [`Tracker`] and the
//! display. The actor puts results back into capture order before applying
//! them, so the tracker is the only shared state and it has exactly one
//! writer.

use crate::analysis::{AnalysisBuffer, AnalysisJob};
use crate::error::{Error, Result};
use crate::pcm::s32le_to_f32;
use crate::pipeline::decode_window;
use crate::symbols::SymbolTable;
use crate::tracker::Tracker;
use crate::types::{DecoderParams, DisplayUpdate, WindowResult};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

/// Receives a [`DisplayUpdate`] after every applied window
pub trait DisplaySink: Send {
    /// Updates are skipped while this returns false
    fn is_visible(&self) -> bool {
        true
    }

    fn update(&mut self, update: &DisplayUpdate);
}

impl<F> DisplaySink for F
where
    F: FnMut(&DisplayUpdate) + Send,
{
    fn update(&mut self, update: &DisplayUpdate) {
        self(update)
    }
}

/// Forwards updates over a channel, gated by a shared visibility flag
pub struct ChannelSink {
    sender: Sender<DisplayUpdate>,
    visible: Arc<AtomicBool>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<DisplayUpdate>) {
        let (sender, receiver) = unbounded();
        let sink = Self {
            sender,
            visible: Arc::new(AtomicBool::new(true)),
        };
        (sink, receiver)
    }

    /// Handle for toggling visibility from another thread
    pub fn visibility(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.visible)
    }
}

impl DisplaySink for ChannelSink {
    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    fn update(&mut self, update: &DisplayUpdate) {
        if self.sender.send(update.clone()).is_err() {
            trace!("display receiver gone, update dropped");
        }
    }
}

enum Message {
    Window { seq: u64, result: WindowResult },
    /// Apply everything up to `until`, then stop
    Finish { until: u64 },
    Stop,
}

struct Actor<S> {
    tracker: Tracker,
    sink: S,
    pending: BTreeMap<u64, WindowResult>,
    next_seq: u64,
}

impl<S: DisplaySink> Actor<S> {
    fn apply_ready(&mut self) {
        while let Some(result) = self.pending.remove(&self.next_seq) {
            let update = self.tracker.apply(&result);
            if self.sink.is_visible() {
                self.sink.update(&update);
            } else {
                trace!(seq = self.next_seq, "display hidden, update skipped");
            }
            self.next_seq += 1;
        }
    }

    fn run(mut self, inbox: Receiver<Message>) -> DisplayUpdate {
        let mut finish_at = None;

        loop {
            if let Some(until) = finish_at {
                if self.next_seq >= until {
                    break;
                }
            }
            match inbox.recv() {
                Ok(Message::Window { seq, result }) => {
                    self.pending.insert(seq, result);
                    self.apply_ready();
                }
                Ok(Message::Finish { until }) => finish_at = Some(until),
                Ok(Message::Stop) | Err(_) => break,
            }
        }

        if !self.pending.is_empty() {
            warn!(
                dropped = self.pending.len(),
                next = self.next_seq,
                "stopping with out-of-order windows unapplied"
            );
        }
        self.tracker.snapshot()
    }
}

pub struct Listener {
    params: Arc<DecoderParams>,
    table: Arc<SymbolTable>,
    sample_rate: u32,
    window_len: usize,
    buffer: Vec<f32>,
    analysis: AnalysisBuffer,
    next_seq: u64,
    pool: rayon::ThreadPool,
    outbox: Sender<Message>,
    actor: Option<JoinHandle<DisplayUpdate>>,
}

impl Listener {
    pub fn new<S>(
        params: DecoderParams,
        table: &SymbolTable,
        sample_rate: u32,
        sink: S,
    ) -> Result<Self>
    where
        S: DisplaySink + 'static,
    {
        params.validate()?;
        if sample_rate == 0 {
            return Err(Error::InvalidParams("sample rate must be positive".to_string()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.worker_threads)
            .thread_name(|i| format!("cw-decode-{i}"))
            .build()?;

        let (outbox, inbox) = unbounded();
        let actor = Actor {
            tracker: Tracker::new(&params),
            sink,
            pending: BTreeMap::new(),
            next_seq: 0,
        };
        let handle = thread::Builder::new()
            .name("cw-tracker".to_string())
            .spawn(move || actor.run(inbox))?;

        let window_len = params.window_len(sample_rate);
        info!(
            sample_rate,
            window_len,
            workers = params.worker_threads,
            "listener started"
        );

        let analysis = AnalysisBuffer::new(&params, sample_rate);
        Ok(Self {
            params: Arc::new(params),
            table: Arc::new(table.clone()),
            sample_rate,
            window_len,
            buffer: Vec::with_capacity(window_len),
            analysis,
            next_seq: 0,
            pool,
            outbox,
            actor: Some(handle),
        })
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Windows handed to the pool so far
    pub fn windows_submitted(&self) -> u64 {
        self.next_seq
    }

    /// Append captured samples; every completed window is queued for decoding
    pub fn push_samples(&mut self, samples: &[f32]) {
        let mut rest = samples;
        while !rest.is_empty() {
            let take = (self.window_len - self.buffer.len()).min(rest.len());
            self.buffer.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.buffer.len() == self.window_len {
                let window = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.window_len));
                let job = self.analysis.push_window(&window, &self.params);
                self.dispatch(job);
            }
        }
    }

    /// Append raw S32LE capture bytes
    pub fn push_pcm_s32le(&mut self, bytes: &[u8], channels: usize) {
        let samples = s32le_to_f32(bytes, channels);
        self.push_samples(&samples);
    }

    fn dispatch(&mut self, job: AnalysisJob) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let params = Arc::clone(&self.params);
        let table = Arc::clone(&self.table);
        let outbox = self.outbox.clone();
        let sample_rate = self.sample_rate;

        self.pool.spawn(move || {
            let mut result = decode_window(&job.samples, sample_rate, &params, &table);
            result.finished = job.finished;
            if outbox.send(Message::Window { seq, result }).is_err() {
                debug!(seq, "listener stopped, window result discarded");
            }
        });
    }

    fn stop_with(&mut self, message: Message) -> DisplayUpdate {
        let Some(handle) = self.actor.take() else {
            return DisplayUpdate::default();
        };
        if self.outbox.send(message).is_err() {
            warn!("tracker thread already gone");
        }
        match handle.join() {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!("tracker thread panicked");
                DisplayUpdate::default()
            }
        }
    }

    /// Stop now. Windows still being decoded are abandoned.
    pub fn shutdown(mut self) -> DisplayUpdate {
        let snapshot = self.stop_with(Message::Stop);
        info!(windows = self.next_seq, "listener shut down");
        snapshot
    }

    /// Wait for every submitted window to be applied, then stop. A partial
    /// window still in the buffer is not decoded.
    pub fn finish(mut self) -> DisplayUpdate {
        let until = self.next_seq;
        let snapshot = self.stop_with(Message::Finish { until });
        info!(windows = until, "listener finished");
        snapshot
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if self.actor.is_some() {
            self.stop_with(Message::Stop);
        }
    }
}
