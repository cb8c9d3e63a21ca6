//! Shared channel infrastructure between the session and its producer threads.
//!
//! The `EngineBus` carries lane input into the session and exposes the audio
//! sample counter written by a playback thread.

use crate::input::events::{InputEvent, InputQueue, InputSender};
use crossbeam_channel::{Receiver, unbounded};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Aggregates the cross-thread communication channels.
#[derive(Clone)]
pub struct EngineBus {
    /// Input → Session: lane events.
    pub input_tx: InputSender,
    pub input_rx: Receiver<InputEvent>,

    /// Shared audio position in samples.
    /// Written by the playback thread, read by the session.
    pub audio_position: Arc<AtomicU64>,

    /// Current audio sample rate.
    pub audio_sample_rate: Arc<AtomicU64>,

    /// Number of audio channels.
    pub audio_channels: Arc<AtomicU64>,
}

impl EngineBus {
    pub fn new() -> Self {
        let (input_tx, input_rx) = unbounded();

        Self {
            input_tx,
            input_rx,
            audio_position: Arc::new(AtomicU64::new(0)),
            audio_sample_rate: Arc::new(AtomicU64::new(44100)),
            audio_channels: Arc::new(AtomicU64::new(2)),
        }
    }

    /// Queue reading from this bus's input channel.
    pub fn input_queue(&self) -> InputQueue {
        InputQueue::new(self.input_rx.clone())
    }
}

impl Default for EngineBus {
    fn default() -> Self {
        Self::new()
    }
}
