//! Audio playback position, shared with the playback thread.
//!
//! The session never decodes or mixes audio. It only reads the sample counter
//! the playback side publishes, converts it to milliseconds and hands it to
//! the clock for drift correction.

use crate::system::bus::EngineBus;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Something that knows where audio playback currently is.
pub trait AudioPosition {
    /// Playback position in milliseconds, `None` before playback starts.
    fn position_ms(&self) -> Option<f64>;
}

/// Reader over the sample counter on an [`EngineBus`].
#[derive(Clone)]
pub struct SharedAudioPosition {
    position: Arc<AtomicU64>,
    sample_rate: Arc<AtomicU64>,
    channels: Arc<AtomicU64>,
}

impl SharedAudioPosition {
    pub fn new(bus: &EngineBus) -> Self {
        Self {
            position: bus.audio_position.clone(),
            sample_rate: bus.audio_sample_rate.clone(),
            channels: bus.audio_channels.clone(),
        }
    }

    /// Returns the current playback position in seconds.
    ///
    /// The position is calculated from the sample count shared atomically
    /// with the playback thread.
    pub fn get_position_seconds(&self) -> f64 {
        let samples = self.position.load(Ordering::Relaxed) as f64;
        let sample_rate = self.sample_rate.load(Ordering::Relaxed).max(1) as f64;
        let channels = self.channels.load(Ordering::Relaxed).max(1) as f64;

        samples / (sample_rate * channels)
    }
}

impl AudioPosition for SharedAudioPosition {
    fn position_ms(&self) -> Option<f64> {
        if self.position.load(Ordering::Relaxed) == 0 {
            return None;
        }
        Some(self.get_position_seconds() * 1000.0)
    }
}

/// Writer side of the sample counter.
#[derive(Clone)]
pub struct AudioPositionWriter {
    position: Arc<AtomicU64>,
    sample_rate: Arc<AtomicU64>,
    channels: Arc<AtomicU64>,
}

impl AudioPositionWriter {
    pub fn new(bus: &EngineBus) -> Self {
        Self {
            position: bus.audio_position.clone(),
            sample_rate: bus.audio_sample_rate.clone(),
            channels: bus.audio_channels.clone(),
        }
    }

    pub fn set_format(&self, sample_rate: u64, channels: u64) {
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.channels.store(channels, Ordering::Relaxed);
    }

    /// Publishes the position as an interleaved sample count.
    pub fn store_ms(&self, ms: f64) {
        let rate = self.sample_rate.load(Ordering::Relaxed) as f64;
        let channels = self.channels.load(Ordering::Relaxed) as f64;
        let samples = (ms.max(0.0) / 1000.0 * rate * channels) as u64;
        self.position.store(samples, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.position.store(0, Ordering::Relaxed);
    }
}

/// Spawns a silent playback thread that advances the sample counter in real
/// time until `stop` is raised.
///
/// Stands in for an audio device when running without sound; the counter
/// advances in 10 ms periods the way a device callback would.
pub fn start_silent_playback(
    writer: AudioPositionWriter,
    origin: Instant,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("Audio Thread".to_string())
        .spawn(move || {
            log::info!("AUDIO: Silent playback started");
            while !stop.load(Ordering::Relaxed) {
                writer.store_ms(origin.elapsed().as_secs_f64() * 1000.0);
                thread::sleep(Duration::from_millis(10));
            }
            log::info!("AUDIO: Silent playback stopped");
        })
}
