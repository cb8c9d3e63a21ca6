//! Input thread bootstrapping.
//!
//! Any thread can produce lane events; the session drains them at the start
//! of each tick. The scripted thread below replays pre-computed events in real
//! time, which is how autoplay drives a real-time session.

pub mod events;

use crate::input::events::{InputEvent, InputSender};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Spawns a thread that sends each event once its timestamp has elapsed
/// since `origin`.
///
/// The thread exits when the script is exhausted or the session side of the
/// channel is dropped.
pub fn start_thread(
    script: Vec<InputEvent>,
    tx: InputSender,
    origin: Instant,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("Input Thread".to_string())
        .spawn(move || {
            log::info!("INPUT: Thread started ({} scripted events)", script.len());

            for event in script {
                let due = Duration::from_secs_f64(event.timestamp_ms.max(0.0) / 1000.0);
                let elapsed = origin.elapsed();
                if due > elapsed {
                    thread::sleep(due - elapsed);
                }
                if let Err(e) = tx.send(event) {
                    log::error!("INPUT: Failed to send event (session gone?): {}", e);
                    break;
                }
            }

            log::info!("INPUT: Thread stopped");
        })
}
