//! Lane input events, the cross-thread input queue and per-lane de-bouncing.

use crate::logic::event_log::IgnoreReason;
use crate::models::chart::{LANE_COUNT, Lane};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputAction {
    Press,
    Release,
}

/// A press or release on one lane, stamped with song time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub lane: Lane,
    pub action: InputAction,
    pub timestamp_ms: f64,
}

impl InputEvent {
    pub fn press(lane: Lane, timestamp_ms: f64) -> Self {
        Self {
            lane,
            action: InputAction::Press,
            timestamp_ms,
        }
    }

    pub fn release(lane: Lane, timestamp_ms: f64) -> Self {
        Self {
            lane,
            action: InputAction::Release,
            timestamp_ms,
        }
    }
}

/// Receiving end of the input channel, drained once per tick.
pub struct InputQueue {
    rx: Receiver<InputEvent>,
}

impl InputQueue {
    pub fn new(rx: Receiver<InputEvent>) -> Self {
        Self { rx }
    }

    /// Takes every pending event, stably ordered by timestamp.
    ///
    /// Events with equal timestamps keep their arrival order.
    pub fn drain_ordered(&self) -> Vec<InputEvent> {
        let mut events: Vec<InputEvent> = self.rx.try_iter().collect();
        events.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        events
    }
}

/// Convenience alias for the producer side handed to input threads.
pub type InputSender = Sender<InputEvent>;

/// Tracks which lanes are down and rejects repeated presses and releases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneLatch {
    pressed: [bool; LANE_COUNT],
}

impl LaneLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event to the latch, or reports why it is a duplicate.
    pub fn accept(&mut self, lane: Lane, action: InputAction) -> Result<(), IgnoreReason> {
        let down = &mut self.pressed[lane.index()];
        match (action, *down) {
            (InputAction::Press, true) => Err(IgnoreReason::AlreadyPressed),
            (InputAction::Release, false) => Err(IgnoreReason::NotPressed),
            (InputAction::Press, false) => {
                *down = true;
                Ok(())
            }
            (InputAction::Release, true) => {
                *down = false;
                Ok(())
            }
        }
    }

    pub fn is_pressed(&self, lane: Lane) -> bool {
        self.pressed[lane.index()]
    }

    pub fn pressed(&self) -> [bool; LANE_COUNT] {
        self.pressed
    }

    pub fn reset(&mut self) {
        self.pressed = [false; LANE_COUNT];
    }
}
