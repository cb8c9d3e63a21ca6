//! Outbound interface to whatever draws the notes.
//!
//! The engine pushes spawn, position, resolution and removal events to a
//! `Presenter` and never reads geometry back. The only thing a presenter can
//! report is a failure to create a visual, which the engine logs and tolerates.

use crate::models::engine::LiveNote;
use crate::models::stats::Judgment;
use thiserror::Error;

/// Opaque handle to a presenter-side visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

/// A presenter could not create a visual.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("presenter failure: {0}")]
pub struct PresenterError(pub String);

/// Receiver of note visual events.
pub trait Presenter {
    fn on_spawn(&mut self, note: &LiveNote) -> Result<VisualHandle, PresenterError>;
    fn on_position_update(&mut self, handle: VisualHandle, screen_position: f64);
    fn on_resolve(&mut self, handle: VisualHandle, judgment: Judgment);
    fn on_remove(&mut self, handle: VisualHandle);
    fn on_hold_progress(&mut self, handle: VisualHandle, ratio: f64);
}

/// Presenter that hands out handles and draws nothing.
#[derive(Debug, Default)]
pub struct NullPresenter {
    next_handle: u64,
}

impl NullPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presenter for NullPresenter {
    fn on_spawn(&mut self, _note: &LiveNote) -> Result<VisualHandle, PresenterError> {
        self.next_handle += 1;
        Ok(VisualHandle(self.next_handle))
    }

    fn on_position_update(&mut self, _handle: VisualHandle, _screen_position: f64) {}

    fn on_resolve(&mut self, _handle: VisualHandle, _judgment: Judgment) {}

    fn on_remove(&mut self, _handle: VisualHandle) {}

    fn on_hold_progress(&mut self, _handle: VisualHandle, _ratio: f64) {}
}

/// Presenter that writes note events to the log at debug level.
///
/// Position updates are frequent and go to trace.
#[derive(Debug, Default)]
pub struct LogPresenter {
    next_handle: u64,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presenter for LogPresenter {
    fn on_spawn(&mut self, note: &LiveNote) -> Result<VisualHandle, PresenterError> {
        self.next_handle += 1;
        log::debug!(
            "PRESENTER: spawn {} on {} lane (due {:.1} ms) -> visual {}",
            note.id,
            note.lane,
            note.hit_time_ms,
            self.next_handle
        );
        Ok(VisualHandle(self.next_handle))
    }

    fn on_position_update(&mut self, handle: VisualHandle, screen_position: f64) {
        log::trace!("PRESENTER: visual {} at {:.1}", handle.0, screen_position);
    }

    fn on_resolve(&mut self, handle: VisualHandle, judgment: Judgment) {
        log::debug!("PRESENTER: visual {} judged {}", handle.0, judgment);
    }

    fn on_remove(&mut self, handle: VisualHandle) {
        log::debug!("PRESENTER: visual {} removed", handle.0);
    }

    fn on_hold_progress(&mut self, handle: VisualHandle, ratio: f64) {
        log::trace!("PRESENTER: visual {} hold {:.0}%", handle.0, ratio * 100.0);
    }
}
