//! Timing and judgment engine for a two-lane rhythm game.
//!
//! Charts (declarative beat grids or procedurally generated) are turned into
//! a `Schedule`; a `GameSession` plays it against a clock, judges lane input
//! and keeps score. Rendering and audio output stay outside, behind the
//! `Presenter` and `AudioPosition` traits.

pub mod chart;
pub mod error;
pub mod input;
pub mod logic;
pub mod models;
pub mod shared;
pub mod state;
pub mod system;

pub use chart::{ChartData, ChartSource, ChartTimingModel, JsonChartSource, Schedule};
pub use error::{ChartValidationError, EngineError, SessionState};
pub use input::events::{InputAction, InputEvent};
pub use logic::clock::{ManualTime, MonotonicTime, TimeSource};
pub use models::chart::{Chart, Lane, LaneSet, Measure};
pub use models::settings::EngineConfig;
pub use models::stats::{Grade, Judgment, ScoreState};
pub use shared::presenter::{LogPresenter, NullPresenter, Presenter};
pub use shared::snapshot::{GameplaySnapshot, SessionResult};
pub use state::GameSession;
