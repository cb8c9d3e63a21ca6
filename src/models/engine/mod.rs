pub mod constants;
pub mod hit_window;
pub mod note;
pub mod playfield;

pub use constants::*;
pub use hit_window::{HitWindow, HoldWindow, JudgmentPoints, ScoreTable};
pub use note::{ChartNote, LiveNote, NoteId, NoteState, NoteType};
pub use playfield::PlayfieldConfig;
