//! Chart loading, scheduling, generation and difficulty transforms.

pub mod difficulty;
pub mod generator;
pub mod source;
pub mod timing;

pub use generator::GeneratorSpec;
pub use source::{ChartData, ChartSource, JsonChartSource, StaticChartSource};
pub use timing::{ChartTimingModel, NoteOnset, Schedule};
