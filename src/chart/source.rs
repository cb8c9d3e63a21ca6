//! Where chart data comes from.

use crate::chart::generator::GeneratorSpec;
use crate::error::EngineError;
use crate::models::chart::Chart;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A grid chart or a request for a generated one.
///
/// In JSON a grid chart is recognized by its `measures`, a generation request
/// by its `durationMs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartData {
    Grid(Chart),
    Generated(GeneratorSpec),
}

/// Supplies chart data to a session.
pub trait ChartSource {
    fn load(&self) -> Result<ChartData, EngineError>;
}

/// Reads chart data from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonChartSource {
    path: PathBuf,
}

impl JsonChartSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChartSource for JsonChartSource {
    fn load(&self) -> Result<ChartData, EngineError> {
        let content = fs::read_to_string(&self.path)?;
        let data: ChartData = serde_json::from_str(&content)?;
        if let ChartData::Grid(chart) = &data {
            chart.validate()?;
        }
        log::info!("CHART: Loaded {:?}", self.path);
        Ok(data)
    }
}

/// Chart data held in memory.
#[derive(Debug, Clone)]
pub struct StaticChartSource(pub ChartData);

impl ChartSource for StaticChartSource {
    fn load(&self) -> Result<ChartData, EngineError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChartValidationError;
    use std::io::Write;

    fn write_json(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_grid_chart() {
        let file = write_json(
            r#"{ "bpm": 120, "subdivision": 4, "measures": [{ "top": "1010", "bottom": "0101" }] }"#,
        );
        let data = JsonChartSource::new(file.path()).load().unwrap();
        assert!(matches!(data, ChartData::Grid(ref c) if c.measures.len() == 1));
    }

    #[test]
    fn test_loads_generation_request() {
        let file = write_json(r#"{ "bpm": 128, "durationMs": 30000 }"#);
        let data = JsonChartSource::new(file.path()).load().unwrap();
        assert_eq!(
            data,
            ChartData::Generated(GeneratorSpec {
                bpm: 128.0,
                duration_ms: 30000.0,
                offset_ms: 0.0,
            })
        );
    }

    #[test]
    fn test_invalid_grid_is_rejected_at_load() {
        let file = write_json(
            r#"{ "bpm": 120, "subdivision": 4, "measures": [{ "top": "10", "bottom": "0101" }] }"#,
        );
        let err = JsonChartSource::new(file.path()).load().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Chart(ChartValidationError::PatternLength { found: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let file = write_json("{ not json");
        let err = JsonChartSource::new(file.path()).load().unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
