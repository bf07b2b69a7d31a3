use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::benchmarks::stages::Stage;

/// Outcome of a single stage process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    /// Command line as launched
    pub command: String,
    /// Exit code from the process
    pub exit_code: i32,
    /// Duration in milliseconds
    pub duration_ms: f64,
    /// Non-zero exit that was allowed to continue
    pub tolerated_failure: bool,
}

impl StageResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Everything one invocation of the stage plan produced
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub suite: String,
    pub benchmark: String,
    /// Stages in the order they were requested
    pub requested: Vec<Stage>,
    pub results: Vec<StageResult>,
    /// Every stage exited zero or was tolerated, and a success pattern
    /// matched the combined output
    pub success: bool,
    /// Success patterns that matched
    pub matched_patterns: Vec<String>,
    /// Combined stdout/stderr of all stages plus the driver's own markers
    #[serde(skip)]
    pub output: String,
}

impl StageReport {
    pub fn failed_stages(&self) -> impl Iterator<Item = &StageResult> {
        self.results.iter().filter(|result| !result.succeeded())
    }

    /// Write the report as pretty JSON
    pub fn export_json(&self, path: &Path) -> Result<()> {
        let json_data =
            serde_json::to_string_pretty(self).context("Failed to serialize stage report")?;

        std::fs::write(path, json_data)
            .with_context(|| format!("Failed to write stage report to {path:?}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_export_json() {
        let report = StageReport {
            suite: "dacapo-native-image".to_string(),
            benchmark: "h2".to_string(),
            requested: vec![Stage::Image, Stage::Run],
            results: vec![
                StageResult {
                    stage: Stage::Image,
                    command: "native-image -jar dacapo.jar".to_string(),
                    exit_code: 0,
                    duration_ms: 1500.0,
                    tolerated_failure: false,
                },
                StageResult {
                    stage: Stage::Run,
                    command: "./h2".to_string(),
                    exit_code: 1,
                    duration_ms: 20.5,
                    tolerated_failure: true,
                },
            ],
            success: true,
            matched_patterns: vec!["PASSED".to_string()],
            output: "not exported".to_string(),
        };
        assert_eq!(report.failed_stages().count(), 1);

        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.export_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["benchmark"], "h2");
        assert_eq!(json["requested"][1], "run");
        assert_eq!(json["results"][0]["stage"], "image");
        assert_eq!(json["results"][1]["tolerated_failure"], true);
        assert!(json.get("output").is_none());
    }
}
