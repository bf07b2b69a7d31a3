use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::benchmarks::args::{InvocationArgs, STAGES};
use crate::error::BenchError;

/// One phase of a benchmark's build/run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// JVM run with the tracing agent to collect reflection/resource config
    Agent,
    /// Build of a profiling-instrumented image
    InstrumentImage,
    /// Run of the instrumented image to collect profiles
    InstrumentRun,
    /// Final image build
    Image,
    /// Final image run
    Run,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Agent,
        Stage::InstrumentImage,
        Stage::InstrumentRun,
        Stage::Image,
        Stage::Run,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Agent => "agent",
            Stage::InstrumentImage => "instrument-image",
            Stage::InstrumentRun => "instrument-run",
            Stage::Image => "image",
            Stage::Run => "run",
        }
    }

    /// Stages whose name carries the image-build marker go to the image builder
    pub fn is_image_build(&self) -> bool {
        self.name().contains("image")
    }

    /// Stages whose process takes the benchmark classpath
    pub fn needs_classpath(&self) -> bool {
        matches!(self, Stage::Agent) || self.is_image_build()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| BenchError::UnknownStage(s.to_string()))
    }
}

/// Ordered, non-empty list of stages for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl Default for StagePlan {
    fn default() -> Self {
        Self {
            stages: vec![
                Stage::InstrumentImage,
                Stage::InstrumentRun,
                Stage::Image,
                Stage::Run,
            ],
        }
    }
}

impl StagePlan {
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(BenchError::EmptyStagePlan.into());
        }
        Ok(Self { stages })
    }

    /// Parse a comma-separated stage list such as `image,run`
    pub fn parse(list: &str) -> Result<Self> {
        let stages = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Stage::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(stages)
    }

    /// The plan requested by `-Dnative-image.benchmark.stages=`, or the
    /// default plan. Giving the override more than once is fatal.
    pub fn from_args(args: &InvocationArgs) -> Result<Self> {
        let values = args.native_image_values(STAGES);
        match values.as_slice() {
            [] => Ok(Self::default()),
            [list] => Self::parse(list),
            _ => Err(BenchError::StagesSpecifiedTwice.into()),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn last(&self) -> Stage {
        // Non-empty by construction
        self.stages[self.stages.len() - 1]
    }

    /// Comma-separated stage names
    pub fn names(&self) -> String {
        self.stages
            .iter()
            .map(Stage::name)
            .collect::<Vec<_>>()
            .join(",")
    }
}
