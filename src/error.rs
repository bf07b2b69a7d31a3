use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions raised while configuring or driving a native-image benchmark.
///
/// Every variant aborts the whole invocation. They are raised through
/// `anyhow::Error` so callers can attach context and tests can
/// `downcast_ref::<BenchError>()` to check which condition fired.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Unknown suite '{0}'")]
    UnknownSuite(String),

    #[error("Unknown benchmark '{benchmark}' for suite {suite}")]
    UnknownBenchmark { suite: String, benchmark: String },

    /// Zero or more than one benchmark requested for a single build/run.
    #[error("Must specify exactly one benchmark (got {count}); the suite can only run a single benchmark per VM instance")]
    BenchmarkCount { count: usize },

    #[error("Native Image benchmark stages should only be specified once")]
    StagesSpecifiedTwice,

    #[error("Native Image benchmark stage plan must name at least one stage")]
    EmptyStagePlan,

    #[error("Unknown Native Image benchmark stage '{0}'")]
    UnknownStage(String),

    #[error("Required library '{0}' is not configured or does not exist")]
    MissingLibrary(String),

    #[error("Path to {what} not present: {path}")]
    MissingPath { what: String, path: PathBuf },

    #[error("Version {version} is not supported, available versions: {available}")]
    UnsupportedVersion { version: String, available: String },

    #[error("Failed to extract {archive}: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("Stage '{stage}' failed with exit code {code}")]
    StageFailed { stage: String, code: i32 },
}
