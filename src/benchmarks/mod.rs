pub mod args;
pub use args::InvocationArgs;
pub mod classpath;
pub use classpath::{check_version, ClasspathAssembler};
pub mod collector;
pub use collector::{DependencySet, ResourceEntries};
pub mod commands;
pub use commands::{create_command_line, StageCommand, StageCommands, StageLayout, Toolchain};
pub mod descriptor;
pub use descriptor::{BenchmarkDescriptor, DescriptorTable, RuleKey};
pub mod driver;
pub use driver::{success_marker, StageDriver};
pub mod family;
pub use family::{BenchmarkArgPosition, BenchmarkFamily, ClasspathLayout, SUCCESS_MARKER};
pub mod report;
pub use report::{StageReport, StageResult};
pub mod stages;
pub use stages::{Stage, StagePlan};
