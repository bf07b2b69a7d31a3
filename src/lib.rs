pub mod archive;
pub mod benchmarks;
pub mod command;
pub mod config;
pub mod error;
pub mod library;
pub mod path_utils;
pub mod suites;
pub mod system_info;
#[cfg(test)]
mod test_support;
