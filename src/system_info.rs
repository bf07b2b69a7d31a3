use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use sysinfo::System;

const UNKNOWN: &str = "<unknown>";

/// Host description stored next to every stage report, so image build
/// times can be compared across machines
#[derive(Debug, Clone, Serialize)]
pub struct HostSnapshot {
    pub system_name: String,
    pub kernel_version: String,
    pub os_version: String,
    pub cpu_arch: String,
    pub cpu_brand: Option<String>,
    pub cpu_count: usize,
    /// MHz of the first core
    pub cpu_frequency: u64,
    pub total_memory: u64,
    pub used_memory: u64,
    pub total_swap: u64,
    pub uptime_seconds: u64,
}

impl HostSnapshot {
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let cpus = sys.cpus();

        Self {
            system_name: System::name().unwrap_or_else(|| UNKNOWN.to_owned()),
            kernel_version: System::kernel_version().unwrap_or_else(|| UNKNOWN.to_owned()),
            os_version: System::long_os_version().unwrap_or_else(|| UNKNOWN.to_owned()),
            cpu_arch: System::cpu_arch(),
            cpu_brand: cpus.first().map(|cpu| cpu.brand().to_string()),
            cpu_count: cpus.len(),
            cpu_frequency: cpus.first().map(|cpu| cpu.frequency()).unwrap_or(0),
            total_memory: sys.total_memory(),
            used_memory: sys.used_memory(),
            total_swap: sys.total_swap(),
            uptime_seconds: System::uptime(),
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        info!("Writing system info to {path:?}");
        std::fs::write(path, self.to_string())
            .with_context(|| format!("Failed to write system info to {path:?}"))
    }
}

#[rustfmt::skip]
impl fmt::Display for HostSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<25}{}", "System name:", self.system_name)?;
        writeln!(f, "{:<25}{}", "System kernel version:", self.kernel_version)?;
        writeln!(f, "{:<25}{}", "System OS version:", self.os_version)?;
        writeln!(f, "{:<25}{}", "CPU Arch:", self.cpu_arch)?;
        match &self.cpu_brand {
            Some(brand) => writeln!(f, "{:<25}{} ({}) @ {:.2} GHz",
                "CPU:",
                brand,
                self.cpu_count,
                self.cpu_frequency as f64 / 1000.0)?,
            None => writeln!(f, "CPU: Unknown")?,
        }
        writeln!(f, "{:<25}{} bytes", "Total memory:", self.total_memory)?;
        writeln!(f, "{:<25}{} bytes", "Used memory:", self.used_memory)?;
        writeln!(f, "{:<25}{} bytes", "Total swap:", self.total_swap)?;
        writeln!(f, "{:<25}{}", "Uptime (seconds):", self.uptime_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_info.txt");
        let snapshot = HostSnapshot::collect();
        snapshot.write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("System name:"));
        assert!(text.contains(&format!("{:<25}{}", "CPU Arch:", snapshot.cpu_arch)));
        assert!(text.contains("Total memory:"));
    }
}
