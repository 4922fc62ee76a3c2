use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{Disks, System};

/// Snapshot of the machine we are running on.
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub platform: String,
    pub platform_version: String,
    pub architecture: String,
    pub processor: String,
    pub cpu_count: usize,
    pub memory_total: u64,
    pub disk_usage: u64,
    pub timestamp: DateTime<Utc>,
}

impl HostInfo {
    pub fn collect() -> Self {
        let sys = System::new_all();
        let disks = Disks::new_with_refreshed_list();

        Self {
            platform: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            platform_version: System::os_version().unwrap_or_default(),
            architecture: std::env::consts::ARCH.to_string(),
            processor: sys
                .cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .unwrap_or_default(),
            cpu_count: sys.cpus().len(),
            memory_total: sys.total_memory(),
            disk_usage: disks.list().iter().map(|d| d.total_space()).sum(),
            timestamp: Utc::now(),
        }
    }
}

/// Human-readable OS name for prompts, e.g. "Linux (Ubuntu 22.04)".
pub fn os_label() -> String {
    match System::long_os_version() {
        Some(long) if !long.trim().is_empty() => {
            format!("{} ({})", std::env::consts::OS, long.trim())
        }
        _ => std::env::consts::OS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_basic_facts() {
        let info = HostInfo::collect();
        assert!(!info.platform.is_empty());
        assert_eq!(info.architecture, std::env::consts::ARCH);
        assert!(info.cpu_count > 0);
    }

    #[test]
    fn os_label_starts_with_os() {
        assert!(os_label().starts_with(std::env::consts::OS));
    }
}
