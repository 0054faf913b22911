//! Wire shapes of the Docker Engine API responses this service consumes.
//!
//! Only the fields the normalizer needs are declared; everything else in the
//! runtime's responses is ignored. All fields are `#[serde(default)]` so a
//! runtime that omits optional data yields zeroed values instead of a decode
//! failure.

use serde::Deserialize;

/// One element of `GET /containers/json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub state: String,
}

impl ContainerSummary {
    /// Primary name without the runtime's leading slash, falling back to the
    /// id when the runtime reports no name.
    pub fn display_name(&self) -> &str {
        self.names
            .first()
            .map(|n| n.trim_start_matches('/'))
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }
}

/// Response of `GET /containers/{id}/json?size=true`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    #[serde(default)]
    pub id: String,
    /// Total size of all files in the container's filesystem, in bytes.
    #[serde(default)]
    pub size_root_fs: Option<i64>,
    /// Size of files created or changed in the writable layer, in bytes.
    #[serde(default)]
    pub size_rw: Option<i64>,
    #[serde(default)]
    pub mounts: Vec<MountPoint>,
}

/// One mount declared on a container.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountPoint {
    #[serde(default)]
    pub destination: String,
    #[serde(default, rename = "RW")]
    pub rw: bool,
}

/// Response of `GET /containers/{id}/stats?stream=false`.
///
/// The one-shot form carries the previous sample in `precpu_stats`, which is
/// what makes a CPU percentage computable from a single call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerStats {
    #[serde(default)]
    pub cpu_stats: CpuStats,
    #[serde(default)]
    pub precpu_stats: CpuStats,
    #[serde(default)]
    pub memory_stats: MemoryStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    #[serde(default)]
    pub system_cpu_usage: Option<u64>,
    #[serde(default)]
    pub online_cpus: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuUsage {
    #[serde(default)]
    pub total_usage: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub usage: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_summary_display_name() {
        let summary = ContainerSummary {
            id: "deadbeef".into(),
            names: vec!["/web-1".into()],
            state: "running".into(),
        };
        assert_eq!(summary.display_name(), "web-1");
    }

    #[test]
    fn test_container_summary_display_name_falls_back_to_id() {
        let summary = ContainerSummary {
            id: "deadbeef".into(),
            ..Default::default()
        };
        assert_eq!(summary.display_name(), "deadbeef");
    }

    #[test]
    fn test_decode_container_summary() {
        let raw = r#"[{"Id":"abc123","Names":["/db"],"State":"running","Image":"postgres:16"}]"#;
        let summaries: Vec<ContainerSummary> = serde_json::from_str(raw).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "abc123");
        assert_eq!(summaries[0].state, "running");
    }

    #[test]
    fn test_decode_inspect_with_sizes_and_mounts() {
        let raw = r#"{
            "Id": "abc123",
            "SizeRootFs": 104857600,
            "SizeRw": 2048,
            "Mounts": [
                {"Destination": "/data", "RW": true, "Source": "/var/lib/docker/volumes/x"},
                {"Destination": "/config", "RW": false}
            ]
        }"#;
        let inspect: ContainerInspect = serde_json::from_str(raw).unwrap();
        assert_eq!(inspect.size_root_fs, Some(104_857_600));
        assert_eq!(inspect.size_rw, Some(2048));
        assert_eq!(inspect.mounts.len(), 2);
        assert!(inspect.mounts[0].rw);
        assert!(!inspect.mounts[1].rw);
    }

    #[test]
    fn test_decode_stats_with_missing_fields() {
        let raw = r#"{"cpu_stats":{"cpu_usage":{"total_usage":1000}}}"#;
        let stats: ContainerStats = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.cpu_stats.cpu_usage.total_usage, 1000);
        assert_eq!(stats.cpu_stats.system_cpu_usage, None);
        assert_eq!(stats.memory_stats.usage, None);
    }
}
