use crate::runtime::payload::{ContainerInspect, ContainerStats, CpuStats};

use super::{FileMetric, ResourceMetric};

/// Converts an inspect payload into the per-mount file metrics.
///
/// The container's root filesystem maps to a `/` entry carrying the total
/// filesystem size (falling back to the writable-layer size when the runtime
/// omits the total). Declared mounts follow with whatever the runtime knows
/// about them; sizes it does not report default to zero. The result is
/// ordered by mount path and free of duplicates.
pub fn files_from_inspect(inspect: &ContainerInspect) -> Vec<FileMetric> {
    let mut files = Vec::with_capacity(inspect.mounts.len() + 1);
    files.push(FileMetric {
        mount_path: "/".to_owned(),
        size_bytes: clamp_size(inspect.size_root_fs.or(inspect.size_rw)),
        inode_count: None,
        read_only: false,
    });

    for mount in &inspect.mounts {
        if mount.destination.is_empty() {
            continue;
        }
        files.push(FileMetric {
            mount_path: mount.destination.clone(),
            size_bytes: 0,
            inode_count: None,
            read_only: !mount.rw,
        });
    }

    files.sort_by(|a, b| a.mount_path.cmp(&b.mount_path));
    files.dedup_by(|a, b| a.mount_path == b.mount_path);

    files
}

/// Converts a one-shot stats payload into a [`ResourceMetric`].
///
/// A reported memory limit of zero means "no limit" and maps to `None`.
pub fn resources_from_stats(stats: &ContainerStats) -> ResourceMetric {
    ResourceMetric {
        cpu_percent: cpu_percent(&stats.cpu_stats, &stats.precpu_stats),
        memory_used_bytes: stats.memory_stats.usage.unwrap_or(0),
        memory_limit_bytes: stats.memory_stats.limit.filter(|limit| *limit > 0),
    }
}

/// CPU usage over the runtime's sampling window.
///
/// Standard engine formula: container delta over system delta, scaled by the
/// number of online cores. Missing counters yield 0 rather than an error.
fn cpu_percent(cpu: &CpuStats, precpu: &CpuStats) -> f64 {
    let cpu_delta = cpu
        .cpu_usage
        .total_usage
        .saturating_sub(precpu.cpu_usage.total_usage);
    let system_delta = cpu
        .system_cpu_usage
        .unwrap_or(0)
        .saturating_sub(precpu.system_cpu_usage.unwrap_or(0));

    if cpu_delta == 0 || system_delta == 0 {
        return 0.0;
    }

    let online_cpus = f64::from(cpu.online_cpus.unwrap_or(1));
    (cpu_delta as f64 / system_delta as f64) * online_cpus * 100.0
}

fn clamp_size(size: Option<i64>) -> u64 {
    size.and_then(|s| u64::try_from(s).ok()).unwrap_or(0)
}
