//! Rendering of a snapshot into the Prometheus text exposition format.
//!
//! Every render builds a fresh registry from the snapshot, so vanished
//! containers leave no stale series behind and rendering stays a pure
//! function of its input.

use prometheus::{GaugeVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::snapshot::Snapshot;

pub(super) fn render_snapshot(snapshot: &Snapshot) -> prometheus::Result<String> {
    let registry = Registry::new();

    let generation = int_gauge(
        &registry,
        "file_metrics_snapshot_generation",
        "Number of completed collection cycles; 0 before the first one.",
    )?;
    generation.set(snapshot.generation() as i64);

    let generated_at = int_gauge(
        &registry,
        "file_metrics_snapshot_generated_at_seconds",
        "UNIX timestamp of the last successful collection.",
    )?;
    generated_at.set(snapshot.generated_at() as i64);

    let cycle_error = int_gauge_vec(
        &registry,
        "file_metrics_collection_error",
        "Set when the last collection cycle failed as a whole.",
        &["kind"],
    )?;
    if let Some(kind) = snapshot.cycle_error() {
        cycle_error.with_label_values(&[kind.as_str()]).set(1);
    }

    let info = int_gauge_vec(
        &registry,
        "container_info",
        "One series per container known at collection time.",
        &["id", "name", "state"],
    )?;
    let file_size = int_gauge_vec(
        &registry,
        "container_file_size_bytes",
        "File size of a mount inside the container, in bytes.",
        &["id", "mount"],
    )?;
    let file_inodes = int_gauge_vec(
        &registry,
        "container_file_inodes",
        "Inode count of a mount inside the container, when known.",
        &["id", "mount"],
    )?;
    let file_read_only = int_gauge_vec(
        &registry,
        "container_file_read_only",
        "Whether a mount is read-only (1) or writable (0).",
        &["id", "mount"],
    )?;
    let cpu_percent = gauge_vec(
        &registry,
        "container_cpu_usage_percent",
        "CPU usage over the runtime's sampling window, in percent.",
        &["id"],
    )?;
    let memory_used = int_gauge_vec(
        &registry,
        "container_memory_used_bytes",
        "Memory in use by the container, in bytes.",
        &["id"],
    )?;
    let memory_limit = int_gauge_vec(
        &registry,
        "container_memory_limit_bytes",
        "Configured memory limit, absent when the container is unlimited.",
        &["id"],
    )?;
    let collected_at = int_gauge_vec(
        &registry,
        "container_collected_at_seconds",
        "UNIX timestamp the entry's values were collected; lags under carry-forward.",
        &["id"],
    )?;
    let collect_error = int_gauge_vec(
        &registry,
        "container_collect_error",
        "Set when the container's last fetch failed; values may be carried forward.",
        &["id", "kind"],
    )?;

    for (id, entry) in snapshot.entries() {
        let id = id.as_str();
        let container = entry.container();
        info.with_label_values(&[id, container.name(), container.state().as_str()])
            .set(1);
        collected_at
            .with_label_values(&[id])
            .set(entry.collected_at() as i64);

        for file in entry.files() {
            file_size
                .with_label_values(&[id, &file.mount_path])
                .set(file.size_bytes as i64);
            file_read_only
                .with_label_values(&[id, &file.mount_path])
                .set(i64::from(file.read_only));
            if let Some(inodes) = file.inode_count {
                file_inodes
                    .with_label_values(&[id, &file.mount_path])
                    .set(inodes as i64);
            }
        }

        if let Some(resources) = entry.resources() {
            cpu_percent
                .with_label_values(&[id])
                .set(resources.cpu_percent);
            memory_used
                .with_label_values(&[id])
                .set(resources.memory_used_bytes as i64);
            if let Some(limit) = resources.memory_limit_bytes {
                memory_limit.with_label_values(&[id]).set(limit as i64);
            }
        }

        if let Some(kind) = entry.error() {
            collect_error
                .with_label_values(&[id, kind.as_str()])
                .set(1);
        }
    }

    TextEncoder::new().encode_to_string(&registry.gather())
}

fn int_gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntGauge> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn int_gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<IntGaugeVec> {
    let gauge = IntGaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::container::{ContainerID, ContainerRef, ContainerState};
    use crate::metrics::{FileMetric, ResourceMetric};
    use crate::runtime::ErrorKind;
    use crate::snapshot::ContainerEntry;

    fn entry(id: &str, size: u64) -> (ContainerID, ContainerEntry) {
        let container_id = ContainerID::new(id).unwrap();
        let container = ContainerRef::new(container_id.clone(), id.to_owned(), ContainerState::Running);
        let entry = ContainerEntry::collected(
            container,
            vec![FileMetric {
                mount_path: "/data".to_owned(),
                size_bytes: size,
                inode_count: Some(12),
                read_only: false,
            }],
            ResourceMetric {
                cpu_percent: 12.5,
                memory_used_bytes: 1024,
                memory_limit_bytes: None,
            },
            100,
        );
        (container_id, entry)
    }

    #[test]
    fn test_render_cold_start_snapshot() {
        let body = render_snapshot(&Snapshot::empty()).unwrap();
        assert!(body.contains("file_metrics_snapshot_generation 0"));
        assert!(body.contains("file_metrics_snapshot_generated_at_seconds 0"));
        assert!(!body.contains("container_info{"));
        assert!(!body.contains("file_metrics_collection_error{"));
    }

    #[test]
    fn test_render_collected_entry() {
        let mut entries = BTreeMap::new();
        let (id, e) = entry("abc", 2048);
        entries.insert(id, e);
        let body = render_snapshot(&Snapshot::new(entries, 3, 500)).unwrap();

        assert!(body.contains("file_metrics_snapshot_generation 3"));
        assert!(body.contains(r#"container_info{id="abc",name="abc",state="running"} 1"#));
        assert!(body.contains(r#"container_file_size_bytes{id="abc",mount="/data"} 2048"#));
        assert!(body.contains(r#"container_file_inodes{id="abc",mount="/data"} 12"#));
        assert!(body.contains(r#"container_file_read_only{id="abc",mount="/data"} 0"#));
        assert!(body.contains(r#"container_cpu_usage_percent{id="abc"} 12.5"#));
        assert!(body.contains(r#"container_memory_used_bytes{id="abc"} 1024"#));
        assert!(body.contains(r#"container_collected_at_seconds{id="abc"} 100"#));
        // No limit configured, so no limit series for this container.
        assert!(!body.contains(r#"container_memory_limit_bytes{id="abc"}"#));
        assert!(!body.contains(r#"container_collect_error{id="abc""#));
    }

    #[test]
    fn test_render_errored_entry_keeps_carried_values() {
        let (id, good) = entry("abc", 2048);
        let container =
            ContainerRef::new(id.clone(), "abc".to_owned(), ContainerState::Running);
        let carried = ContainerEntry::carried_forward(&good, container, ErrorKind::Timeout);
        let mut entries = BTreeMap::new();
        entries.insert(id, carried);
        let body = render_snapshot(&Snapshot::new(entries, 4, 600)).unwrap();

        assert!(body.contains(r#"container_collect_error{id="abc",kind="timeout"} 1"#));
        assert!(body.contains(r#"container_file_size_bytes{id="abc",mount="/data"} 2048"#));
    }

    #[test]
    fn test_render_cycle_error() {
        let snapshot = Snapshot::empty().with_cycle_error(ErrorKind::Unreachable);
        let body = render_snapshot(&snapshot).unwrap();
        assert!(body.contains(r#"file_metrics_collection_error{kind="unreachable"} 1"#));
    }
}
