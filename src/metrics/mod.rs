//! Internal metric record shapes and the normalization from raw runtime
//! payloads into them.
//!
//! Everything downstream of this module is unit-agnostic: all conversion to
//! bytes and the defaults for data the runtime did not report happen here,
//! and nowhere else. The conversions are pure functions of their input,
//! which keeps them trivially property-testable.

mod normalize;

pub use normalize::{files_from_inspect, resources_from_stats};

/// File footprint of one mount inside a container.
///
/// Owned exclusively by the snapshot entry it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetric {
    /// Absolute mount path inside the container.
    pub mount_path: String,
    /// Size in bytes, `0` when the runtime does not report one.
    pub size_bytes: u64,
    /// Inode count, absent when the runtime does not report one.
    pub inode_count: Option<u64>,
    pub read_only: bool,
}

/// Point-in-time resource usage of a container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceMetric {
    /// CPU usage over the runtime's sampling window, in percent of one core
    /// times the number of online cores.
    pub cpu_percent: f64,
    pub memory_used_bytes: u64,
    /// Absent when the container runs without a memory limit.
    pub memory_limit_bytes: Option<u64>,
}
