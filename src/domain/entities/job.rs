//! Job entity module
//!
//! A Job is the schedulable unit of the cluster: an opaque service manifest
//! plus the resource demands extracted from it. Definitions are stored as
//! JSON documents under the namespace and are treated as immutable once
//! written.

use serde::{Deserialize, Serialize};

use crate::domain::errors::ClusterResult;

/// Resource defaults applied when a unit manifest omits a limit or supplies
/// an unparseable value.
pub const DEFAULT_CPU_SHARES: i64 = 1000;
pub const DEFAULT_IO_WEIGHT: i64 = 1000;
pub const DEFAULT_MEMORY_MB: i64 = 100;

/// A schedulable unit of work with its resource demands
///
/// `unit_text` is passed verbatim to the local supervisor; the core never
/// inspects it after the resource limits are extracted at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    /// Client-chosen identifier, unique within a namespace
    pub id: String,
    /// The service manifest, stored exactly as supplied
    #[serde(default)]
    pub unit_text: String,
    /// CPU shares demanded when scheduling
    #[serde(default)]
    pub cpu_shares: i64,
    /// Block IO weight demanded when scheduling
    #[serde(default)]
    pub io_weight: i64,
    /// Memory demanded when scheduling, in megabytes
    #[serde(default)]
    pub memory_mb: i64,
    /// Whether the local supervisor currently reports the unit running.
    /// Populated during reconciliation; meaningless on stored documents.
    #[serde(default)]
    pub is_running: bool,
}

impl Job {
    /// A job shell carrying only identity. Used where a job is referenced by
    /// id alone, e.g. supervisor listings; scheduling demands come from the
    /// unit-file parser.
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            unit_text: String::new(),
            cpu_shares: 0,
            io_weight: 0,
            memory_mb: 0,
            is_running: false,
        }
    }

    /// Serializes the job to its canonical JSON document.
    pub fn serialize(&self) -> ClusterResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a job from a stored JSON document.
    pub fn deserialize(raw: &str) -> ClusterResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
