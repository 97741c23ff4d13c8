//! Resource extraction from service unit manifests
//!
//! Builds a [`Job`] out of a unit file. Only three keys of the `[Service]`
//! section matter for scheduling: `MemoryLimit` (a single trailing `M`,
//! megabytes), `CPUShares` and `BlockIOWeight`. Unparseable values are
//! silently coerced to zero, and any zero demand falls back to its default,
//! so a sloppy manifest still schedules. The text itself is stored verbatim
//! and handed to the supervisor untouched.

use crate::domain::entities::job::{
    Job, DEFAULT_CPU_SHARES, DEFAULT_IO_WEIGHT, DEFAULT_MEMORY_MB,
};
use crate::domain::errors::{ClusterError, ClusterResult};

pub struct UnitFileParser;

impl UnitFileParser {
    pub fn parse(id: &str, unit_text: &str) -> ClusterResult<Job> {
        let mut job = Job::named(id);
        job.unit_text = unit_text.to_string();

        let mut section = String::new();
        for (number, line) in unit_text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.to_string();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ClusterError::Parse(format!(
                    "unit line {} is neither a section header nor a key=value pair",
                    number + 1
                )));
            };
            if section != "Service" {
                continue;
            }
            match key.trim() {
                "MemoryLimit" => job.memory_mb = parse_megabytes(value.trim()),
                "CPUShares" => job.cpu_shares = parse_shares(value.trim()),
                "BlockIOWeight" => job.io_weight = parse_shares(value.trim()),
                _ => {}
            }
        }

        if job.memory_mb == 0 {
            job.memory_mb = DEFAULT_MEMORY_MB;
        }
        if job.cpu_shares == 0 {
            job.cpu_shares = DEFAULT_CPU_SHARES;
        }
        if job.io_weight == 0 {
            job.io_weight = DEFAULT_IO_WEIGHT;
        }

        Ok(job)
    }
}

fn parse_shares(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}

/// Only the `M` suffix is supported; anything else coerces to zero.
fn parse_megabytes(value: &str) -> i64 {
    value
        .strip_suffix('M')
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}
