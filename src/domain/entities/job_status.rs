//! Outcome of a scheduling attempt.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobStatus {
    pub job_id: String,
    /// Name of the node the job landed on; empty when unplaced.
    pub node_name: String,
    pub is_scheduled: bool,
}

impl JobStatus {
    pub fn placed(job_id: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            node_name: node_name.into(),
            is_scheduled: true,
        }
    }

    pub fn unplaced(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            node_name: String::new(),
            is_scheduled: false,
        }
    }
}
