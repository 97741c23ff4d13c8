//! Error taxonomy shared across the cluster core
//!
//! Every fallible operation in the core returns [`ClusterResult`]. The
//! variants separate failures a caller reacts to (lost CAS races, missing
//! records, duplicate assignments) from failures it can only report
//! (backend and supervisor trouble).

use thiserror::Error;

pub type ClusterResult<T> = Result<T, ClusterError>;

#[derive(Debug, Error)]
pub enum ClusterError {
    /// A key or record was expected to exist and does not.
    #[error("not found: {0}")]
    NotFound(String),

    /// A compare-and-swap write was rejected: the key was modified since it
    /// was read, or its existence predicate did not hold.
    #[error("conflicting write on {0}")]
    Conflict(String),

    /// The job is already assigned within the namespace. Carries the node
    /// holding the assignment so callers can still report where it runs.
    #[error("job {job} is already assigned to node {node}")]
    DuplicateAssignment { job: String, node: String },

    /// Unschedule found the job on no node.
    #[error("job {0} is not scheduled on any node")]
    UnscheduleFailed(String),

    /// Malformed JSON document or unit manifest.
    #[error("parse error: {0}")]
    Parse(String),

    /// Any other failure reported by the backing KV store.
    #[error("cluster backend error: {0}")]
    Backend(anyhow::Error),

    /// Any failure reported by the local process supervisor.
    #[error("local supervisor error: {0}")]
    Local(String),
}

impl ClusterError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound(_))
    }
}

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        ClusterError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_detectable() {
        assert!(ClusterError::Conflict("/orch/clusters/a".into()).is_conflict());
        assert!(!ClusterError::NotFound("x".into()).is_conflict());
    }

    #[test]
    fn json_errors_become_parse_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{")
            .map_err(ClusterError::from)
            .unwrap_err();
        assert!(matches!(err, ClusterError::Parse(_)));
    }
}
