//! Key layout for cluster state in the backing store
//!
//! Everything the orchestrator persists lives under `/orch/clusters/<ns>`:
//! the namespace marker itself, job documents under `jobs/`, and node
//! documents under `nodes/`. Node documents double as the watch target for
//! that node's reconciliation loop.

const ROOT: &str = "/orch/clusters";

pub fn namespace_path(namespace: &str) -> String {
    format!("{ROOT}/{namespace}")
}

pub fn jobs_path(namespace: &str) -> String {
    format!("{ROOT}/{namespace}/jobs")
}

pub fn job_path(namespace: &str, job_id: &str) -> String {
    format!("{ROOT}/{namespace}/jobs/{job_id}")
}

pub fn nodes_path(namespace: &str) -> String {
    format!("{ROOT}/{namespace}/nodes")
}

pub fn node_path(namespace: &str, node_name: &str) -> String {
    format!("{ROOT}/{namespace}/nodes/{node_name}")
}
