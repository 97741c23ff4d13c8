//! Contract over the node-local process supervisor
//!
//! The reconciliation agent drives the host's service manager exclusively
//! through this interface; `unit_text` stays an opaque payload to the core.
//! Implementations must be safe for concurrent use: the reconciler and the
//! HTTP log endpoint share one handle.

use async_trait::async_trait;

use crate::domain::entities::Job;
use crate::domain::errors::ClusterResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Establishes the connection to the supervisor.
    async fn connect(&self) -> ClusterResult<()>;

    async fn disconnect(&self);

    /// The jobs this node's supervisor currently manages, identified through
    /// the node-scoped unit naming convention. `is_running` reflects the
    /// unit's current sub-state.
    async fn list_managed_jobs(&self) -> ClusterResult<Vec<Job>>;

    /// Writes the persistent unit definition and reloads the supervisor.
    async fn create(&self, job: &Job) -> ClusterResult<()>;

    /// Removes the persistent unit definition and reloads the supervisor.
    async fn destroy(&self, job: &Job) -> ClusterResult<()>;

    async fn start(&self, job: &Job) -> ClusterResult<()>;

    async fn stop(&self, job: &Job) -> ClusterResult<()>;

    /// The last `count` journal lines of the job's unit.
    async fn get_logs(&self, job_id: &str, count: usize) -> ClusterResult<String>;
}
