//! Per-node reconciliation agent
//!
//! Keeps the local supervisor's state a pure function of the node's desired
//! assignment: connect, join the cluster, reconcile once, then block on the
//! node record and reconcile after every change. Each watch/reconcile cycle
//! is strictly sequential, and the next watch starts from the revision the
//! previous watch returned, so changes landing mid-reconcile wake it again.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::services::Namespace;
use crate::domain::entities::{Job, Node};
use crate::domain::errors::ClusterResult;
use crate::domain::repositories::{ClusterStore, ProcessSupervisor};

pub struct Agent {
    store: Arc<dyn ClusterStore>,
    local: Arc<dyn ProcessSupervisor>,
    namespace: Namespace,
    node: Node,
}

impl Agent {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        local: Arc<dyn ProcessSupervisor>,
        node: Node,
    ) -> Self {
        let namespace = Namespace::new(node.namespace.clone());
        Self {
            store,
            local,
            namespace,
            node,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Runs the agent until an error propagates. Per-job supervisor failures
    /// are absorbed inside [`Agent::sync`]; anything surfacing here (a
    /// failed connect or join, a broken watch, an unreadable node record)
    /// terminates the agent.
    pub async fn run(&mut self) -> ClusterResult<()> {
        self.local
            .connect()
            .await
            .inspect_err(|err| warn!(%err, "cannot connect to the local supervisor"))?;
        self.join().await?;
        self.sync().await?;

        let mut after = self.node.revision;
        loop {
            info!(node = %self.node.name, revision = after, "watching for assignment changes");
            after = self
                .node
                .watch_changes(self.store.as_ref(), after)
                .await?;
            self.sync().await?;
        }
    }

    /// Advertises this node to the cluster, creating the namespace on first
    /// contact. Idempotent across restarts.
    pub async fn join(&mut self) -> ClusterResult<()> {
        self.namespace
            .create_node(self.store.as_ref(), &mut self.node)
            .await
    }

    /// One reconcile pass: load the desired assignment and converge the
    /// supervisor onto it. Safe to invoke arbitrarily often; an unchanged
    /// cluster state produces no supervisor mutations.
    pub async fn sync(&mut self) -> ClusterResult<()> {
        let store = self.store.as_ref();
        self.node.load(store).await?;

        let desired = self.node.jobs(store).await?;
        let local_jobs = self.local.list_managed_jobs().await?;

        for job in &desired {
            match local_jobs.iter().find(|local| local.id == job.id) {
                None => {
                    info!(job = %job.id, "creating local unit");
                    if let Err(err) = self.local.create(job).await {
                        warn!(job = %job.id, %err, "unable to create local unit");
                    }
                    // best-effort even when the create failed; the next pass
                    // retries whatever is still missing
                    self.start_job(job).await;
                }
                Some(local) if !local.is_running => {
                    self.start_job(job).await;
                }
                Some(_) => {}
            }
        }

        for orphan in local_jobs
            .iter()
            .filter(|local| !desired.iter().any(|job| job.id == local.id))
        {
            info!(job = %orphan.id, "removing orphaned local unit");
            if let Err(err) = self.local.stop(orphan).await {
                warn!(job = %orphan.id, %err, "unable to stop local unit");
            }
            if let Err(err) = self.local.destroy(orphan).await {
                warn!(job = %orphan.id, %err, "unable to destroy local unit");
            }
        }

        Ok(())
    }

    async fn start_job(&self, job: &Job) {
        info!(job = %job.id, "starting local unit");
        if let Err(err) = self.local.start(job).await {
            warn!(job = %job.id, %err, "unable to start local unit");
        }
    }
}
