//! Placement scheduler
//!
//! First-fit over the namespace's nodes: the first node whose free capacity
//! covers the job's demands on all three dimensions gets the assignment.
//! Racing schedulers serialise only through the revision-guarded CAS on the
//! node record; losing that race just moves on to the next candidate.

use tracing::{debug, info};

use crate::application::services::Namespace;
use crate::domain::entities::{Job, JobStatus, Node};
use crate::domain::errors::{ClusterError, ClusterResult};
use crate::domain::repositories::ClusterStore;

pub struct Scheduler {
    namespace: Namespace,
}

impl Scheduler {
    pub fn new(namespace: Namespace) -> Self {
        Self { namespace }
    }

    /// Places a job on at most one node.
    ///
    /// Nodes are tried in enumeration order, which carries no ordering
    /// contract. A job found already assigned yields `DuplicateAssignment`
    /// carrying the occupied node; that check is best-effort, and a lost
    /// race is still caught by the assignment CAS. When no node fits, the
    /// returned status is unplaced and no error is raised.
    pub async fn schedule(&self, store: &dyn ClusterStore, job: &Job) -> ClusterResult<JobStatus> {
        let nodes = self.namespace.nodes(store).await?;

        for node in &nodes {
            if node.job_ids.iter().any(|id| id == &job.id) {
                return Err(ClusterError::DuplicateAssignment {
                    job: job.id.clone(),
                    node: node.name.clone(),
                });
            }
        }

        for candidate in &nodes {
            // reload to pick up the revision the CAS will be keyed on
            let mut node = match self.namespace.get_node(store, &candidate.name).await {
                Ok(node) => node,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };

            if !fits(&node, store, job).await? {
                debug!(node = %node.name, job = %job.id, "not enough free capacity");
                continue;
            }

            match node.assign(store, &job.id).await {
                Ok(()) => {
                    info!(node = %node.name, job = %job.id, "scheduled");
                    return Ok(JobStatus::placed(&job.id, &node.name));
                }
                Err(err) if err.is_conflict() => {
                    debug!(node = %node.name, job = %job.id, "lost assignment race, trying next node");
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(JobStatus::unplaced(&job.id))
    }

    /// Removes the job's assignment wherever it is found. Sweeps every node
    /// rather than stopping at the first match, so a cluster that somehow
    /// double-assigned a job is still cleaned up entirely.
    pub async fn unschedule(&self, store: &dyn ClusterStore, job: &Job) -> ClusterResult<()> {
        let nodes = self.namespace.nodes(store).await?;
        let mut found = false;

        for candidate in &nodes {
            if !candidate.job_ids.iter().any(|id| id == &job.id) {
                continue;
            }
            let mut node = self.namespace.get_node(store, &candidate.name).await?;
            node.unassign(store, &job.id).await?;
            info!(node = %node.name, job = %job.id, "unscheduled");
            found = true;
        }

        if found {
            Ok(())
        } else {
            Err(ClusterError::UnscheduleFailed(job.id.clone()))
        }
    }
}

async fn fits(node: &Node, store: &dyn ClusterStore, job: &Job) -> ClusterResult<bool> {
    let free = node.free_resources(store).await?;
    Ok(free.cpu_shares >= job.cpu_shares
        && free.io_weight >= job.io_weight
        && free.memory_mb >= job.memory_mb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::backends::MemoryStore;

    async fn add_node(store: &MemoryStore, name: &str, cpu: i64) -> Node {
        let mut node = Node {
            name: name.into(),
            namespace: "test".into(),
            endpoint: "127.0.0.1:10004".into(),
            cpu_capacity: cpu,
            io_capacity: 10_000,
            memory_capacity: 10_000,
            ..Node::default()
        };
        Namespace::new("test")
            .create_node(store, &mut node)
            .await
            .unwrap();
        node
    }

    async fn add_job(store: &MemoryStore, id: &str, cpu: i64) -> Job {
        let mut job = Job::named(id);
        job.cpu_shares = cpu;
        job.io_weight = 10;
        job.memory_mb = 10;
        Namespace::new("test").create_job(store, &job).await.unwrap();
        job
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(Namespace::new("test"))
    }

    #[tokio::test]
    async fn first_fit_picks_the_only_node_with_capacity() {
        let store = MemoryStore::new();
        add_node(&store, "a", 1000).await;
        add_node(&store, "b", 200).await;
        let job = add_job(&store, "j", 500).await;

        let status = scheduler().schedule(&store, &job).await.unwrap();
        assert!(status.is_scheduled);
        assert_eq!(status.node_name, "a");

        let namespace = Namespace::new("test");
        let a = namespace.get_node(&store, "a").await.unwrap();
        let b = namespace.get_node(&store, "b").await.unwrap();
        assert_eq!(a.job_ids, vec!["j".to_string()]);
        assert!(b.job_ids.is_empty());
    }

    #[tokio::test]
    async fn an_oversized_job_stays_unplaced_without_error() {
        let store = MemoryStore::new();
        add_node(&store, "a", 200).await;
        let job = add_job(&store, "big", 5000).await;

        let status = scheduler().schedule(&store, &job).await.unwrap();
        assert!(!status.is_scheduled);
        assert_eq!(status.node_name, "");
    }

    #[tokio::test]
    async fn an_already_assigned_job_is_rejected_and_untouched() {
        let store = MemoryStore::new();
        add_node(&store, "a", 1000).await;
        let job = add_job(&store, "j", 100).await;

        scheduler().schedule(&store, &job).await.unwrap();
        let err = scheduler().schedule(&store, &job).await.unwrap_err();
        assert!(matches!(
            err,
            ClusterError::DuplicateAssignment { ref node, .. } if node == "a"
        ));

        // the job still appears exactly once in the fleet
        let nodes = Namespace::new("test").nodes(&store).await.unwrap();
        let occurrences: usize = nodes
            .iter()
            .map(|n| n.job_ids.iter().filter(|id| *id == "j").count())
            .sum();
        assert_eq!(occurrences, 1);
    }

    #[tokio::test]
    async fn demands_are_checked_on_every_dimension() {
        let store = MemoryStore::new();
        let mut node = Node {
            name: "a".into(),
            namespace: "test".into(),
            endpoint: "127.0.0.1:10004".into(),
            cpu_capacity: 10_000,
            io_capacity: 10_000,
            memory_capacity: 5,
            ..Node::default()
        };
        Namespace::new("test")
            .create_node(&store, &mut node)
            .await
            .unwrap();
        let job = add_job(&store, "j", 100).await; // memory_mb = 10 > 5

        let status = scheduler().schedule(&store, &job).await.unwrap();
        assert!(!status.is_scheduled);
    }

    #[tokio::test]
    async fn scheduling_fills_a_node_up_then_spills_over() {
        let store = MemoryStore::new();
        add_node(&store, "a", 500).await;
        add_node(&store, "b", 500).await;

        let first = add_job(&store, "first", 400).await;
        let second = add_job(&store, "second", 400).await;

        let placed_first = scheduler().schedule(&store, &first).await.unwrap();
        let placed_second = scheduler().schedule(&store, &second).await.unwrap();
        assert!(placed_first.is_scheduled);
        assert!(placed_second.is_scheduled);
        // whatever the enumeration order, the two jobs cannot share a node
        assert_ne!(placed_first.node_name, placed_second.node_name);
    }

    #[tokio::test]
    async fn unschedule_removes_the_assignment() {
        let store = MemoryStore::new();
        add_node(&store, "a", 1000).await;
        let job = add_job(&store, "j", 100).await;

        scheduler().schedule(&store, &job).await.unwrap();
        scheduler().unschedule(&store, &job).await.unwrap();

        let node = Namespace::new("test").get_node(&store, "a").await.unwrap();
        assert!(node.job_ids.is_empty());

        let err = scheduler().unschedule(&store, &job).await.unwrap_err();
        assert!(matches!(err, ClusterError::UnscheduleFailed(_)));
    }

    #[tokio::test]
    async fn unschedule_sweeps_every_replica() {
        let store = MemoryStore::new();
        let mut a = add_node(&store, "a", 1000).await;
        let mut b = add_node(&store, "b", 1000).await;
        let job = add_job(&store, "j", 100).await;

        // simulate a cluster that violated assignment uniqueness
        a.assign(&store, "j").await.unwrap();
        b.assign(&store, "j").await.unwrap();

        scheduler().unschedule(&store, &job).await.unwrap();

        let namespace = Namespace::new("test");
        for name in ["a", "b"] {
            let node = namespace.get_node(&store, name).await.unwrap();
            assert!(node.job_ids.is_empty(), "job left behind on {name}");
        }
    }
}
