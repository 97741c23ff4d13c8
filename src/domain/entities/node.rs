//! Node entity module
//!
//! A Node is a worker advertising capacity and holding the desired
//! assignment for itself: the ordered list of job ids it should be running.
//! The record is mutated only through compare-and-swap writes keyed on the
//! revision observed at load time, which is what serialises concurrent
//! schedulers against each other.

use serde::Deserialize;
use tracing::debug;

use crate::domain::entities::Job;
use crate::domain::errors::{ClusterError, ClusterResult};
use crate::domain::keyspace;
use crate::domain::repositories::{ClusterStore, ExistPredicate};

/// Capacity (or remaining capacity) along the three scheduling dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    pub cpu_shares: i64,
    pub io_weight: i64,
    pub memory_mb: i64,
}

/// A worker in the fleet
///
/// `revision` is the store's last-observed modification revision for this
/// record. It is computed on load and never persisted.
#[derive(Debug, Clone, Default, serde::Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub namespace: String,
    /// Routable `host:port` of the node's HTTP endpoint
    pub endpoint: String,
    pub cpu_capacity: i64,
    pub io_capacity: i64,
    pub memory_capacity: i64,
    /// Ordered list of assigned job ids; duplicates are forbidden
    #[serde(default)]
    pub job_ids: Vec<String>,
    #[serde(skip)]
    pub revision: i64,
}

impl Node {
    pub fn serialize(&self) -> ClusterResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize(raw: &str) -> ClusterResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    fn path(&self) -> String {
        keyspace::node_path(&self.namespace, &self.name)
    }

    /// Advertises this node to the cluster. The record is created with a
    /// must-not-exist CAS; when it already exists (a restart) the stored
    /// record is adopted instead, so capacities and endpoint survive process
    /// deaths. Idempotent.
    pub async fn join(&mut self, store: &dyn ClusterStore) -> ClusterResult<()> {
        let doc = self.serialize()?;
        match store
            .put(&self.path(), &doc, false, ExistPredicate::MustNotExist, 0)
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_conflict() => {
                debug!(node = %self.name, "record already present, adopting it");
            }
            Err(err) => return Err(err),
        }
        self.load(store).await
    }

    /// Replaces this value with the stored record, including its revision.
    pub async fn load(&mut self, store: &dyn ClusterStore) -> ClusterResult<()> {
        let (raw, revision) = store.get(&self.path()).await?;
        let mut loaded = Node::deserialize(&raw)?;
        loaded.revision = revision;
        *self = loaded;
        Ok(())
    }

    /// Removes this node's record from the cluster.
    pub async fn leave(&self, store: &dyn ClusterStore) -> ClusterResult<()> {
        store.delete(&self.path(), true).await
    }

    /// Writes the record back under the given predicate, expecting the
    /// revision observed at load time.
    pub async fn save_cas(
        &self,
        store: &dyn ClusterStore,
        predicate: ExistPredicate,
    ) -> ClusterResult<()> {
        let doc = self.serialize()?;
        store
            .put(&self.path(), &doc, false, predicate, self.revision)
            .await
    }

    /// Appends a job to the desired assignment. The revision-guarded CAS
    /// rejects the write if another scheduler touched this node since load.
    pub async fn assign(&mut self, store: &dyn ClusterStore, job_id: &str) -> ClusterResult<()> {
        if self.job_ids.iter().any(|id| id == job_id) {
            return Err(ClusterError::DuplicateAssignment {
                job: job_id.to_string(),
                node: self.name.clone(),
            });
        }
        self.job_ids.push(job_id.to_string());
        self.save_cas(store, ExistPredicate::MustExist).await
    }

    /// Removes a job from the desired assignment. Unassigning a job that is
    /// not present is not an error.
    pub async fn unassign(&mut self, store: &dyn ClusterStore, job_id: &str) -> ClusterResult<()> {
        let before = self.job_ids.len();
        self.job_ids.retain(|id| id != job_id);
        if self.job_ids.len() == before {
            return Ok(());
        }
        self.save_cas(store, ExistPredicate::MustExist).await
    }

    /// Resolves the assigned job ids to their stored definitions. A missing
    /// definition surfaces as `NotFound`.
    pub async fn jobs(&self, store: &dyn ClusterStore) -> ClusterResult<Vec<Job>> {
        let mut jobs = Vec::with_capacity(self.job_ids.len());
        for job_id in &self.job_ids {
            let (raw, _) = store
                .get(&keyspace::job_path(&self.namespace, job_id))
                .await?;
            jobs.push(Job::deserialize(&raw)?);
        }
        Ok(jobs)
    }

    /// Capacity left after subtracting the demands of every assigned job.
    /// May go negative when capacities were shrunk externally.
    pub async fn free_resources(&self, store: &dyn ClusterStore) -> ClusterResult<Resources> {
        let mut free = Resources {
            cpu_shares: self.cpu_capacity,
            io_weight: self.io_capacity,
            memory_mb: self.memory_capacity,
        };
        for job in self.jobs(store).await? {
            free.cpu_shares -= job.cpu_shares;
            free.io_weight -= job.io_weight;
            free.memory_mb -= job.memory_mb;
        }
        Ok(free)
    }

    /// Blocks until this node's record changes at a revision strictly greater
    /// than `after_revision`, returning the new revision.
    pub async fn watch_changes(
        &self,
        store: &dyn ClusterStore,
        after_revision: i64,
    ) -> ClusterResult<i64> {
        store.watch(&self.path(), after_revision).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::keyspace;
    use crate::infrastructure::backends::MemoryStore;

    fn test_node() -> Node {
        Node {
            name: "n1".into(),
            namespace: "test".into(),
            endpoint: "127.0.0.1:10004".into(),
            cpu_capacity: 1000,
            io_capacity: 1000,
            memory_capacity: 1000,
            ..Node::default()
        }
    }

    async fn store_job(store: &MemoryStore, namespace: &str, job: &Job) {
        store
            .put(
                &keyspace::job_path(namespace, &job.id),
                &job.serialize().unwrap(),
                false,
                ExistPredicate::Any,
                0,
            )
            .await
            .unwrap();
    }

    #[test]
    fn round_trips_through_json_without_the_revision() {
        let mut node = test_node();
        node.job_ids = vec!["a".into(), "b".into()];
        node.revision = 42;

        let raw = node.serialize().unwrap();
        assert!(!raw.contains("revision"));

        let restored = Node::deserialize(&raw).unwrap();
        assert_eq!(restored.revision, 0);
        node.revision = 0;
        assert_eq!(restored, node);
    }

    #[tokio::test]
    async fn join_creates_the_record_and_is_idempotent() {
        let store = MemoryStore::new();
        let mut node = test_node();

        node.join(&store).await.unwrap();
        assert!(store.contains("/orch/clusters/test/nodes/n1"));
        assert!(node.revision > 0);

        // a restart with different flags still adopts the stored record
        let mut rejoined = test_node();
        rejoined.cpu_capacity = 9999;
        rejoined.join(&store).await.unwrap();
        assert_eq!(rejoined.cpu_capacity, 1000);

        node.leave(&store).await.unwrap();
        assert!(!store.contains("/orch/clusters/test/nodes/n1"));
    }

    #[tokio::test]
    async fn assign_rejects_duplicates_and_unassign_is_idempotent() {
        let store = MemoryStore::new();
        let mut node = test_node();
        node.join(&store).await.unwrap();

        node.assign(&store, "web").await.unwrap();
        assert_eq!(node.job_ids, vec!["web".to_string()]);

        let err = node.assign(&store, "web").await.unwrap_err();
        assert!(matches!(err, ClusterError::DuplicateAssignment { .. }));

        node.load(&store).await.unwrap();
        node.unassign(&store, "web").await.unwrap();
        assert!(node.job_ids.is_empty());

        // absent job: no error, no write
        node.load(&store).await.unwrap();
        node.unassign(&store, "web").await.unwrap();
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let store = MemoryStore::new();
        let mut node = test_node();
        node.join(&store).await.unwrap();

        let mut racer = test_node();
        racer.load(&store).await.unwrap();
        racer.assign(&store, "first").await.unwrap();

        // `node` still holds the pre-race revision
        let err = node.assign(&store, "second").await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn free_resources_subtract_assigned_demands() {
        let store = MemoryStore::new();
        let mut job = Job::named("web");
        job.cpu_shares = 200;
        job.io_weight = 300;
        job.memory_mb = 50;
        store_job(&store, "test", &job).await;

        let mut node = test_node();
        node.join(&store).await.unwrap();
        node.assign(&store, "web").await.unwrap();

        let free = node.free_resources(&store).await.unwrap();
        assert_eq!(free.cpu_shares, 800);
        assert_eq!(free.io_weight, 700);
        assert_eq!(free.memory_mb, 950);

        let jobs = node.jobs(&store).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "web");
    }

    #[tokio::test]
    async fn missing_job_definition_propagates_not_found() {
        let store = MemoryStore::new();
        let mut node = test_node();
        node.join(&store).await.unwrap();
        node.assign(&store, "ghost").await.unwrap();

        let err = node.jobs(&store).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
