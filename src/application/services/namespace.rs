//! Namespace façade
//!
//! A namespace is a named scheduling domain; this service is a stateless
//! operator on the keys underneath it. Namespaces are created lazily the
//! first time a mutating operation touches them and are never deleted by
//! the core.

use tracing::debug;

use crate::domain::entities::{Job, Node};
use crate::domain::errors::ClusterResult;
use crate::domain::keyspace;
use crate::domain::repositories::{ClusterStore, ExistPredicate};

pub struct Namespace {
    name: String,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates the namespace directory if it is missing. Losing the creation
    /// race is fine: the directory exists either way.
    pub async fn ensure(&self, store: &dyn ClusterStore) -> ClusterResult<()> {
        let path = keyspace::namespace_path(&self.name);
        match store
            .put(&path, "", true, ExistPredicate::MustNotExist, 0)
            .await
        {
            Ok(()) => {
                debug!(namespace = %self.name, "created namespace");
                Ok(())
            }
            Err(err) if err.is_conflict() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Stores a job definition. Definitions are immutable: a pre-existing
    /// job is a `Conflict`, and callers wanting overwrite semantics go
    /// through destroy + create.
    pub async fn create_job(&self, store: &dyn ClusterStore, job: &Job) -> ClusterResult<()> {
        self.ensure(store).await?;
        let doc = job.serialize()?;
        store
            .put(
                &keyspace::job_path(&self.name, &job.id),
                &doc,
                false,
                ExistPredicate::MustNotExist,
                0,
            )
            .await
    }

    pub async fn destroy_job(&self, store: &dyn ClusterStore, job_id: &str) -> ClusterResult<()> {
        store
            .delete(&keyspace::job_path(&self.name, job_id), false)
            .await
    }

    pub async fn get_job(&self, store: &dyn ClusterStore, job_id: &str) -> ClusterResult<Job> {
        let (raw, _) = store.get(&keyspace::job_path(&self.name, job_id)).await?;
        Job::deserialize(&raw)
    }

    /// Every job definition stored in the namespace.
    pub async fn jobs(&self, store: &dyn ClusterStore) -> ClusterResult<Vec<Job>> {
        let (children, _) = store.get_children(&keyspace::jobs_path(&self.name)).await?;
        children.iter().map(|raw| Job::deserialize(raw)).collect()
    }

    /// Joins a node into this namespace, creating the namespace first if
    /// needed.
    pub async fn create_node(
        &self,
        store: &dyn ClusterStore,
        node: &mut Node,
    ) -> ClusterResult<()> {
        self.ensure(store).await?;
        node.join(store).await
    }

    /// Loads a node record, revision included.
    pub async fn get_node(&self, store: &dyn ClusterStore, name: &str) -> ClusterResult<Node> {
        let mut node = Node {
            name: name.to_string(),
            namespace: self.name.clone(),
            ..Node::default()
        };
        node.load(store).await?;
        Ok(node)
    }

    /// Every node in the namespace, in backend enumeration order. The
    /// returned records carry no revision; use [`Namespace::get_node`]
    /// before CAS writes.
    pub async fn nodes(&self, store: &dyn ClusterStore) -> ClusterResult<Vec<Node>> {
        let (children, _) = store
            .get_children(&keyspace::nodes_path(&self.name))
            .await?;
        children.iter().map(|raw| Node::deserialize(raw)).collect()
    }

    /// The node whose desired assignment contains `job_id`, if any. At most
    /// one node matches as long as assignments stay unique.
    pub async fn node_running(
        &self,
        store: &dyn ClusterStore,
        job_id: &str,
    ) -> ClusterResult<Option<Node>> {
        for node in self.nodes(store).await? {
            if node.job_ids.iter().any(|id| id == job_id) {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}
