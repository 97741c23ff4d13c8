//! Contract over the backing KV store
//!
//! The core never talks to the store directly; everything goes through this
//! narrow capability set. The store is assumed to be strongly consistent and
//! to expose a monotonically increasing revision on every modification,
//! which the write predicates below lean on for compare-and-swap.

use async_trait::async_trait;

use crate::domain::errors::ClusterResult;

/// Existence predicate attached to a write.
///
/// Combined with the `expected_revision` argument of [`ClusterStore::put`]:
/// a non-zero revision additionally requires the key to sit at exactly that
/// revision. `Any` with revision zero is an unconditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistPredicate {
    MustNotExist,
    MustExist,
    Any,
}

#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Blocks until `key` or a descendant of it is modified at a revision
    /// strictly greater than `after_revision`, and returns that revision.
    /// Cancelled by dropping the future.
    async fn watch(&self, key: &str, after_revision: i64) -> ClusterResult<i64>;

    /// Atomically writes `value` at `key` under the given predicate. A
    /// violated predicate fails with `Conflict`. `directory` marks the key
    /// as a container rather than a document.
    async fn put(
        &self,
        key: &str,
        value: &str,
        directory: bool,
        predicate: ExistPredicate,
        expected_revision: i64,
    ) -> ClusterResult<()>;

    /// Value and last-modified revision of `key`; `NotFound` when absent.
    async fn get(&self, key: &str) -> ClusterResult<(String, i64)>;

    /// Values of the immediate children of `key`, plus the store revision at
    /// read time. A childless or absent key yields an empty list.
    async fn get_children(&self, key: &str) -> ClusterResult<(Vec<String>, i64)>;

    async fn exists(&self, key: &str) -> ClusterResult<bool>;

    /// Deletes `key`; with `recursive`, its descendants too.
    async fn delete(&self, key: &str, recursive: bool) -> ClusterResult<()>;
}
