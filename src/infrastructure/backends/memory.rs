//! In-memory cluster store
//!
//! Implements the full store contract over a HashMap, including revisions,
//! CAS predicates and blocking watches, so the core can be exercised
//! hermetically in tests. Not meant for production use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::domain::errors::{ClusterError, ClusterResult};
use crate::domain::repositories::{ClusterStore, ExistPredicate};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    directory: bool,
    revision: i64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Revisions at which keys were deleted, so watches see removals too.
    tombstones: HashMap<String, i64>,
    revision: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    changed: Notify,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: whether a key currently exists.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap().entries.contains_key(key)
    }

    fn covers(candidate: &str, key: &str) -> bool {
        candidate == key || candidate.starts_with(&format!("{key}/"))
    }

    fn newest_revision_under(inner: &Inner, key: &str) -> Option<i64> {
        inner
            .entries
            .iter()
            .filter(|(k, _)| Self::covers(k, key))
            .map(|(_, e)| e.revision)
            .chain(
                inner
                    .tombstones
                    .iter()
                    .filter(|(k, _)| Self::covers(k, key))
                    .map(|(_, rev)| *rev),
            )
            .max()
    }
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn watch(&self, key: &str, after_revision: i64) -> ClusterResult<i64> {
        loop {
            // register the waiter before checking, so a write landing between
            // the check and the await cannot be missed
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let inner = self.inner.lock().unwrap();
                if let Some(revision) = Self::newest_revision_under(&inner, key) {
                    if revision > after_revision {
                        return Ok(revision);
                    }
                }
            }
            notified.await;
        }
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        directory: bool,
        predicate: ExistPredicate,
        expected_revision: i64,
    ) -> ClusterResult<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            let existing = inner.entries.get(key);
            match predicate {
                ExistPredicate::MustNotExist if existing.is_some() => {
                    return Err(ClusterError::Conflict(key.to_string()));
                }
                ExistPredicate::MustExist if existing.is_none() => {
                    return Err(ClusterError::Conflict(key.to_string()));
                }
                _ => {}
            }
            if expected_revision != 0 {
                match existing {
                    Some(entry) if entry.revision == expected_revision => {}
                    _ => return Err(ClusterError::Conflict(key.to_string())),
                }
            }
            inner.revision += 1;
            let revision = inner.revision;
            inner.entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    directory,
                    revision,
                },
            );
            inner.tombstones.remove(key);
        }
        self.changed.notify_waiters();
        Ok(())
    }

    async fn get(&self, key: &str) -> ClusterResult<(String, i64)> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.revision))
            .ok_or_else(|| ClusterError::NotFound(key.to_string()))
    }

    async fn get_children(&self, key: &str) -> ClusterResult<(Vec<String>, i64)> {
        let inner = self.inner.lock().unwrap();
        let prefix = format!("{key}/");
        let mut values = Vec::new();
        for (k, entry) in &inner.entries {
            if let Some(rest) = k.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    values.push(entry.value.clone());
                }
            }
        }
        Ok((values, inner.revision))
    }

    async fn exists(&self, key: &str) -> ClusterResult<bool> {
        Ok(self.inner.lock().unwrap().entries.contains_key(key))
    }

    async fn delete(&self, key: &str, recursive: bool) -> ClusterResult<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            let prefix = format!("{key}/");
            let doomed: Vec<String> = inner
                .entries
                .keys()
                .filter(|k| k.as_str() == key || (recursive && k.starts_with(&prefix)))
                .cloned()
                .collect();
            if doomed.is_empty() {
                return Err(ClusterError::NotFound(key.to_string()));
            }
            inner.revision += 1;
            let revision = inner.revision;
            for k in doomed {
                inner.entries.remove(&k);
                inner.tombstones.insert(k, revision);
            }
        }
        self.changed.notify_waiters();
        Ok(())
    }
}
