//! etcd adapter for the cluster store contract
//!
//! Maps the store operations onto the etcd v3 API: CAS predicates become
//! transactions comparing key version and modification revision, children
//! become prefix reads, and watches start one past the caller's revision so
//! nothing between two watch calls is missed. etcd v3 has no directories;
//! a directory is just a marker key here.

use async_trait::async_trait;
use etcd_client::{
    Client, Compare, CompareOp, DeleteOptions, Error as EtcdError, GetOptions, Txn, TxnOp,
    WatchOptions,
};

use crate::domain::errors::{ClusterError, ClusterResult};
use crate::domain::repositories::{ClusterStore, ExistPredicate};

impl From<EtcdError> for ClusterError {
    fn from(err: EtcdError) -> Self {
        ClusterError::Backend(anyhow::Error::new(err))
    }
}

pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    /// Connects to the given etcd endpoints.
    pub async fn connect(endpoints: &[String]) -> ClusterResult<Self> {
        let client = Client::connect(endpoints, None).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ClusterStore for EtcdStore {
    async fn watch(&self, key: &str, after_revision: i64) -> ClusterResult<i64> {
        let mut client = self.client.clone();
        let options = WatchOptions::new()
            .with_prefix()
            .with_start_revision(after_revision + 1);
        let (_watcher, mut stream) = client.watch(key, Some(options)).await?;
        while let Some(response) = stream.message().await? {
            let newest = response
                .events()
                .iter()
                .filter_map(|event| event.kv().map(|kv| kv.mod_revision()))
                .max();
            if let Some(revision) = newest {
                if revision > after_revision {
                    return Ok(revision);
                }
            }
        }
        Err(ClusterError::Backend(anyhow::anyhow!(
            "watch stream on {key} closed by the server"
        )))
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        _directory: bool,
        predicate: ExistPredicate,
        expected_revision: i64,
    ) -> ClusterResult<()> {
        let mut client = self.client.clone();

        let mut compares = Vec::new();
        match predicate {
            // version 0 means the key does not exist
            ExistPredicate::MustNotExist => {
                compares.push(Compare::version(key, CompareOp::Equal, 0));
            }
            ExistPredicate::MustExist => {
                compares.push(Compare::version(key, CompareOp::Greater, 0));
            }
            ExistPredicate::Any => {}
        }
        if expected_revision != 0 {
            compares.push(Compare::mod_revision(key, CompareOp::Equal, expected_revision));
        }

        if compares.is_empty() {
            client.put(key, value, None).await?;
            return Ok(());
        }

        let txn = Txn::new()
            .when(compares)
            .and_then(vec![TxnOp::put(key, value, None)]);
        let response = client.txn(txn).await?;
        if response.succeeded() {
            Ok(())
        } else {
            Err(ClusterError::Conflict(key.to_string()))
        }
    }

    async fn get(&self, key: &str) -> ClusterResult<(String, i64)> {
        let mut client = self.client.clone();
        let response = client.get(key, None).await?;
        response
            .kvs()
            .first()
            .map(|kv| {
                (
                    String::from_utf8_lossy(kv.value()).into_owned(),
                    kv.mod_revision(),
                )
            })
            .ok_or_else(|| ClusterError::NotFound(key.to_string()))
    }

    async fn get_children(&self, key: &str) -> ClusterResult<(Vec<String>, i64)> {
        let mut client = self.client.clone();
        let prefix = format!("{key}/");
        let response = client
            .get(prefix.as_str(), Some(GetOptions::new().with_prefix()))
            .await?;
        let revision = response.header().map(|h| h.revision()).unwrap_or(0);
        let mut values = Vec::new();
        for kv in response.kvs() {
            let k = String::from_utf8_lossy(kv.key());
            let rest = &k[prefix.len()..];
            if !rest.is_empty() && !rest.contains('/') {
                values.push(String::from_utf8_lossy(kv.value()).into_owned());
            }
        }
        Ok((values, revision))
    }

    async fn exists(&self, key: &str) -> ClusterResult<bool> {
        let mut client = self.client.clone();
        let response = client
            .get(key, Some(GetOptions::new().with_count_only()))
            .await?;
        Ok(response.count() > 0)
    }

    async fn delete(&self, key: &str, recursive: bool) -> ClusterResult<()> {
        let mut client = self.client.clone();
        let mut removed = client.delete(key, None).await?.deleted();
        if recursive {
            let prefix = format!("{key}/");
            removed += client
                .delete(prefix, Some(DeleteOptions::new().with_prefix()))
                .await?
                .deleted();
        }
        if removed == 0 {
            return Err(ClusterError::NotFound(key.to_string()));
        }
        Ok(())
    }
}
