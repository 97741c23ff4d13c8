//! CLI command implementations
//!
//! Thin adapters between the command line and the core services: they
//! connect to the backing store, call one operation, and print the outcome.
//! Any propagated error surfaces through `main` as a non-zero exit.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::application::services::{Agent, Namespace, Scheduler};
use crate::domain::entities::Node;
use crate::domain::repositories::{ClusterStore, ProcessSupervisor};
use crate::infrastructure::backends::EtcdStore;
use crate::infrastructure::parsers::UnitFileParser;
use crate::infrastructure::supervisors::SystemdSupervisor;
use crate::web;

async fn connect(etcd: &[String]) -> Result<Arc<dyn ClusterStore>> {
    let store = EtcdStore::connect(etcd)
        .await
        .with_context(|| format!("connecting to etcd at {}", etcd.join(",")))?;
    Ok(Arc::new(store))
}

/// The agent advertises its bind address as the node endpoint, so it must be
/// a concrete routable host:port pair.
fn validate_endpoint(bind: &str) -> Result<()> {
    match bind.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            if matches!(host, "0.0.0.0" | "::" | "[::]" | "*") {
                bail!("--bind must be a routable address, not a wildcard: {bind}");
            }
            Ok(())
        }
        _ => bail!("--bind must be a host:port pair: {bind}"),
    }
}

pub struct AgentCommand;

impl AgentCommand {
    /// Runs the reconciliation loop and the log endpoint side by side; the
    /// first failure of either, or ctrl-c, brings the agent down.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        etcd: &[String],
        namespace: &str,
        bind: &str,
        name: &str,
        cpu: i64,
        io: i64,
        memory: i64,
    ) -> Result<()> {
        validate_endpoint(bind)?;
        let store = connect(etcd).await?;
        let supervisor: Arc<dyn ProcessSupervisor> =
            Arc::new(SystemdSupervisor::new(namespace, name));

        let node = Node {
            name: name.to_string(),
            namespace: namespace.to_string(),
            endpoint: bind.to_string(),
            cpu_capacity: cpu,
            io_capacity: io,
            memory_capacity: memory,
            ..Node::default()
        };
        let mut agent = Agent::new(store, supervisor.clone(), node);

        tokio::select! {
            result = agent.run() => result.context("agent terminated")?,
            result = web::start_log_server(bind, supervisor.clone()) => {
                result.context("log endpoint terminated")?
            }
            _ = tokio::signal::ctrl_c() => info!("shutting down"),
        }

        supervisor.disconnect().await;
        Ok(())
    }
}

pub struct CreateCommand;

impl CreateCommand {
    pub async fn execute(etcd: &[String], namespace: &str, name: &str, file: &Path) -> Result<()> {
        let unit_text = std::fs::read_to_string(file)
            .with_context(|| format!("reading unit file {}", file.display()))?;
        let job = UnitFileParser::parse(name, &unit_text).context("parsing unit file")?;

        let store = connect(etcd).await?;
        Namespace::new(namespace)
            .create_job(store.as_ref(), &job)
            .await?;
        info!(job = name, "stored job definition");
        Ok(())
    }
}

pub struct DestroyCommand;

impl DestroyCommand {
    pub async fn execute(etcd: &[String], namespace: &str, name: &str) -> Result<()> {
        let store = connect(etcd).await?;
        let namespace = Namespace::new(namespace);

        if let Some(node) = namespace.node_running(store.as_ref(), name).await? {
            bail!(
                "job {name} is still scheduled on node {}; run `orch stop --name {name}` first",
                node.name
            );
        }

        namespace.destroy_job(store.as_ref(), name).await?;
        info!(job = name, "destroyed job definition");
        Ok(())
    }
}

pub struct ListCommand;

impl ListCommand {
    pub async fn execute(etcd: &[String], namespace: &str, name: Option<&str>) -> Result<()> {
        let store = connect(etcd).await?;
        let namespace = Namespace::new(namespace);

        match name {
            Some(name) => {
                let job = namespace.get_job(store.as_ref(), name).await?;
                Self::print_job(&job);
                match namespace.node_running(store.as_ref(), name).await? {
                    Some(node) => println!("  scheduled on: {}", node.name),
                    None => println!("  not scheduled"),
                }
            }
            None => {
                for job in namespace.jobs(store.as_ref()).await? {
                    Self::print_job(&job);
                }
            }
        }
        Ok(())
    }

    fn print_job(job: &crate::domain::entities::Job) {
        println!(
            "{}  cpu={} io={} memory={}M",
            job.id, job.cpu_shares, job.io_weight, job.memory_mb
        );
    }
}

pub struct StatusCommand;

impl StatusCommand {
    pub async fn execute(etcd: &[String], namespace: &str) -> Result<()> {
        let store = connect(etcd).await?;
        let namespace = Namespace::new(namespace);

        for node in namespace.nodes(store.as_ref()).await? {
            let free = node.free_resources(store.as_ref()).await?;
            println!("{} ({})", node.name, node.endpoint);
            println!(
                "  cpu: {}/{}  io: {}/{}  memory: {}M/{}M",
                free.cpu_shares,
                node.cpu_capacity,
                free.io_weight,
                node.io_capacity,
                free.memory_mb,
                node.memory_capacity
            );
            if node.job_ids.is_empty() {
                println!("  jobs: none");
            } else {
                println!("  jobs: {}", node.job_ids.join(", "));
            }
        }
        Ok(())
    }
}

pub struct StartCommand;

impl StartCommand {
    pub async fn execute(etcd: &[String], namespace: &str, name: &str) -> Result<()> {
        let store = connect(etcd).await?;
        let namespace = Namespace::new(namespace);
        let job = namespace.get_job(store.as_ref(), name).await?;

        let status = Scheduler::new(namespace)
            .schedule(store.as_ref(), &job)
            .await?;
        if status.is_scheduled {
            println!("scheduled {} on node {}", status.job_id, status.node_name);
        } else {
            println!("no node has free capacity for job {}", status.job_id);
        }
        Ok(())
    }
}

pub struct StopCommand;

impl StopCommand {
    pub async fn execute(etcd: &[String], namespace: &str, name: &str) -> Result<()> {
        let store = connect(etcd).await?;
        let namespace = Namespace::new(namespace);
        let job = namespace.get_job(store.as_ref(), name).await?;

        Scheduler::new(namespace)
            .unschedule(store.as_ref(), &job)
            .await?;
        println!("unscheduled {name}");
        Ok(())
    }
}

pub struct TailCommand;

impl TailCommand {
    pub async fn execute(etcd: &[String], namespace: &str, name: &str, count: usize) -> Result<()> {
        let store = connect(etcd).await?;
        let namespace = Namespace::new(namespace);

        let Some(node) = namespace.node_running(store.as_ref(), name).await? else {
            bail!("job {name} is not running on any node");
        };

        let url = format!("http://{}/logs?job={}&count={}", node.endpoint, name, count);
        let response = reqwest::get(&url)
            .await
            .with_context(|| format!("fetching logs from {url}"))?;
        let body = response
            .text()
            .await
            .context("reading log response body")?;
        print!("{body}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routable_endpoints_pass_validation() {
        assert!(validate_endpoint("127.0.0.1:10004").is_ok());
        assert!(validate_endpoint("worker-3.internal:8080").is_ok());
    }

    #[test]
    fn wildcard_or_malformed_endpoints_are_rejected() {
        for bind in ["0.0.0.0:10004", ":10004", "*:80", "localhost", "host:notaport"] {
            assert!(validate_endpoint(bind).is_err(), "{bind} should be rejected");
        }
    }
}
