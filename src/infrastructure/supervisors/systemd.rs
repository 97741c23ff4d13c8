//! systemd adapter for the process supervisor contract
//!
//! Units are driven through `systemctl` and logs come from `journalctl`.
//! Every unit this node owns is named `orch-<namespace>-<node>-<job>.service`,
//! which is how `list_managed_jobs` tells its own units apart from the rest
//! of the host. The adapter keeps no connection state, so one handle can be
//! shared between the reconciler and the HTTP log endpoint.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use crate::domain::entities::Job;
use crate::domain::errors::{ClusterError, ClusterResult};
use crate::domain::repositories::ProcessSupervisor;

const UNIT_DIR: &str = "/etc/systemd/system";

pub struct SystemdSupervisor {
    namespace: String,
    node_name: String,
    unit_dir: PathBuf,
}

impl SystemdSupervisor {
    pub fn new(namespace: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            node_name: node_name.into(),
            unit_dir: PathBuf::from(UNIT_DIR),
        }
    }

    fn unit_prefix(&self) -> String {
        format!("orch-{}-{}-", self.namespace, self.node_name)
    }

    fn unit_name(&self, job_id: &str) -> String {
        format!("{}{}.service", self.unit_prefix(), job_id)
    }

    fn unit_path(&self, job_id: &str) -> PathBuf {
        self.unit_dir.join(self.unit_name(job_id))
    }

    async fn systemctl(&self, args: &[&str]) -> ClusterResult<String> {
        debug!(?args, "systemctl");
        let output = Command::new("systemctl")
            .args(args)
            .output()
            .await
            .map_err(|err| ClusterError::Local(format!("systemctl {}: {err}", args.join(" "))))?;
        if !output.status.success() {
            return Err(ClusterError::Local(format!(
                "systemctl {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn reload(&self) -> ClusterResult<()> {
        self.systemctl(&["daemon-reload"]).await.map(|_| ())
    }
}

#[async_trait]
impl ProcessSupervisor for SystemdSupervisor {
    async fn connect(&self) -> ClusterResult<()> {
        // proves systemd is reachable without requiring a healthy system
        self.systemctl(&["--version"]).await.map(|_| ())
    }

    async fn disconnect(&self) {}

    async fn list_managed_jobs(&self) -> ClusterResult<Vec<Job>> {
        let prefix = self.unit_prefix();
        let pattern = format!("{prefix}*.service");
        let listing = self
            .systemctl(&[
                "list-units",
                "--type=service",
                "--all",
                "--plain",
                "--no-legend",
                &pattern,
            ])
            .await?;

        let mut jobs = Vec::new();
        for line in listing.lines() {
            // columns: UNIT LOAD ACTIVE SUB DESCRIPTION
            let mut columns = line.split_whitespace();
            let (Some(unit), _load, _active, Some(sub)) = (
                columns.next(),
                columns.next(),
                columns.next(),
                columns.next(),
            ) else {
                continue;
            };
            let Some(id) = unit
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(".service"))
            else {
                continue;
            };
            let mut job = Job::named(id);
            job.is_running = sub == "running";
            jobs.push(job);
        }
        Ok(jobs)
    }

    async fn create(&self, job: &Job) -> ClusterResult<()> {
        let path = self.unit_path(&job.id);
        fs::write(&path, &job.unit_text).await.map_err(|err| {
            ClusterError::Local(format!("writing unit file {}: {err}", path.display()))
        })?;
        self.reload().await
    }

    async fn destroy(&self, job: &Job) -> ClusterResult<()> {
        let path = self.unit_path(&job.id);
        fs::remove_file(&path).await.map_err(|err| {
            ClusterError::Local(format!("removing unit file {}: {err}", path.display()))
        })?;
        self.reload().await
    }

    async fn start(&self, job: &Job) -> ClusterResult<()> {
        self.systemctl(&["start", &self.unit_name(&job.id)])
            .await
            .map(|_| ())
    }

    async fn stop(&self, job: &Job) -> ClusterResult<()> {
        self.systemctl(&["stop", &self.unit_name(&job.id)])
            .await
            .map(|_| ())
    }

    async fn get_logs(&self, job_id: &str, count: usize) -> ClusterResult<String> {
        // journalctl exits zero even for unknown units; the unit file is the
        // authority on whether this node owns the job
        let known = fs::try_exists(self.unit_path(job_id)).await.unwrap_or(false);
        if !known {
            return Err(ClusterError::NotFound(self.unit_name(job_id)));
        }

        let unit = self.unit_name(job_id);
        let output = Command::new("journalctl")
            .args(["-u", &unit, "-n", &count.to_string(), "--no-pager"])
            .output()
            .await
            .map_err(|err| ClusterError::Local(format!("journalctl -u {unit}: {err}")))?;
        if !output.status.success() {
            return Err(ClusterError::Local(format!(
                "journalctl -u {unit} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_names_are_scoped_by_namespace_and_node() {
        let supervisor = SystemdSupervisor::new("default", "n1");
        assert_eq!(supervisor.unit_name("web"), "orch-default-n1-web.service");
        assert_eq!(
            supervisor.unit_path("web"),
            PathBuf::from("/etc/systemd/system/orch-default-n1-web.service")
        );
    }
}
