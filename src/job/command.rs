// src/job/command.rs

//! A job that runs a shell command.

use std::collections::HashSet;
use std::process::Stdio;

use anyhow::{Context, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::JobError;
use crate::job::{DEFAULT_RESOURCE_ID, ExecutionContext, Job, JobFuture, JobId};
use crate::monitor::ExecutionMonitor;

/// Runs `cmd` through the platform shell.
///
/// - A non-zero exit status or a failure to spawn is a recoverable failure.
/// - The child is spawned with `kill_on_drop(true)`, so aborting the worker
///   (cancellation) kills the process.
#[derive(Debug, Clone)]
pub struct CommandJob {
    id: JobId,
    label: String,
    cmd: String,
    blockers: HashSet<JobId>,
    resource: String,
}

impl CommandJob {
    pub fn new(id: impl Into<JobId>, cmd: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            cmd: cmd.into(),
            blockers: HashSet::new(),
            resource: DEFAULT_RESOURCE_ID.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_blockers<I, S>(mut self, blockers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<JobId>,
    {
        self.blockers.extend(blockers.into_iter().map(Into::into));
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn run(
        &self,
        mut monitor: Box<dyn ExecutionMonitor>,
        context: &ExecutionContext,
    ) -> Result<(), JobError> {
        monitor.open(1.0);
        let result = self.run_process(context).await;
        monitor.progressed(1.0);
        monitor.close();
        result
    }

    async fn run_process(&self, context: &ExecutionContext) -> Result<(), JobError> {
        info!(job = %self.id, cmd = %self.cmd, "starting job process");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        cmd.envs(context.environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for job '{}'", self.id))
            .map_err(JobError::Recoverable)?;

        if let Some(stdout) = child.stdout.take() {
            let job = self.id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(job = %job, "stdout: {}", line);
                }
            });
        }

        // Always consume stderr so buffers don't fill.
        if let Some(stderr) = child.stderr.take() {
            let job = self.id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(job = %job, "stderr: {}", line);
                }
            });
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of job '{}'", self.id))
            .map_err(JobError::Recoverable)?;

        let code = status.code().unwrap_or(-1);
        info!(
            job = %self.id,
            exit_code = code,
            success = status.success(),
            "job process exited"
        );

        if status.success() {
            Ok(())
        } else {
            Err(JobError::Recoverable(anyhow!(
                "command of job '{}' exited with status {code}",
                self.id
            )))
        }
    }
}

impl Job for CommandJob {
    fn id(&self) -> &str {
        &self.id
    }

    fn blocker_ids(&self) -> &HashSet<JobId> {
        &self.blockers
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn resource_id(&self) -> &str {
        &self.resource
    }

    fn execute<'a>(
        &'a self,
        monitor: Box<dyn ExecutionMonitor>,
        context: &'a ExecutionContext,
    ) -> JobFuture<'a> {
        Box::pin(self.run(monitor, context))
    }
}
