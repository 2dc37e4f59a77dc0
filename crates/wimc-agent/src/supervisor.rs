//! Agent process supervision.
//!
//! Spawns the fetch-agent executable from a `LaunchPlan`, attaches the
//! job's progress channel, reads the agent's JSON progress reports from its
//! stdout pipe, and decodes the wait status when the process goes away.
//!
//! # Lifecycle
//!
//! - `start` creates the destination directory, attaches the progress slot
//!   and spawns the process; any launch failure is reported, never
//!   swallowed.
//! - `AgentHandle::wait` blocks until the child terminates;
//!   `AgentHandle::terminate` escalates SIGTERM → SIGKILL and reaps.
//! - `AgentHandle::finish` drains the reader task and releases the
//!   progress slot. The slot is also released if the handle is dropped on
//!   an error path.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

use wimc_core::job::ProgressStats;

use crate::command::LaunchPlan;
use crate::error::AgentError;
use crate::progress::{ProgressChannelRegistry, ProgressReport, ProgressSlot};

/// How the agent process went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    /// Normal termination with exit code 0.
    Success,
    /// Exit code 127: the agent executable was not found.
    ExecNotFound,
    /// Normal termination with any other exit code.
    Exited {
        /// The raw exit code.
        code: i32,
    },
    /// Killed or stopped by a signal.
    Signaled {
        /// The signal number.
        signal: i32,
    },
}

impl AgentExit {
    /// Whether the agent completed its transfer.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Human-readable description for logs and error callbacks.
    #[must_use]
    pub fn describe(self) -> String {
        match self {
            Self::Success => "success".to_string(),
            Self::ExecNotFound => "agent executable not found".to_string(),
            Self::Exited { code } => format!("exit code {code}"),
            Self::Signaled { signal } => format!("terminated by signal {signal}"),
        }
    }
}

/// Supervises fetch-agent processes and their progress channels.
pub struct AgentSupervisor {
    registry: Arc<ProgressChannelRegistry>,
}

/// A running agent process with its attached progress slot.
#[derive(Debug)]
pub struct AgentHandle {
    job_id: Uuid,
    child: Child,
    reader: JoinHandle<()>,
    slot: ProgressSlot,
}

impl AgentSupervisor {
    /// Create a supervisor over a shared progress registry.
    #[must_use]
    pub const fn new(registry: Arc<ProgressChannelRegistry>) -> Self {
        Self { registry }
    }

    /// The progress registry this supervisor attaches slots in.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ProgressChannelRegistry> {
        &self.registry
    }

    /// Spawn the agent for a job.
    ///
    /// Creates the destination directory (idempotent), attaches the job's
    /// progress channel, and launches the executable with the plan's
    /// arguments. Spawn failures carry the captured launch error.
    pub async fn start(&self, plan: &LaunchPlan, job_id: Uuid) -> Result<AgentHandle, AgentError> {
        plan.ensure_dest()?;
        let slot = self.registry.attach(job_id)?;

        let mut child = Command::new(&plan.binary)
            .args(&plan.args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| AgentError::Spawn {
                binary: plan.binary.display().to_string(),
                message: e.to_string(),
            })?;

        tracing::info!(
            id = %job_id,
            binary = %plan.binary.display(),
            pid = ?child.id(),
            "agent spawned"
        );

        let reader = spawn_report_reader(&mut child, job_id, slot.subscribe_sender());

        Ok(AgentHandle {
            job_id,
            child,
            reader,
            slot,
        })
    }
}

impl AgentHandle {
    /// The job this agent is fetching for.
    #[must_use]
    pub const fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// OS pid of the agent, while it is running.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Subscribe to this job's progress. The receiver stays readable after
    /// the slot is released, holding the final stats.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<ProgressStats> {
        self.slot.subscribe()
    }

    /// Block until the agent process terminates.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Best-effort termination: SIGTERM, then SIGKILL, then reap.
    pub async fn terminate(&mut self) -> std::io::Result<ExitStatus> {
        tracing::info!(id = %self.job_id, pid = ?self.child.id(), "terminating agent");
        crate::shutdown::terminate_child(&mut self.child).await
    }

    /// Record the final status, drain the reader task and release the
    /// progress slot.
    pub async fn finish(mut self, status: ExitStatus) -> AgentExit {
        // Let the reader drain whatever output is still buffered; the pipe
        // is at EOF once the child is gone, so this is quick.
        if timeout(Duration::from_secs(1), &mut self.reader).await.is_err() {
            self.reader.abort();
        }

        let exit = decode_exit(self.job_id, status);
        self.slot.update(|stats| {
            stats.stopped = true;
            stats.exit_status = status.code();
        });
        exit
        // self.slot drops here, detaching the registry entry
    }
}

/// Read JSON progress reports from the agent's stdout and feed the channel;
/// mirror stderr into the daemon log.
fn spawn_report_reader(
    child: &mut Child,
    job_id: Uuid,
    tx: watch::Sender<ProgressStats>,
) -> JoinHandle<()> {
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(text)) = lines.next_line().await {
                tracing::debug!(id = %job_id, "agent: {text}");
            }
        });
    }

    let stdout = child.stdout.take();
    tokio::spawn(async move {
        let Some(stdout) = stdout else { return };
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(text)) = lines.next_line().await {
            match serde_json::from_str::<ProgressReport>(&text) {
                Ok(report) => crate::progress::feed(&tx, &report),
                Err(e) => {
                    tracing::debug!(id = %job_id, error = %e, line = %text,
                                    "unparseable agent progress line");
                }
            }
        }
        tracing::debug!(id = %job_id, "agent stdout reader exiting");
    })
}

/// Decode a wait status into an `AgentExit`, logging every outcome.
fn decode_exit(job_id: Uuid, status: ExitStatus) -> AgentExit {
    if let Some(code) = status.code() {
        return match code {
            0 => {
                tracing::info!(id = %job_id, "agent exited cleanly");
                AgentExit::Success
            }
            127 => {
                tracing::error!(id = %job_id, "agent executable not found");
                AgentExit::ExecNotFound
            }
            code => {
                tracing::warn!(id = %job_id, code, "agent exited non-zero");
                AgentExit::Exited { code }
            }
        };
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            tracing::warn!(id = %job_id, signal, "agent killed by signal");
            return AgentExit::Signaled { signal };
        }
        if let Some(signal) = status.stopped_signal() {
            tracing::warn!(id = %job_id, signal, "agent stopped by signal");
            return AgentExit::Signaled { signal };
        }
        if status.continued() {
            tracing::warn!(id = %job_id, "agent continued without terminating");
        }
    }

    tracing::warn!(id = %job_id, "agent wait status undecodable");
    AgentExit::Exited { code: -1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shell_plan(dir: &std::path::Path, script: &str) -> LaunchPlan {
        LaunchPlan {
            binary: PathBuf::from("sh"),
            dest_dir: dir.join("dest"),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn supervisor() -> AgentSupervisor {
        AgentSupervisor::new(Arc::new(ProgressChannelRegistry::new()))
    }

    #[tokio::test]
    async fn clean_exit_maps_to_success() {
        let tmp = tempfile::tempdir().unwrap();
        let supervisor = supervisor();
        let plan = shell_plan(tmp.path(), "exit 0");

        let mut handle = supervisor.start(&plan, Uuid::new_v4()).await.unwrap();
        let status = handle.wait().await.unwrap();
        assert!(handle.finish(status).await.is_success());
        assert!(supervisor.registry().is_empty());
    }

    #[tokio::test]
    async fn exit_127_maps_to_exec_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let supervisor = supervisor();
        let plan = shell_plan(tmp.path(), "exit 127");

        let mut handle = supervisor.start(&plan, Uuid::new_v4()).await.unwrap();
        let status = handle.wait().await.unwrap();
        assert_eq!(handle.finish(status).await, AgentExit::ExecNotFound);
    }

    #[tokio::test]
    async fn nonzero_exit_preserves_code() {
        let tmp = tempfile::tempdir().unwrap();
        let supervisor = supervisor();
        let plan = shell_plan(tmp.path(), "exit 3");

        let mut handle = supervisor.start(&plan, Uuid::new_v4()).await.unwrap();
        let status = handle.wait().await.unwrap();
        let exit = handle.finish(status).await;
        assert_eq!(exit, AgentExit::Exited { code: 3 });
        assert_eq!(exit.describe(), "exit code 3");
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let supervisor = supervisor();
        let plan = LaunchPlan {
            binary: PathBuf::from("/nonexistent/wimc-agent"),
            dest_dir: tmp.path().join("dest"),
            args: vec![],
        };

        let err = supervisor.start(&plan, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AgentError::Spawn { .. }));
        // Spawn failure must release the slot for the next attempt
        assert!(supervisor.registry().is_empty());
    }

    #[tokio::test]
    async fn progress_reports_flow_through_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let supervisor = supervisor();
        let script = r#"echo '{"total_bytes": 2048, "remote_bytes": 1024, "state": "running"}'; \
                        echo '{"state": "done"}'"#;
        let plan = shell_plan(tmp.path(), script);

        let mut handle = supervisor.start(&plan, Uuid::new_v4()).await.unwrap();
        let rx = handle.progress();
        let status = handle.wait().await.unwrap();
        let exit = handle.finish(status).await;

        assert!(exit.is_success());
        let stats = rx.borrow().clone();
        assert_eq!(stats.total_bytes.get(), Some(2048));
        assert_eq!(stats.remote_bytes.get(), Some(1024));
        assert!(stats.stopped);
        assert_eq!(stats.exit_status, Some(0));
        assert_eq!(stats.state, wimc_core::job::TransferState::Done);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn terminate_signals_a_hanging_agent() {
        let tmp = tempfile::tempdir().unwrap();
        let supervisor = supervisor();
        let plan = shell_plan(tmp.path(), "sleep 30");

        let mut handle = supervisor.start(&plan, Uuid::new_v4()).await.unwrap();
        let status = handle.terminate().await.unwrap();
        let exit = handle.finish(status).await;
        assert!(matches!(exit, AgentExit::Signaled { .. }));
        assert!(supervisor.registry().is_empty());
    }
}
