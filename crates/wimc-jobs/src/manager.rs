//! Job manager: the fetch-job state machine and central coordinator.
//!
//! # Architecture
//!
//! - `submit` validates synchronously and registers the job; everything
//!   that can block (catalog resolution, spawn, wait) runs in a per-job
//!   supervising task so an unresponsive hub or callback endpoint never
//!   stalls other jobs.
//! - Each job's mutable record lives behind its own lock; `status` and
//!   `cancel` touch that lock briefly and never wait on job work.
//! - At most one job is active per (name, tag): duplicates are rejected at
//!   submit time, before anything is spawned.
//! - Terminal transitions push one final callback unconditionally, then
//!   close the job's delivery queue. Completed records stay queryable for
//!   a retention grace period and are swept afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use wimc_agent::{
    AgentError, AgentExit, AgentSupervisor, LaunchPlan, ProgressChannelRegistry,
};
use wimc_core::ArtifactDescriptor;
use wimc_core::contracts::UpdateEnvelope;
use wimc_core::job::{
    FetchRequest, JobSnapshot, JobState, ProgressStats, RequestType, TransferMethod, WimcError,
};
use wimc_core::ports::ContentResolverPort;
use wimc_core::settings::Settings;

use crate::notifier::{CallbackNotifier, DeliveryQueue};
use crate::registry::AgentRegistry;

/// Tunables for the job manager.
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Root directory for per-job artifact destinations.
    pub store_path: std::path::PathBuf,
    /// Path to the fetch-agent executable.
    pub agent_binary: std::path::PathBuf,
    /// Grace period completed jobs stay queryable before eviction.
    pub job_retention: Duration,
}

impl JobManagerConfig {
    /// Create a config with the default retention.
    pub fn new(
        store_path: impl Into<std::path::PathBuf>,
        agent_binary: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            store_path: store_path.into(),
            agent_binary: agent_binary.into(),
            job_retention: wimc_core::settings::DEFAULT_JOB_RETENTION,
        }
    }

    /// Set the completed-job retention period.
    #[must_use]
    pub const fn with_retention(mut self, retention: Duration) -> Self {
        self.job_retention = retention;
        self
    }

    /// Derive the manager config from daemon settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            store_path: settings.store_path.clone(),
            agent_binary: settings.agent_binary.clone(),
            job_retention: settings.job_retention,
        }
    }
}

/// Mutable per-job record. Touched only under its cell's lock.
#[derive(Debug)]
struct JobEntry {
    name: String,
    tag: String,
    method: TransferMethod,
    callback_url: String,
    interval: u64,
    state: JobState,
    stats: ProgressStats,
    artifact: Option<ArtifactDescriptor>,
    completed_at: Option<Instant>,
}

/// One job's shared state: the record plus its cancellation token.
#[derive(Debug)]
struct JobCell {
    id: Uuid,
    entry: Mutex<JobEntry>,
    cancel: CancellationToken,
}

/// How the supervising task's main loop ended.
enum Outcome {
    /// The agent process went away on its own.
    Exited(AgentExit),
    /// Cancellation was requested and the agent was terminated.
    Cancelled,
    /// The wait itself failed; the agent's fate is unknown.
    WaitFailed(String),
}

/// The state machine and central coordinator for fetch jobs.
pub struct JobManager {
    resolver: Arc<dyn ContentResolverPort>,
    agents: Arc<AgentRegistry>,
    notifier: Arc<CallbackNotifier>,
    supervisor: AgentSupervisor,
    config: JobManagerConfig,
    /// All known jobs, including recently completed ones.
    jobs: RwLock<HashMap<Uuid, Arc<JobCell>>>,
    /// Active (name, tag) pairs, for duplicate-fetch rejection.
    in_flight: Mutex<HashMap<(String, String), Uuid>>,
}

impl JobManager {
    /// Create a job manager wired to its collaborators.
    pub fn new(
        resolver: Arc<dyn ContentResolverPort>,
        agents: Arc<AgentRegistry>,
        notifier: Arc<CallbackNotifier>,
        progress: Arc<ProgressChannelRegistry>,
        config: JobManagerConfig,
    ) -> Self {
        Self {
            resolver,
            agents,
            notifier,
            supervisor: AgentSupervisor::new(progress),
            config,
            jobs: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one inbound request.
    ///
    /// Validation errors surface here, synchronously. For Fetch the
    /// returned id refers to a job that is now Pending; resolution and
    /// dispatch continue in the background and their failures arrive via
    /// the callback URL.
    pub fn submit(self: &Arc<Self>, request: FetchRequest) -> Result<Uuid, WimcError> {
        request.validate()?;

        match request.request_type {
            RequestType::Fetch => self.submit_fetch(request),
            RequestType::Update => {
                self.push_status(request.id)?;
                Ok(request.id)
            }
            RequestType::Cancel => {
                self.cancel(request.id)?;
                Ok(request.id)
            }
        }
    }

    /// Best-effort cancel. Advisory for Running jobs; a no-op success once
    /// the job is already terminal.
    pub fn cancel(&self, id: Uuid) -> Result<(), WimcError> {
        let cell = self.job_cell(id).ok_or_else(|| WimcError::unknown_job(id))?;

        let terminal = {
            let entry = cell.entry.lock().expect("job entry poisoned");
            entry.state.is_terminal()
        };
        if terminal {
            return Ok(());
        }

        tracing::info!(id = %id, "cancel requested");
        cell.cancel.cancel();
        Ok(())
    }

    /// Read-only snapshot of a job, including recently completed ones.
    #[must_use]
    pub fn status(&self, id: Uuid) -> Option<JobSnapshot> {
        self.job_cell(id).map(|cell| {
            let entry = cell.entry.lock().expect("job entry poisoned");
            JobSnapshot {
                id,
                name: entry.name.clone(),
                tag: entry.tag.clone(),
                state: entry.state,
                stats: entry.stats.clone(),
            }
        })
    }

    /// Evict terminal jobs older than the retention period. Returns how
    /// many were removed.
    pub fn evict_expired(&self) -> usize {
        let retention = self.config.job_retention;
        let mut jobs = self.jobs.write().expect("jobs map poisoned");
        let before = jobs.len();
        jobs.retain(|id, cell| {
            let entry = cell.entry.lock().expect("job entry poisoned");
            match entry.completed_at {
                Some(done) if done.elapsed() >= retention => {
                    tracing::debug!(id = %id, "evicting completed job");
                    false
                }
                _ => true,
            }
        });
        before - jobs.len()
    }

    /// Spawn the periodic retention sweeper.
    pub fn spawn_retention_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let period = std::cmp::max(
                manager.config.job_retention / 4,
                Duration::from_secs(5),
            );
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                let evicted = manager.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, "retention sweep");
                }
            }
        })
    }

    /// Number of jobs currently tracked (active + retained).
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.read().expect("jobs map poisoned").len()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Fetch lifecycle
    // ─────────────────────────────────────────────────────────────────────

    fn submit_fetch(self: &Arc<Self>, request: FetchRequest) -> Result<Uuid, WimcError> {
        let Some(content) = request.content else {
            return Err(WimcError::missing_field("content"));
        };
        let Some(callback_url) = request.callback_url else {
            return Err(WimcError::missing_field("callback_url"));
        };

        let id = if request.id.is_nil() {
            Uuid::new_v4()
        } else {
            request.id
        };
        let key = (content.name.clone(), content.tag.clone());

        // Claim the (name, tag) pair before anything is spawned so a
        // duplicate request can never race a second agent into existence.
        {
            let mut in_flight = self.in_flight.lock().expect("in-flight map poisoned");
            if in_flight.contains_key(&key) {
                return Err(WimcError::already_in_progress(&content.name, &content.tag));
            }

            let mut jobs = self.jobs.write().expect("jobs map poisoned");
            if let Some(existing) = jobs.get(&id) {
                let entry = existing.entry.lock().expect("job entry poisoned");
                if !entry.state.is_terminal() {
                    return Err(WimcError::already_in_progress(&entry.name, &entry.tag));
                }
                drop(entry);
                // A retained terminal record under the same id gives way
                jobs.remove(&id);
            }

            in_flight.insert(key, id);
            jobs.insert(
                id,
                Arc::new(JobCell {
                    id,
                    entry: Mutex::new(JobEntry {
                        name: content.name.clone(),
                        tag: content.tag.clone(),
                        method: content.method,
                        callback_url,
                        interval: request.update_interval,
                        state: JobState::Pending,
                        stats: ProgressStats::default(),
                        artifact: None,
                        completed_at: None,
                    }),
                    cancel: CancellationToken::new(),
                }),
            );
        }

        tracing::info!(
            id = %id,
            name = %content.name,
            tag = %content.tag,
            method = %content.method,
            "fetch job accepted"
        );

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.run_job(id).await;
        });

        Ok(id)
    }

    /// The per-job supervising task: resolve, dispatch, watch, finalize.
    async fn run_job(self: Arc<Self>, id: Uuid) {
        let Some(cell) = self.job_cell(id) else {
            return;
        };
        let (name, tag, method, callback_url, interval) = {
            let entry = cell.entry.lock().expect("job entry poisoned");
            (
                entry.name.clone(),
                entry.tag.clone(),
                entry.method,
                entry.callback_url.clone(),
                entry.interval,
            )
        };

        let delivery = self.notifier.spawn_delivery(callback_url);

        // Resolve against the hub. Off every manager lock; an unresponsive
        // catalog stalls only this job.
        let artifact = match self.resolver.resolve(&name, &tag, method).await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(id = %id, name = %name, tag = %tag, error = %e, "resolution failed");
                self.finish_job(&cell, JobState::Error, Some(e.to_string()), delivery)
                    .await;
                return;
            }
        };
        {
            let mut entry = cell.entry.lock().expect("job entry poisoned");
            entry.artifact = Some(artifact.clone());
        }

        // An agent must be registered for this method before we dispatch.
        let Some(agent) = self.agents.lookup(method) else {
            tracing::warn!(id = %id, %method, "no registered agent for method");
            self.finish_job(
                &cell,
                JobState::Error,
                Some(format!("no registered agent for {method} transfer")),
                delivery,
            )
            .await;
            return;
        };
        tracing::debug!(id = %id, agent = %agent.id, url = %agent.callback_url, "dispatching fetch");

        let Some(format) = artifact.format_for(method) else {
            self.finish_job(
                &cell,
                JobState::Error,
                Some(WimcError::not_found(&name, &tag).to_string()),
                delivery,
            )
            .await;
            return;
        };

        let plan = match LaunchPlan::build(
            &self.config.agent_binary,
            &self.config.store_path,
            id,
            &name,
            &tag,
            format,
            interval,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                let err = map_agent_error(e);
                tracing::warn!(id = %id, error = %err, "launch planning failed");
                self.finish_job(&cell, JobState::Error, Some(err.to_string()), delivery)
                    .await;
                return;
            }
        };

        let mut handle = match self.supervisor.start(&plan, id).await {
            Ok(handle) => handle,
            Err(e) => {
                let err = map_agent_error(e);
                tracing::error!(id = %id, error = %err, "agent launch failed");
                self.finish_job(&cell, JobState::Error, Some(err.to_string()), delivery)
                    .await;
                return;
            }
        };

        {
            let mut entry = cell.entry.lock().expect("job entry poisoned");
            entry.state = JobState::Running;
        }

        let progress = handle.progress();
        let mut tick = tokio::time::interval(Duration::from_secs(interval.max(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Watch the process, sample progress on the caller's interval.
        // Child::wait is cancel-safe, so re-polling it each iteration is
        // sound.
        let waited = loop {
            tokio::select! {
                biased;

                () = cell.cancel.cancelled() => break None,

                status = handle.wait() => break Some(status),

                _ = tick.tick() => {
                    let stats = progress.borrow().clone();
                    {
                        let mut entry = cell.entry.lock().expect("job entry poisoned");
                        entry.stats = stats.clone();
                    }
                    delivery.push(UpdateEnvelope::from_stats(id, &stats));
                }
            }
        };

        let outcome = match waited {
            Some(Ok(status)) => Outcome::Exited(handle.finish(status).await),
            Some(Err(e)) => Outcome::WaitFailed(e.to_string()),
            None => match handle.terminate().await {
                Ok(status) => {
                    handle.finish(status).await;
                    Outcome::Cancelled
                }
                Err(e) => Outcome::WaitFailed(e.to_string()),
            },
        };

        // Carry the agent's last reported counters into the final record.
        {
            let mut entry = cell.entry.lock().expect("job entry poisoned");
            entry.stats = progress.borrow().clone();
        }

        let (state, reason) = match outcome {
            Outcome::Exited(AgentExit::Success) => (JobState::Done, None),
            Outcome::Exited(exit) => (
                JobState::Error,
                Some(WimcError::execution_error(exit.describe()).to_string()),
            ),
            Outcome::Cancelled => (JobState::Error, Some("fetch cancelled".to_string())),
            Outcome::WaitFailed(message) => (JobState::Error, Some(message)),
        };

        self.finish_job(&cell, state, reason, delivery).await;
    }

    /// Record the terminal state, release the (name, tag) claim, and push
    /// the one unconditional final callback.
    async fn finish_job(
        &self,
        cell: &JobCell,
        state: JobState,
        reason: Option<String>,
        delivery: DeliveryQueue,
    ) {
        let envelope = {
            let mut entry = cell.entry.lock().expect("job entry poisoned");
            entry.state = state;
            entry.stats.state = state.into();
            if let Some(reason) = &reason {
                entry.stats.message = Some(reason.clone());
            }
            entry.completed_at = Some(Instant::now());
            UpdateEnvelope::from_stats(cell.id, &entry.stats)
        };

        self.release_in_flight(cell);

        delivery.push(envelope);
        delivery.close().await;

        tracing::info!(id = %cell.id, state = ?state, reason = ?reason, "job finished");
    }

    /// Deliver the current status of a job out-of-band (Update requests).
    fn push_status(&self, id: Uuid) -> Result<(), WimcError> {
        let cell = self.job_cell(id).ok_or_else(|| WimcError::unknown_job(id))?;
        let (callback_url, envelope) = {
            let entry = cell.entry.lock().expect("job entry poisoned");
            (
                entry.callback_url.clone(),
                UpdateEnvelope::from_stats(id, &entry.stats),
            )
        };

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&callback_url, &envelope).await {
                tracing::warn!(id = %id, error = %e, "status callback dropped");
            }
        });
        Ok(())
    }

    fn job_cell(&self, id: Uuid) -> Option<Arc<JobCell>> {
        self.jobs
            .read()
            .expect("jobs map poisoned")
            .get(&id)
            .cloned()
    }

    fn release_in_flight(&self, cell: &JobCell) {
        let key = {
            let entry = cell.entry.lock().expect("job entry poisoned");
            (entry.name.clone(), entry.tag.clone())
        };
        let mut in_flight = self.in_flight.lock().expect("in-flight map poisoned");
        if in_flight.get(&key) == Some(&cell.id) {
            in_flight.remove(&key);
        }
    }
}

/// Map supervision errors into the core taxonomy.
fn map_agent_error(e: AgentError) -> WimcError {
    match e {
        AgentError::MissingContentUrls { method } => WimcError::missing_content_urls(method),
        AgentError::Spawn { message, .. } => WimcError::spawn_failure(message),
        AgentError::Destination { path, message } => {
            WimcError::spawn_failure(format!("{path}: {message}"))
        }
        AgentError::SlotBusy { id } => {
            WimcError::internal(format!("progress slot busy for job {id}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::testing::RecordingTransport;
    use async_trait::async_trait;
    use chrono::Utc;
    use wimc_core::job::{FetchContent, TransferState};
    use wimc_core::{ArtifactFormat, ports::ContentResolverPort};

    /// Resolver answering from a fixed catalog of (name, tag) pairs.
    struct FakeResolver {
        tags: Vec<String>,
    }

    impl FakeResolver {
        fn with_tags(tags: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                tags: tags.iter().map(ToString::to_string).collect(),
            })
        }
    }

    #[async_trait]
    impl ContentResolverPort for FakeResolver {
        async fn resolve(
            &self,
            name: &str,
            tag: &str,
            method: TransferMethod,
        ) -> Result<ArtifactDescriptor, WimcError> {
            if !self.tags.iter().any(|t| t == tag) {
                return Err(WimcError::not_found(name, tag));
            }
            Ok(ArtifactDescriptor {
                name: name.to_string(),
                version: tag.to_string(),
                formats: vec![ArtifactFormat {
                    method,
                    url: "http://hub/artifact".to_string(),
                    extra_info: (method == TransferMethod::Chunk)
                        .then(|| "http://hub/store".to_string()),
                    size_bytes: (method == TransferMethod::WholeFile).then_some(1024),
                    created_at: Utc::now(),
                }],
            })
        }
    }

    struct Fixture {
        manager: Arc<JobManager>,
        transport: Arc<RecordingTransport>,
        _store: tempfile::TempDir,
    }

    fn fixture_with(resolver: Arc<FakeResolver>, agent_binary: &str) -> Fixture {
        let store = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new();
        let notifier = Arc::new(
            CallbackNotifier::new(transport.clone(), 1)
                .with_retry_delay(Duration::from_millis(1)),
        );
        let agents = Arc::new(AgentRegistry::new());
        agents.register(Uuid::new_v4(), TransferMethod::WholeFile, "http://agent/cb");
        agents.register(Uuid::new_v4(), TransferMethod::Chunk, "http://agent/cb");

        let manager = Arc::new(JobManager::new(
            resolver,
            agents,
            notifier,
            Arc::new(ProgressChannelRegistry::new()),
            JobManagerConfig::new(store.path(), agent_binary),
        ));

        Fixture {
            manager,
            transport,
            _store: store,
        }
    }

    fn fetch_request(name: &str, tag: &str) -> FetchRequest {
        FetchRequest::fetch(
            Uuid::new_v4(),
            FetchContent::whole_file(name, tag, "http://hub/artifact"),
            "http://caller/cb",
            1,
        )
    }

    /// Write an executable shell script the manager can launch as its agent.
    #[cfg(unix)]
    fn script_agent(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-agent.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 5s");
    }

    fn terminal_state(transport: &RecordingTransport) -> Option<UpdateEnvelope> {
        transport
            .envelopes()
            .into_iter()
            .find(|e| e.state().is_some_and(TransferState::is_terminal))
    }

    #[tokio::test]
    async fn successful_fetch_reaches_done() {
        let fixture = fixture_with(FakeResolver::with_tags(&["1.21"]), "true");

        let id = fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();

        wait_until(|| terminal_state(&fixture.transport).is_some()).await;

        let terminal = terminal_state(&fixture.transport).unwrap();
        assert_eq!(terminal.update.transfer_state, "done");
        assert!(terminal.update.void_str.is_none());

        let snapshot = fixture.manager.status(id).unwrap();
        assert_eq!(snapshot.state, JobState::Done);
        assert_eq!(snapshot.name, "nginx");
    }

    #[tokio::test]
    async fn unknown_tag_errors_asynchronously_with_no_matching_capp() {
        // Submission is accepted; the job fails during resolution and the
        // caller learns about it through the callback.
        let fixture = fixture_with(FakeResolver::with_tags(&["1.20"]), "true");

        let id = fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();

        wait_until(|| terminal_state(&fixture.transport).is_some()).await;

        let terminal = terminal_state(&fixture.transport).unwrap();
        assert_eq!(terminal.update.id, id);
        assert_eq!(terminal.update.transfer_state, "error");
        assert_eq!(terminal.update.void_str.as_deref(), Some("no matching capp"));

        assert_eq!(fixture.manager.status(id).unwrap().state, JobState::Error);
    }

    #[tokio::test]
    async fn missing_agent_binary_errors_with_reason() {
        let fixture = fixture_with(
            FakeResolver::with_tags(&["1.21"]),
            "/nonexistent/wimc-agent",
        );

        fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();

        wait_until(|| terminal_state(&fixture.transport).is_some()).await;

        let terminal = terminal_state(&fixture.transport).unwrap();
        assert_eq!(terminal.update.transfer_state, "error");
        let reason = terminal.update.void_str.unwrap();
        assert!(!reason.is_empty());
        assert!(reason.contains("agent spawn failed"), "got: {reason}");
    }

    #[tokio::test]
    async fn nonzero_agent_exit_errors_with_code() {
        let fixture = fixture_with(FakeResolver::with_tags(&["1.21"]), "false");

        fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();

        wait_until(|| terminal_state(&fixture.transport).is_some()).await;

        let reason = terminal_state(&fixture.transport)
            .unwrap()
            .update
            .void_str
            .unwrap();
        assert!(reason.contains("exit code 1"), "got: {reason}");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn duplicate_fetch_for_same_name_tag_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = script_agent(tmp.path(), "sleep 30");
        let fixture = fixture_with(
            FakeResolver::with_tags(&["1.21"]),
            agent.to_str().unwrap(),
        );

        let first = fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();

        let err = fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap_err();
        assert!(matches!(err, WimcError::AlreadyInProgress { .. }));

        // A different tag is an independent job
        fixture
            .manager
            .submit(fetch_request("nginx", "1.21-other"))
            .ok();

        fixture.manager.cancel(first).unwrap();
        wait_until(|| terminal_state(&fixture.transport).is_some()).await;
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn cancel_terminates_running_job() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = script_agent(tmp.path(), "sleep 30");
        let fixture = fixture_with(
            FakeResolver::with_tags(&["1.21"]),
            agent.to_str().unwrap(),
        );

        let id = fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();

        wait_until(|| {
            fixture
                .manager
                .status(id)
                .is_some_and(|s| s.state == JobState::Running)
        })
        .await;

        fixture.manager.cancel(id).unwrap();
        wait_until(|| terminal_state(&fixture.transport).is_some()).await;

        let terminal = terminal_state(&fixture.transport).unwrap();
        assert_eq!(terminal.update.transfer_state, "error");
        assert_eq!(terminal.update.void_str.as_deref(), Some("fetch cancelled"));

        // Cancel on a terminal job is a no-op success
        fixture.manager.cancel(id).unwrap();
    }

    #[tokio::test]
    async fn name_tag_pair_is_reusable_after_completion() {
        let fixture = fixture_with(FakeResolver::with_tags(&["1.21"]), "true");

        fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();
        wait_until(|| terminal_state(&fixture.transport).is_some()).await;

        // The first job is terminal; the pair is free again
        fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_unknown_job_is_an_error() {
        let fixture = fixture_with(FakeResolver::with_tags(&["1.21"]), "true");
        let err = fixture.manager.cancel(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, WimcError::UnknownJob { .. }));
    }

    #[tokio::test]
    async fn update_request_pushes_current_status() {
        let fixture = fixture_with(FakeResolver::with_tags(&["1.21"]), "true");

        let id = fixture
            .manager
            .submit(fetch_request("nginx", "1.21"))
            .unwrap();
        wait_until(|| terminal_state(&fixture.transport).is_some()).await;

        let before = fixture.transport.envelopes().len();
        fixture.manager.submit(FetchRequest::update(id)).unwrap();
        wait_until(|| fixture.transport.envelopes().len() > before).await;

        let last = fixture.transport.envelopes().pop().unwrap();
        assert_eq!(last.update.id, id);
        assert_eq!(last.update.transfer_state, "done");
    }

    #[tokio::test]
    async fn retention_sweep_evicts_completed_jobs() {
        let fixture = fixture_with(FakeResolver::with_tags(&["1.21"]), "true");
        let manager = Arc::new(JobManager::new(
            FakeResolver::with_tags(&["1.21"]),
            Arc::new(AgentRegistry::new()),
            Arc::new(CallbackNotifier::new(fixture.transport.clone(), 1)),
            Arc::new(ProgressChannelRegistry::new()),
            JobManagerConfig::new(fixture._store.path(), "true")
                .with_retention(Duration::from_millis(0)),
        ));

        // No agent registered: the job fails fast, which is all the sweep
        // needs.
        let id = manager.submit(fetch_request("nginx", "1.21")).unwrap();
        wait_until(|| {
            manager
                .status(id)
                .is_some_and(|s| s.state.is_terminal())
        })
        .await;

        assert_eq!(manager.job_count(), 1);
        assert_eq!(manager.evict_expired(), 1);
        assert_eq!(manager.job_count(), 0);
        assert!(manager.status(id).is_none());
    }

    #[tokio::test]
    async fn validation_errors_are_synchronous() {
        let fixture = fixture_with(FakeResolver::with_tags(&["1.21"]), "true");

        let mut request = fetch_request("nginx", "1.21");
        request.update_interval = 0;
        assert!(matches!(
            fixture.manager.submit(request),
            Err(WimcError::MissingField { .. })
        ));
        // Nothing was spawned and nothing will call back
        assert!(fixture.transport.envelopes().is_empty());
    }
}
