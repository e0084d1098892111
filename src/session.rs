// src/session.rs

//! Development session: initial build, watching, serving.
//!
//! [`Orchestrator::start`] wires the runtime, executor, change notifier and
//! preview server together and returns a [`BuildSession`] that owns them
//! until [`BuildSession::stop`] (or drop).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::{BuildSummary, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::{AssetwatchError, Result};
use crate::exec::ExecutorBackend;
use crate::reload::{NoopReload, ReloadSignal, ServerHandle};
use crate::rules::{ChainTable, TaskRegistry};
use crate::scheduler::Scheduler;
use crate::watch::{ChangeNotifier, WatchHandle};

/// Capacity of the runtime event channel.
pub const RUNTIME_CHANNEL_CAPACITY: usize = 256;

pub struct Orchestrator<N: ChangeNotifier> {
    registry: Arc<TaskRegistry>,
    chains: ChainTable,
    root: PathBuf,
    notifier: N,
    reload: Arc<dyn ReloadSignal>,
    server: Option<ServerHandle>,
    initial_build: bool,
}

impl<N: ChangeNotifier> Orchestrator<N> {
    pub fn new(
        registry: Arc<TaskRegistry>,
        chains: ChainTable,
        root: impl Into<PathBuf>,
        notifier: N,
    ) -> Self {
        Self {
            registry,
            chains,
            root: root.into(),
            notifier,
            reload: Arc::new(NoopReload),
            server: None,
            initial_build: true,
        }
    }

    pub fn with_reload(mut self, reload: Arc<dyn ReloadSignal>) -> Self {
        self.reload = reload;
        self
    }

    /// Hand over a running preview server; the session releases it.
    pub fn with_server(mut self, server: Option<ServerHandle>) -> Self {
        self.server = server;
        self
    }

    pub fn initial_build(mut self, enabled: bool) -> Self {
        self.initial_build = enabled;
        self
    }

    /// Start the session.
    ///
    /// Runs the initial build to completion (task failures are logged, not
    /// fatal), then arms the change notifier. A notifier failure drains the
    /// runtime, releases the server and returns `StartupError`.
    pub async fn start<E, F>(self, make_executor: F) -> Result<BuildSession>
    where
        E: ExecutorBackend + 'static,
        F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
    {
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(RUNTIME_CHANNEL_CAPACITY);
        let executor = make_executor(tx.clone());

        let scheduler = Scheduler::new(Arc::clone(&self.registry), self.chains);
        let core = CoreRuntime::new(scheduler, RuntimeOptions::default());
        let (built_tx, built_rx) = oneshot::channel();
        let runtime = Runtime::new(core, rx, executor, self.reload).on_initial_build(built_tx);

        let mut session = BuildSession {
            events: tx.clone(),
            runtime: Some(tokio::spawn(runtime.run())),
            watch: WatchHandle::inert(),
            server: self.server,
        };

        if self.initial_build {
            session
                .events
                .send(RuntimeEvent::InitialBuildRequested)
                .await
                .map_err(|_| {
                    AssetwatchError::StartupError("runtime stopped before the initial build".into())
                })?;
            match built_rx.await {
                Ok(0) => {}
                Ok(failures) => warn!(failures, "initial build finished with failures"),
                Err(_) => {
                    let reason = match session.stop().await {
                        Err(e) => e.to_string(),
                        Ok(_) => "shut down".to_string(),
                    };
                    return Err(AssetwatchError::StartupError(format!(
                        "runtime stopped during the initial build: {reason}"
                    )));
                }
            }
        }

        match self.notifier.arm(&self.root, Arc::clone(&self.registry), tx) {
            Ok(watch) => session.watch = watch,
            Err(e) => {
                if let Err(stop_err) = session.stop().await {
                    warn!(error = %stop_err, "error while draining after watch failure");
                }
                return Err(AssetwatchError::StartupError(format!(
                    "arming change notifier: {e}"
                )));
            }
        }

        info!(root = ?self.root, tasks = self.registry.len(), "watching for changes");
        Ok(session)
    }
}

/// A running development session.
///
/// Owns the runtime task, the watch and the preview server. Dropping it
/// without [`stop`](Self::stop) still releases the watch and the server and
/// asks the runtime to drain.
pub struct BuildSession {
    events: mpsc::Sender<RuntimeEvent>,
    runtime: Option<JoinHandle<Result<BuildSummary>>>,
    watch: WatchHandle,
    server: Option<ServerHandle>,
}

impl BuildSession {
    /// Sender into the runtime; lets callers inject events.
    pub fn events(&self) -> mpsc::Sender<RuntimeEvent> {
        self.events.clone()
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(ServerHandle::addr)
    }

    /// Stop watching, drain in-flight work, then shut the server down.
    pub async fn stop(mut self) -> Result<BuildSummary> {
        self.watch.stop();
        // Err only means the runtime already exited.
        let _ = self.events.send(RuntimeEvent::ShutdownRequested).await;

        let summary = match self.runtime.take() {
            Some(handle) => join_runtime(handle.await),
            None => Ok(BuildSummary::default()),
        };

        if let Some(server) = self.server.take() {
            server.shutdown().await;
        }
        summary
    }

    /// Run until Ctrl-C, then [`stop`](Self::stop).
    pub async fn wait_for_ctrl_c(mut self) -> Result<BuildSummary> {
        let ended = match self.runtime.as_mut() {
            Some(runtime) => tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.map_err(|e| {
                        AssetwatchError::StartupError(format!("listening for Ctrl-C: {e}"))
                    })?;
                    None
                }
                joined = runtime => Some(joined),
            },
            None => None,
        };

        if let Some(joined) = ended {
            warn!("runtime stopped on its own");
            self.runtime = None;
            let summary = join_runtime(joined);
            self.watch.stop();
            if let Some(server) = self.server.take() {
                server.shutdown().await;
            }
            return summary;
        }

        info!("Ctrl-C received; shutting down");
        self.stop().await
    }
}

impl Drop for BuildSession {
    fn drop(&mut self) {
        self.watch.stop();
        if self.runtime.is_some() {
            let _ = self.events.try_send(RuntimeEvent::ShutdownRequested);
        }
    }
}

fn join_runtime(
    joined: std::result::Result<Result<BuildSummary>, tokio::task::JoinError>,
) -> Result<BuildSummary> {
    joined.map_err(|e| AssetwatchError::Other(anyhow!("runtime task failed: {e}")))?
}
