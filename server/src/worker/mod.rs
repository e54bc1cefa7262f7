mod config;
mod cycle;
mod messages;
mod state;
mod stdio;
mod storage;

pub use config::*;
pub use messages::*;
pub use state::*;
pub use stdio::*;
pub use storage::*;

use crate::cms::{AdapterFactory, FilesAdapterFactory, ModuleLoader, ScriptModuleLoader};
use crate::reload::HostSender;
use crate::server::ServeConfig;
use crate::site::{ChangeSet, FsSiteBuilder, SiteBuilder};
use cycle::{CycleWatch, ServingCycle};
use log::{debug, error, info, warn};
use lume_shared::LumeResult;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;

/// Collaborators a worker builds its cycles with.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub sites: Arc<dyn SiteBuilder>,
    pub modules: Arc<dyn ModuleLoader>,
    pub adapters: Arc<dyn AdapterFactory>,
}

impl WorkerContext {
    pub fn new(
        config: WorkerConfig,
        sites: Arc<dyn SiteBuilder>,
        modules: Arc<dyn ModuleLoader>,
        adapters: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            config,
            sites,
            modules,
            adapters,
        }
    }

    /// Filesystem site builder with the built-in file CMS.
    pub fn files(config: WorkerConfig) -> Self {
        Self::new(
            config,
            Arc::new(FsSiteBuilder::new()),
            Arc::new(ScriptModuleLoader::files()),
            Arc::new(FilesAdapterFactory),
        )
    }
}

/// What is left running between commands.
#[derive(Default)]
struct Cycles {
    serving: Option<ServingCycle>,
    /// Watch side of the last serving cycle, kept while a rebuild fails.
    standby: Option<CycleWatch>,
}

/// Runs build commands from the host, one serve cycle at a time.
pub struct Worker {
    ctx: WorkerContext,
    host: HostSender,
    state: Mutex<BuildState>,
    cycles: tokio::sync::Mutex<Cycles>,
    storage: Arc<LocalStorage>,
}

impl Worker {
    pub fn new(ctx: WorkerContext, host: HostSender) -> Self {
        Self {
            ctx,
            host,
            state: Mutex::new(BuildState::default()),
            cycles: tokio::sync::Mutex::new(Cycles::default()),
            storage: Arc::new(LocalStorage::new()),
        }
    }

    #[inline(always)]
    pub fn config(&self) -> &WorkerConfig {
        &self.ctx.config
    }

    pub fn state(&self) -> BuildState {
        *self.state.lock()
    }

    pub fn storage(&self) -> Arc<LocalStorage> {
        Arc::clone(&self.storage)
    }

    /// Handles one message from the host.
    pub async fn handle(&self, message: WorkerMessage) -> LumeResult {
        match message {
            WorkerMessage::Build { config } => self.build(BuildRequest::new(config, true)).await,
            WorkerMessage::Rebuild { config } => {
                self.build(BuildRequest::new(config, false)).await
            }
            WorkerMessage::LocalStorage { data } => {
                self.storage.init(&data);
                debug!(target: "worker", "localStorage initialized with {} item(s)", self.storage.len());
                Ok(())
            }
        }
    }

    /// Replaces the running cycle, if any, with a new one.
    ///
    /// Commands wait for each other; the previous server is stopped before
    /// the next one binds. Its watch side keeps running until a new cycle
    /// serves, so a failed rebuild is retried on the next config change.
    pub async fn build(&self, request: BuildRequest) -> LumeResult {
        let mut cycles = self.cycles.lock().await;
        self.transition(BuildEvent::Command);

        if let Some(previous) = cycles.serving.take() {
            let watch = previous.stop_server(self.ctx.config.shutdown_timeout).await;
            cycles.standby = Some(watch);
        }

        match ServingCycle::start(&self.ctx, request, self.host.clone()).await {
            Ok(next) => {
                info!(target: "worker", "Serving CMS at {}", next.config().url());
                cycles.standby = None;
                cycles.serving = Some(next);
                self.transition(BuildEvent::Bound);
                Ok(())
            }
            Err(e) => {
                self.transition(BuildEvent::Failed);
                if e.is_cycle_fatal() {
                    error!(target: "worker", "Build failed: {}", e);
                } else {
                    warn!(target: "worker", "Build failed: {}", e);
                }
                if cycles.standby.is_some() {
                    info!(target: "worker", "Waiting for config changes to retry");
                }
                Err(e)
            }
        }
    }

    /// Address of the running server.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.cycles.lock().await.serving.as_ref().map(|c| c.local_addr())
    }

    pub async fn serve_config(&self) -> Option<ServeConfig> {
        self.cycles.lock().await.serving.as_ref().map(|c| c.config().clone())
    }

    /// Publishes `files` to the current site's update stream, as its watcher
    /// would. Returns the number of subscribers reached.
    pub async fn dispatch_changes(&self, files: ChangeSet) -> usize {
        let cycles = self.cycles.lock().await;
        match (&cycles.serving, &cycles.standby) {
            (Some(cycle), _) => cycle.dispatch_changes(files),
            (None, Some(watch)) => watch.dispatch_changes(files),
            (None, None) => 0,
        }
    }

    /// Stops the running cycle, if any.
    pub async fn shutdown(&self) {
        let mut cycles = self.cycles.lock().await;
        cycles.standby = None;
        if let Some(cycle) = cycles.serving.take() {
            cycle.shutdown(self.ctx.config.shutdown_timeout).await;
        }
    }

    fn transition(&self, event: BuildEvent) {
        let mut state = self.state.lock();
        match state.next(event) {
            Some(next) => {
                debug!(target: "worker", "{:?} -> {:?}", *state, next);
                *state = next;
            }
            None => warn!(target: "worker", "Ignoring {:?} while {:?}", event, *state),
        }
    }
}
