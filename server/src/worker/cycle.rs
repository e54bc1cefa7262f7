use super::{BuildRequest, WorkerContext};
use crate::cms::require_config_file;
use crate::net;
use crate::reload::{HostSender, ReloadCoordinator, WatchedConfigPaths};
use crate::server::{ServeConfig, Server};
use crate::site::{BuildFlags, ChangeSet, Site};
use crate::watcher::FileWatcher;
use log::{debug, error, info, warn};
use lume_shared::{LumeResult, canonicalize_with_strip};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// One build-and-serve cycle: a bound server plus the watch side that
/// reports config changes.
pub(crate) struct ServingCycle {
    watch: CycleWatch,
    config: ServeConfig,
    server: ServerTask,
}

/// Watch side of a cycle: the site, its file watcher and the reload
/// coordinator. Outlives the server when the next build fails, so a fix to
/// the config still reaches the host.
pub(crate) struct CycleWatch {
    site: Site,
    coordinator: JoinHandle<()>,
    _watcher: Option<FileWatcher>,
}

/// Server task of a cycle. Dropping it aborts the task.
struct ServerTask {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ServingCycle {
    /// Runs every fallible step before binding, so a failed cycle never
    /// leaves a half-initialized server behind.
    pub(crate) async fn start(
        ctx: &WorkerContext,
        request: BuildRequest,
        host: HostSender,
    ) -> LumeResult<Self> {
        let root = canonicalize_with_strip(&ctx.config.root)?;
        let cms_config = require_config_file(&root, &ctx.config.cms_candidates)?;
        debug!("Using CMS config {}", cms_config.display());

        let cms = ctx.modules.load(&cms_config).await?.into_default()?;

        let mut site = ctx
            .sites
            .create_site(&root, request.config.as_deref(), BuildFlags::cms())
            .await?;

        // Either config may live outside the recursively watched root.
        let site_config = site.config_file().to_path_buf();
        site.options.watcher.include.push(cms_config.clone());
        site.options.watcher.include.push(site_config);

        let adapter = ctx.adapters.adapt(&site, Arc::clone(&cms)).await?;

        let watched = WatchedConfigPaths::new(&cms_config, site.config_file(), site.root());
        let config = ServeConfig::snapshot(&site.options.server, &cms.options().base_path);

        let listener = Server::bind(&config).await?;
        let local_addr = listener.local_addr()?;
        let config = config.with_port(local_addr.port());

        let watcher = site.watch()?;
        let coordinator = ReloadCoordinator::new(watched, host.clone()).spawn(site.on_before_update());

        let server = Server::new(config.clone(), adapter, host);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = server.serve(listener, signal).await {
                error!(target: "server", "Server error: {}", e);
            }
        });

        if request.initial_startup {
            announce(&config);
        }

        Ok(Self {
            watch: CycleWatch {
                site,
                coordinator,
                _watcher: watcher,
            },
            config,
            server: ServerTask {
                local_addr,
                shutdown_tx: Some(shutdown_tx),
                handle,
            },
        })
    }

    #[inline(always)]
    pub(crate) fn config(&self) -> &ServeConfig {
        &self.config
    }

    #[inline(always)]
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.server.local_addr
    }

    pub(crate) fn dispatch_changes(&self, files: ChangeSet) -> usize {
        self.watch.dispatch_changes(files)
    }

    /// Stops the server and hands back the still running watch side.
    pub(crate) async fn stop_server(self, timeout: Duration) -> CycleWatch {
        self.server.stop(timeout).await;
        self.watch
    }

    pub(crate) async fn shutdown(self, timeout: Duration) {
        self.server.stop(timeout).await;
    }
}

impl CycleWatch {
    pub(crate) fn dispatch_changes(&self, files: ChangeSet) -> usize {
        self.site.dispatch_before_update(files)
    }
}

impl Drop for CycleWatch {
    fn drop(&mut self) {
        self.coordinator.abort();
    }
}

impl ServerTask {
    /// Stops accepting connections and waits up to `timeout` for in-flight
    /// requests before aborting the task.
    async fn stop(mut self, timeout: Duration) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if tokio::time::timeout(timeout, &mut self.handle).await.is_err() {
            warn!(target: "server", "Server did not stop within {:?}, aborting", timeout);
            self.handle.abort();
        }

        debug!("Stopped server on {}", self.local_addr);
    }
}

impl Drop for ServerTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn announce(config: &ServeConfig) {
    info!(target: "cms", "  CMS server started at:");
    info!(target: "cms", "  {} (local)", config.url());

    if let Some(ip) = net::local_ip() {
        info!(target: "cms", "  {} (network)", config.url_for(&ip.to_string()));
    }

    if config.auto_open {
        net::open_browser(&config.url());
    }
}
