use super::{HostSender, WatchedConfigPaths};
use crate::site::ChangeSet;
use log::{debug, info, warn};
use lume_shared::LumeResult;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Turns config-file changes into reload requests for the host.
///
/// The coordinator never restarts anything itself; replacing the server is
/// up to the host.
pub struct ReloadCoordinator {
    paths: WatchedConfigPaths,
    host: HostSender,
}

impl ReloadCoordinator {
    pub fn new(paths: WatchedConfigPaths, host: HostSender) -> Self {
        Self { paths, host }
    }

    /// Handles one change batch. Returns whether a reload was requested.
    pub async fn handle(&self, files: &ChangeSet) -> LumeResult<bool> {
        if !self.paths.must_reload(files) {
            return Ok(false);
        }

        info!(target: "cms", "Reloading the site...");
        self.host.reload().await?;
        Ok(true)
    }

    pub async fn run(self, mut updates: broadcast::Receiver<ChangeSet>) {
        loop {
            match updates.recv().await {
                Ok(files) => {
                    if let Err(e) = self.handle(&files).await {
                        warn!("Stopping reload coordinator: {}", e);
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Reload coordinator skipped {} change batch(es)", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("Site update stream closed");
                    return;
                }
            }
        }
    }

    pub fn spawn(self, updates: broadcast::Receiver<ChangeSet>) -> JoinHandle<()> {
        tokio::spawn(self.run(updates))
    }
}
