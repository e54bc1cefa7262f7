use crate::cms::CMS_CONFIG_CANDIDATES;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Project root, searched for the CMS config file.
    pub root: PathBuf,
    /// CMS config file names, in lookup order.
    pub cms_candidates: Vec<String>,
    /// Capacity of the worker → host message channel.
    pub host_capacity: usize,
    /// How long a finished cycle may take to drain before it is aborted.
    pub shutdown_timeout: Duration,
}

impl WorkerConfig {
    /// Creates a new `WorkerConfig` with default values:
    /// root: `.`, candidates: `_cms.ts`, `_cms.js`.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
            cms_candidates: CMS_CONFIG_CANDIDATES.iter().map(|c| c.to_string()).collect(),
            host_capacity: 16,
            shutdown_timeout: Duration::from_secs(2),
        }
    }

    /// Returns a new `WorkerConfig` with the specified root directory.
    #[must_use]
    #[inline(always)]
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = root;
        self
    }

    #[must_use]
    #[inline(always)]
    pub fn with_cms_candidates(mut self, candidates: Vec<String>) -> Self {
        self.cms_candidates = candidates;
        self
    }

    #[must_use]
    #[inline(always)]
    pub fn with_host_capacity(mut self, capacity: usize) -> Self {
        self.host_capacity = capacity.max(1);
        self
    }

    #[must_use]
    #[inline(always)]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}
