use serde::Deserialize;
use std::path::PathBuf;

/// Options a site is created with, as read from `_config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteOptions {
    pub server: ServerOptions,
    pub watcher: WatcherOptions,
}

/// Configuration for the server, including host and port settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// The TCP port on which the server will listen to.
    pub port: u16,
    /// The IP address or hostname where the server will bind.
    pub hostname: String,
    /// Whether to open the browser once the server is listening.
    pub open: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "localhost".to_string(),
            open: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherOptions {
    /// Extra files or directories to watch, relative to the site root.
    pub include: Vec<PathBuf>,
    /// Paths excluded from change batches, relative to the site root.
    pub ignore: Vec<PathBuf>,
    /// Debounce window in milliseconds.
    pub debounce: u64,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            ignore: vec![PathBuf::from("_site"), PathBuf::from(".git")],
            debounce: 100,
        }
    }
}
