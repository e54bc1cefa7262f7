use crate::site::ServerOptions;

/// Snapshot of the server settings for one serve cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    /// The TCP port on which the server will listen to.
    pub port: u16,
    /// The IP address or hostname where the server will bind.
    pub hostname: String,
    /// URL prefix of the CMS.
    pub base_path: String,
    /// Open the browser after the first start.
    pub auto_open: bool,
}

impl ServeConfig {
    /// Takes the snapshot from the site's server options and the CMS base path.
    pub fn snapshot(options: &ServerOptions, base_path: &str) -> Self {
        Self {
            port: options.port,
            hostname: options.hostname.clone(),
            base_path: base_path.to_string(),
            auto_open: options.open,
        }
    }

    /// Returns a new `ServeConfig` with the specified port.
    #[must_use]
    #[inline(always)]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the full address in the format `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// URL of the CMS on this server.
    pub fn url(&self) -> String {
        self.url_for(&self.hostname)
    }

    /// URL of the CMS when reached through `host` instead of the bind hostname.
    pub fn url_for(&self, host: &str) -> String {
        format!("http://{}:{}{}", host, self.port, self.base_path)
    }
}
