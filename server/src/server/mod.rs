mod config;
mod proxy;
mod wait;

pub use config::*;
pub use wait::*;

use crate::cms::CmsAdapter;
use crate::reload::HostSender;
use axum::Router;
use log::debug;
use lume_shared::{LumeError, LumeResult};
use proxy::{ProxyState, proxy_handler};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// HTTP front of the CMS adapter for one serve cycle.
pub struct Server {
    config: ServeConfig,
    adapter: Arc<dyn CmsAdapter>,
    host: HostSender,
}

impl Server {
    pub fn new(config: ServeConfig, adapter: Arc<dyn CmsAdapter>, host: HostSender) -> Self {
        Self {
            config,
            adapter,
            host,
        }
    }

    #[inline(always)]
    pub fn config(&self) -> &ServeConfig {
        &self.config
    }

    /// Binds a listener on the configured hostname and port.
    pub async fn bind(config: &ServeConfig) -> LumeResult<TcpListener> {
        let address = config.address();
        let bound = TcpListener::bind(address.as_str()).await;
        bound.map_err(|source| LumeError::ListenBindFailure { address, source })
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(ProxyState {
            adapter: Arc::clone(&self.adapter),
            host: self.host.clone(),
            wait_url: self.config.url(),
        });

        Router::new().fallback(proxy_handler).with_state(state)
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> LumeResult
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        debug!("Serving {}", self.config.url());

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(Into::into)
    }
}
