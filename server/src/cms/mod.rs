mod config;
mod files;

pub use config::*;
pub use files::*;

use crate::site::Site;
use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use lume_shared::{LumeError, LumeResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Response header an adapter sets to ask for a server reload.
pub const CMS_HEADER: &str = "x-lume-cms";

/// Value of [`CMS_HEADER`] that requests a reload.
pub const CMS_RELOAD: &str = "reload";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmsOptions {
    /// URL prefix the CMS is mounted under.
    pub base_path: String,
}

impl Default for CmsOptions {
    fn default() -> Self {
        Self {
            base_path: "/".to_string(),
        }
    }
}

/// A CMS instance, the default export of a CMS config module.
pub trait Cms: Send + Sync {
    fn options(&self) -> &CmsOptions;
}

/// Result of loading a CMS config module.
pub struct CmsModule {
    pub path: PathBuf,
    pub default_export: Option<Arc<dyn Cms>>,
}

impl CmsModule {
    /// Returns the default export, or `CmsInstanceMissing` when there is none.
    pub fn into_default(self) -> LumeResult<Arc<dyn Cms>> {
        self.default_export
            .ok_or(LumeError::CmsInstanceMissing(self.path))
    }
}

/// Loads CMS config modules from disk.
pub trait ModuleLoader: Send + Sync {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, LumeResult<CmsModule>>;
}

/// Request handler in front of a CMS instance.
///
/// Implementations must tolerate concurrent calls; every request of a serve
/// cycle goes through the same handler.
pub trait CmsAdapter: Send + Sync {
    fn fetch(&self, request: Request) -> BoxFuture<'_, LumeResult<Response>>;
}

/// Builds the request handler for a site and its CMS instance.
pub trait AdapterFactory: Send + Sync {
    fn adapt<'a>(
        &'a self,
        site: &'a Site,
        cms: Arc<dyn Cms>,
    ) -> BoxFuture<'a, LumeResult<Arc<dyn CmsAdapter>>>;
}
