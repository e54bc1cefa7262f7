use crate::site::ChangeSet;
use lume_shared::normalize_path;
use std::path::{Path, PathBuf};

/// Config files whose change invalidates the running server.
///
/// Both paths are normalized against the same site root, so they can be
/// looked up in a [`ChangeSet`] as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedConfigPaths {
    cms_config: PathBuf,
    site_config: PathBuf,
}

impl WatchedConfigPaths {
    pub fn new(cms_config: &Path, site_config: &Path, root: &Path) -> Self {
        Self {
            cms_config: normalize_path(cms_config, root),
            site_config: normalize_path(site_config, root),
        }
    }

    #[inline(always)]
    pub fn cms_config(&self) -> &Path {
        &self.cms_config
    }

    #[inline(always)]
    pub fn site_config(&self) -> &Path {
        &self.site_config
    }

    pub fn must_reload(&self, files: &ChangeSet) -> bool {
        files.contains(&self.site_config) || files.contains(&self.cms_config)
    }
}
