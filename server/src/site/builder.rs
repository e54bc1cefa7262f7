use super::{BuildFlags, Site, SiteOptions};
use futures::FutureExt;
use futures::future::BoxFuture;
use log::debug;
use lume_shared::{LumeError, LumeResult, canonicalize_with_strip};
use std::path::{Path, PathBuf};

/// Default site config file name, looked up in the project root.
pub const SITE_CONFIG_FILE: &str = "_config.toml";

/// Produces [`Site`] handles for a project.
pub trait SiteBuilder: Send + Sync {
    /// Creates a site for `root`, optionally reading `config` instead of the
    /// default config file. `flags` are fixed for the lifetime of the site.
    fn create_site<'a>(
        &'a self,
        root: &'a Path,
        config: Option<&'a Path>,
        flags: BuildFlags,
    ) -> BoxFuture<'a, LumeResult<Site>>;
}

/// Site builder backed by a TOML config file on disk.
#[derive(Debug, Clone, Default)]
pub struct FsSiteBuilder;

impl FsSiteBuilder {
    pub fn new() -> Self {
        Self
    }

    async fn load(root: &Path, config: Option<&Path>, flags: BuildFlags) -> LumeResult<Site> {
        let root = canonicalize_with_strip(root)?;

        let config_file = match config {
            Some(path) => {
                let path = root.join(path);
                if !path.is_file() {
                    return Err(LumeError::SiteConfigNotFound(path));
                }
                path
            }
            None => root.join(SITE_CONFIG_FILE),
        };

        let mut options = if config_file.is_file() {
            let source = fs_err::tokio::read_to_string(&config_file).await?;
            toml::from_str::<SiteOptions>(&source).map_err(|e| LumeError::InvalidConfig {
                path: config_file.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            debug!("No site config at {}, using defaults", config_file.display());
            SiteOptions::default()
        };

        if !flags.drafts {
            options.watcher.ignore.push(PathBuf::from("_drafts"));
        }

        debug!("Creating site at {} with {:?}", root.display(), flags);
        Ok(Site::new(root, config_file, flags, options))
    }
}

impl SiteBuilder for FsSiteBuilder {
    fn create_site<'a>(
        &'a self,
        root: &'a Path,
        config: Option<&'a Path>,
        flags: BuildFlags,
    ) -> BoxFuture<'a, LumeResult<Site>> {
        Self::load(root, config, flags).boxed()
    }
}
