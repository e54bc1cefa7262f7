mod builder;
mod options;

pub use builder::*;
pub use options::*;

use crate::watcher::FileWatcher;
use lume_shared::{LumeResult, normalize_path};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Build-mode switches handed to the site builder at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildFlags {
    /// Include draft content.
    pub drafts: bool,
    /// The site is served behind the CMS.
    pub cms: bool,
    /// Watch the site and publish change batches.
    pub live_reload: bool,
}

impl BuildFlags {
    /// Flags for a CMS serve cycle: drafts, CMS mode and live reload all on.
    pub fn cms() -> Self {
        Self {
            drafts: true,
            cms: true,
            live_reload: true,
        }
    }
}

/// Normalized absolute paths that changed since the last build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    files: HashSet<PathBuf>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.files.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Handle to a site produced by a [`SiteBuilder`].
///
/// `options` stays mutable until the serve cycle takes its snapshot.
#[derive(Debug)]
pub struct Site {
    root: PathBuf,
    config_file: PathBuf,
    flags: BuildFlags,
    pub options: SiteOptions,
    updates: broadcast::Sender<ChangeSet>,
}

impl Site {
    /// Creates a site handle. `root` must already be canonical.
    pub fn new(root: PathBuf, config_file: PathBuf, flags: BuildFlags, options: SiteOptions) -> Self {
        let config_file = normalize_path(config_file, &root);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            root,
            config_file,
            flags,
            options,
            updates,
        }
    }

    #[inline(always)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the site config file. The file may not exist yet.
    #[inline(always)]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    #[inline(always)]
    pub fn flags(&self) -> BuildFlags {
        self.flags
    }

    /// Subscribes to the change batches published before each update.
    pub fn on_before_update(&self) -> broadcast::Receiver<ChangeSet> {
        self.updates.subscribe()
    }

    /// Publishes a change batch to every subscriber, returning how many got it.
    pub fn dispatch_before_update(&self, files: ChangeSet) -> usize {
        self.updates.send(files).unwrap_or(0)
    }

    /// Starts watching the site root and the include list.
    ///
    /// Returns `None` when live reload is disabled for this site.
    pub fn watch(&self) -> LumeResult<Option<FileWatcher>> {
        if !self.flags.live_reload {
            return Ok(None);
        }

        let watcher = FileWatcher::for_site(self, self.updates.clone())?;
        Ok(Some(watcher))
    }
}
