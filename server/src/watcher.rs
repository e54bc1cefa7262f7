use crate::site::{ChangeSet, Site};
use log::{debug, warn};
use lume_shared::{LumeResult, canonicalize_with_strip, normalize_path};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Watches a site and publishes debounced [`ChangeSet`]s.
///
/// The site root is watched recursively. Include entries outside the root are
/// watched on their own, since the recursive watch never reaches them. Events
/// are filtered by:
/// - Ignored paths (prefix match against normalized paths)
/// - Temporary/backup files (automatically filtered)
/// - Unchanged content (a save that leaves the bytes untouched)
///
/// Dropping the watcher stops both the OS watch and the batching task.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    watched_paths: HashSet<PathBuf>,
    batcher: JoinHandle<()>,
}

impl FileWatcher {
    /// Starts watching `site`, sending each batch through `updates`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn for_site(site: &Site, updates: broadcast::Sender<ChangeSet>) -> LumeResult<Self> {
        let root = site.root();
        let options = &site.options.watcher;

        let mut filter = EventFilter::new(root);
        for ignored in &options.ignore {
            filter.add_ignored_path(ignored);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;

        let debounce = Duration::from_millis(options.debounce);
        let batcher = tokio::spawn(batch_events(rx, filter, debounce, updates));

        let mut this = Self {
            watcher,
            watched_paths: HashSet::new(),
            batcher,
        };

        this.watch(root, RecursiveMode::Recursive)?;

        for include in &options.include {
            let path = normalize_path(include, root);
            if path.starts_with(root) {
                continue;
            }
            if let Err(e) = this.watch(&path, RecursiveMode::NonRecursive) {
                warn!("Cannot watch {}: {}", path.display(), e);
            }
        }

        Ok(this)
    }

    fn watch(&mut self, path: &Path, mode: RecursiveMode) -> LumeResult {
        self.watcher.watch(path, mode)?;
        debug!("Watching {}", path.display());
        self.watched_paths.insert(path.to_path_buf());
        Ok(())
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.iter().cloned().collect()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.batcher.abort();
    }
}

async fn batch_events(
    mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut filter: EventFilter,
    debounce: Duration,
    updates: broadcast::Sender<ChangeSet>,
) {
    while let Some(first) = rx.recv().await {
        let mut pending = ChangeSet::new();
        filter.collect(first, &mut pending);

        let deadline = tokio::time::sleep(debounce);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                next = rx.recv() => match next {
                    Some(res) => filter.collect(res, &mut pending),
                    None => break,
                },
            }
        }

        let changed = filter.retain_changed(pending).await;
        if changed.is_empty() {
            continue;
        }

        debug!("{} file(s) changed", changed.len());
        let _ = updates.send(changed);
    }
}

struct EventFilter {
    root: PathBuf,
    ignored_paths: Vec<PathBuf>,
    digests: HashMap<PathBuf, String>,
}

impl EventFilter {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ignored_paths: Vec::new(),
            digests: HashMap::new(),
        }
    }

    /// Adds a path to the ignored paths list.
    ///
    /// Existing paths are canonicalized so symlinked locations still match;
    /// missing ones are kept in normalized form.
    fn add_ignored_path<P: AsRef<Path>>(&mut self, path: P) {
        let path = normalize_path(path, &self.root);
        let path = canonicalize_with_strip(&path).unwrap_or(path);
        if !self.ignored_paths.contains(&path) {
            self.ignored_paths.push(path);
        }
    }

    fn collect(&self, res: notify::Result<Event>, pending: &mut ChangeSet) {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!("Watch error: {}", e);
                return;
            }
        };

        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }

        for path in event.paths {
            let path = normalize_path(path, &self.root);
            if !self.is_ignored_path(&path) {
                pending.insert(path);
            }
        }
    }

    fn is_ignored_path(&self, path: &Path) -> bool {
        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if is_temporary_file(file_name) {
                return true;
            }
        }

        self.ignored_paths
            .iter()
            .any(|ignored| path.starts_with(ignored))
    }

    /// Drops files whose content digest matches the last one seen.
    async fn retain_changed(&mut self, pending: ChangeSet) -> ChangeSet {
        let mut changed = ChangeSet::new();

        for path in pending.iter() {
            if !path.is_file() {
                self.digests.remove(path);
                changed.insert(path.clone());
                continue;
            }

            let digest = match fs_err::tokio::read(path).await {
                Ok(content) => calculate_content_hash(&content),
                Err(_) => {
                    changed.insert(path.clone());
                    continue;
                }
            };

            if self.digests.get(path) == Some(&digest) {
                continue;
            }
            self.digests.insert(path.clone(), digest);
            changed.insert(path.clone());
        }

        changed
    }
}

fn calculate_content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[inline]
fn is_temporary_file(file_name: &str) -> bool {
    // Editor backup files
    if file_name.ends_with('~')
        || file_name.ends_with(".swp")
        || file_name.ends_with(".swo")
        || file_name.ends_with(".swx")
    {
        return true;
    }

    // Emacs auto-save files
    if file_name.starts_with('#') && file_name.ends_with('#') {
        return true;
    }

    if file_name.starts_with(".~") || file_name.ends_with(".tmp") || file_name.ends_with(".temp")
    {
        return true;
    }

    // JetBrains IDE files
    if file_name.ends_with("___jb_tmp___") || file_name.ends_with("___jb_old___") {
        return true;
    }

    file_name.ends_with(".bak") || file_name.ends_with(".backup")
}
