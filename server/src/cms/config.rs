use lume_shared::{LumeError, LumeResult};
use std::path::{Path, PathBuf};

/// CMS config file names, in lookup order.
pub const CMS_CONFIG_CANDIDATES: [&str; 2] = ["_cms.ts", "_cms.js"];

/// Returns the first candidate that exists as a file under `root`.
pub fn find_config_file<S: AsRef<str>>(root: &Path, candidates: &[S]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| root.join(name.as_ref()))
        .find(|path| path.is_file())
}

/// Like [`find_config_file`], failing with `ConfigNotFound` when nothing matches.
pub fn require_config_file<S: AsRef<str>>(root: &Path, candidates: &[S]) -> LumeResult<PathBuf> {
    find_config_file(root, candidates).ok_or_else(|| LumeError::ConfigNotFound {
        root: root.display().to_string(),
        candidates: candidates.iter().map(|c| c.as_ref().to_string()).collect(),
    })
}
