mod error;

pub use error::*;

use std::path::{Path, PathBuf};
use sugar_path::SugarPath;

/// Canonicalizes a path, stripping the `\\?\` verbatim prefix Windows adds.
pub fn canonicalize_with_strip<P: AsRef<Path>>(path: P) -> LumeResult<PathBuf> {
    let canonical = fs_err::canonicalize(path.as_ref())?;

    #[cfg(windows)]
    {
        let raw = canonical.to_string_lossy();
        if let Some(stripped) = raw.strip_prefix(r"\\?\") {
            return Ok(PathBuf::from(stripped));
        }
    }

    Ok(canonical)
}

/// Resolves `path` against `root` and removes `.` / `..` segments lexically.
///
/// Absolute inputs keep their own prefix. Two paths normalized against the
/// same root compare equal exactly when they name the same location, which is
/// what change-set membership tests rely on.
pub fn normalize_path<P: AsRef<Path>, R: AsRef<Path>>(path: P, root: R) -> PathBuf {
    root.as_ref().join(path.as_ref()).normalize()
}
