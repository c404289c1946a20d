//! Path resolution for the watched file.
//!
//! Both the target and every incoming notification path go through the same
//! [`absolute`] function, so comparison is always absolute-to-absolute.

use std::io;
use std::path::{Component, Path, PathBuf};

use super::WatchError;

/// The file being watched and the directory that gets subscribed.
///
/// Derived once at construction and immutable afterwards. `dir` is always
/// the parent of `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    file: PathBuf,
    dir: PathBuf,
    /// Canonical spelling of `file` when it differs (symlinked parents,
    /// `/var` vs `/private/var`). Some backends report canonical paths.
    alias: Option<PathBuf>,
}

impl WatchTarget {
    /// Resolve a user-supplied path into an absolute target.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        let path = path.as_ref();
        let resolution_error = |reason: String| WatchError::PathResolution {
            path: path.to_path_buf(),
            reason,
        };

        let file = absolute(path).map_err(|e| resolution_error(e.to_string()))?;
        let (dir, name) = match (file.parent(), file.file_name()) {
            (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_os_string()),
            _ => return Err(resolution_error("path has no parent directory".to_string())),
        };

        let alias = std::fs::canonicalize(&dir)
            .ok()
            .map(|canonical| canonical.join(&name))
            .filter(|canonical| *canonical != file);

        Ok(Self { file, dir, alias })
    }

    /// Absolute path of the watched file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Absolute path of the directory containing the watched file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check whether a notification path refers to the watched file.
    ///
    /// Paths that cannot be made absolute never match.
    pub fn matches(&self, path: &Path) -> bool {
        match absolute(path) {
            Ok(resolved) => resolved == self.file || self.alias.as_ref() == Some(&resolved),
            Err(_) => false,
        }
    }
}

/// Make `path` absolute against the working directory and lexically clean
/// `.` and `..` components. Symlinks are not followed.
pub(crate) fn absolute(path: &Path) -> io::Result<PathBuf> {
    let joined = std::path::absolute(path)?;
    Ok(clean(&joined))
}

fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // Popping past the root is a no-op, same as `/..` == `/`.
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}
