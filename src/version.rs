//! # Versioned Directory Resolution
//!
//! Data repositories publish each dataset under sibling version directories
//! (`v1`, `v20150112`, ...). Version names sort lexicographically, so the last
//! entry is the most recent one.

use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while resolving a version directory
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("No version directories under '{0}'")]
    NoVersions(String),

    #[error("Version index {index} out of range for {count} version(s) under '{root}'")]
    IndexOutOfRange {
        index: isize,
        count: usize,
        root: String,
    },
}

/// Which version to pick; negative indices count from the most recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionIndex(pub isize);

impl VersionIndex {
    pub const LATEST: VersionIndex = VersionIndex(-1);
}

impl Default for VersionIndex {
    fn default() -> Self {
        Self::LATEST
    }
}

/// Lists version subdirectory names (starting with `v`) under `root`, sorted.
pub fn list_versions<P: AsRef<Path>>(root: P) -> Result<Vec<String>, VersionError> {
    let root = root.as_ref();
    let io_err = |source| VersionError::Io {
        path: root.display().to_string(),
        source,
    };
    let mut versions = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('v') && entry.path().is_dir() {
            versions.push(name);
        }
    }
    versions.sort();
    Ok(versions)
}

/// Resolves `root/<version>/<selector>`.
///
/// `root` is canonicalized first so symlinked repositories resolve to their
/// real location.
///
/// # Errors
///
/// Returns [`VersionError::NoVersions`] when `root` has no version
/// directories and [`VersionError::IndexOutOfRange`] for a bad index.
pub fn resolve_version_dir<P: AsRef<Path>>(
    root: P,
    selector: &str,
    index: VersionIndex,
) -> Result<PathBuf, VersionError> {
    let root = fs::canonicalize(root.as_ref()).map_err(|source| VersionError::Io {
        path: root.as_ref().display().to_string(),
        source,
    })?;
    let versions = list_versions(&root)?;
    if versions.is_empty() {
        return Err(VersionError::NoVersions(root.display().to_string()));
    }

    let count = versions.len();
    let position = if index.0 < 0 {
        count.checked_sub(index.0.unsigned_abs())
    } else {
        Some(index.0 as usize).filter(|&i| i < count)
    };
    let position = position.ok_or_else(|| VersionError::IndexOutOfRange {
        index: index.0,
        count,
        root: root.display().to_string(),
    })?;

    debug!("Versions under {}: {:?}, using {}", root.display(), versions, versions[position]);
    Ok(root.join(&versions[position]).join(selector))
}
