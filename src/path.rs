//! Path resolution for sink destinations
//!
//! All resolution here is lexical: `.` and `..` are folded without touching
//! the filesystem, so a destination that does not exist yet resolves the
//! same way as one that does.

use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::descriptor::FileDescriptor;
use crate::error::{Error, Result};
use crate::options::SinkConfig;

/// Fold `.` and `..` components out of a path.
///
/// A `..` at the root of an absolute path is dropped; leading `..` of a
/// relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out.iter().map(|c| c.as_os_str()).collect()
}

/// Resolve `path` against `cwd` (unless already absolute) and normalize.
pub fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&cwd.join(path))
    }
}

/// Express `path` relative to `base`.
///
/// Both paths are normalized first. Returns an empty path when they are equal.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);
    let path_parts: Vec<_> = path.components().collect();
    let base_parts: Vec<_> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

/// The relocated `cwd`, `base` and `path` for one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub cwd: PathBuf,
    pub base: PathBuf,
    pub path: PathBuf,
}

/// Compute where a descriptor lands for the given sink configuration.
///
/// The destination folder (literal or computed from the descriptor) is
/// resolved against the sink's `cwd`. It becomes the new `base` unless a base
/// override is configured. The new `path` is the new `base` joined with the
/// descriptor's path relative to its original base.
pub fn resolve_paths(config: &SinkConfig, file: &FileDescriptor) -> Result<ResolvedPaths> {
    let folder = config.destination.evaluate(file);
    if folder.as_os_str().is_empty() {
        return Err(Error::configuration(format!(
            "destination for '{}' resolved to an empty path",
            file.path.display()
        )));
    }
    let folder = resolve(&config.cwd, &folder);

    let base = match &config.base {
        Some(base) => {
            let base = base.evaluate(file);
            if base.as_os_str().is_empty() {
                return Err(Error::configuration(format!(
                    "base for '{}' resolved to an empty path",
                    file.path.display()
                )));
            }
            resolve(&config.cwd, &base)
        }
        None => folder,
    };

    let path = normalize(&base.join(file.relative()));
    debug!("resolved '{}' -> '{}'", file.path.display(), path.display());

    Ok(ResolvedPaths {
        cwd: config.cwd.clone(),
        base,
        path,
    })
}
