//! Idempotent directory creation.
//!
//! Directories are created top-down with "create, tolerate already-exists"
//! rather than "check, then create": two descriptors racing to create the
//! same parent both succeed, whichever wins the `mkdir`.

use std::io;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::fs::{mode_of, Filesystem};
use crate::mode::{keep_special_bits, masked};

/// Ensure `path` and all of its ancestors exist as directories.
///
/// Directories created here get `mode`. Because `mkdir` is filtered by the
/// umask, a freshly created directory whose resulting bits differ from `mode`
/// is chmodded once. Directories that already existed are left alone.
///
/// Returns `true` when `path` itself was created by this call.
pub fn ensure_dir(fs: &dyn Filesystem, path: &Path, mode: u32) -> Result<bool> {
    match fs.create_dir(path, mode) {
        Ok(()) => {
            debug!("created directory '{}'", path.display());
            fix_created_mode(fs, path, mode)?;
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            ensure_is_dir(fs, path, e)?;
            Ok(false)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            match path.parent() {
                Some(parent) if parent != path && !parent.as_os_str().is_empty() => {
                    ensure_dir(fs, parent, mode)?;
                }
                _ => return Err(creation_error(path, e)),
            }
            match fs.create_dir(path, mode) {
                Ok(()) => {
                    debug!("created directory '{}'", path.display());
                    fix_created_mode(fs, path, mode)?;
                    Ok(true)
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    ensure_is_dir(fs, path, e)?;
                    Ok(false)
                }
                Err(e) => Err(creation_error(path, e)),
            }
        }
        Err(e) => Err(creation_error(path, e)),
    }
}

fn ensure_is_dir(fs: &dyn Filesystem, path: &Path, exists: io::Error) -> Result<()> {
    match fs.metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(creation_error(path, exists)),
        Err(e) => Err(Error::stat(path, e)),
    }
}

fn fix_created_mode(fs: &dyn Filesystem, path: &Path, mode: u32) -> Result<()> {
    let metadata = fs.metadata(path).map_err(|e| Error::stat(path, e))?;
    let on_disk = mode_of(&metadata);
    if masked(on_disk) != masked(mode) {
        let mode = keep_special_bits(on_disk, mode);
        fs.set_permissions(path, mode)
            .map_err(|source| Error::ModeChange {
                path: path.to_path_buf(),
                mode,
                source,
            })?;
    }
    Ok(())
}

fn creation_error(path: &Path, source: io::Error) -> Error {
    Error::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFilesystem;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_creates_missing_chain() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a/b/c");
        assert!(ensure_dir(&OsFilesystem, &target, 0o755).unwrap());
        assert!(target.is_dir());
    }

    #[test]
    fn test_existing_directory_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(!ensure_dir(&OsFilesystem, temp.path(), 0o755).unwrap());
    }

    #[test]
    fn test_existing_file_in_the_way_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let err = ensure_dir(&OsFilesystem, &blocker.join("child"), 0o755).unwrap_err();
        assert!(matches!(err, Error::DirectoryCreation { .. }), "{err}");
    }

    #[test]
    #[cfg(unix)]
    fn test_created_directories_get_mode() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("x/y");
        ensure_dir(&OsFilesystem, &target, 0o751).unwrap();
        for dir in [temp.path().join("x"), target] {
            assert_eq!(masked(mode_of(&fs::metadata(&dir).unwrap())), 0o751);
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_existing_directory_mode_untouched() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("keep");
        fs::create_dir(&existing).unwrap();
        fs::set_permissions(&existing, fs::Permissions::from_mode(0o700)).unwrap();

        ensure_dir(&OsFilesystem, &existing.join("new"), 0o755).unwrap();
        assert_eq!(masked(mode_of(&fs::metadata(&existing).unwrap())), 0o700);
    }

    #[test]
    #[cfg(unix)]
    fn test_created_directory_keeps_inherited_setgid() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let parent = temp.path().join("shared");
        fs::create_dir(&parent).unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o2775)).unwrap();
        if mode_of(&fs::metadata(&parent).unwrap()) & 0o2000 == 0 {
            // setgid was dropped because we are not in the directory's group
            return;
        }

        let child = parent.join("child");
        ensure_dir(&OsFilesystem, &child, 0o777).unwrap();
        assert_eq!(mode_of(&fs::metadata(&child).unwrap()) & 0o7777, 0o2777);
    }

    #[test]
    fn test_concurrent_ensure_does_not_race() {
        let temp = TempDir::new().unwrap();
        let target = Arc::new(temp.path().join("shared/deep/tree"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let target = Arc::clone(&target);
                thread::spawn(move || ensure_dir(&OsFilesystem, &target, 0o755))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert!(target.is_dir());
    }
}
