//! Symbolic link creation.

use std::io;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::fs::Filesystem;

/// Create a symlink at `path` pointing to `target`.
///
/// `target` is stored as given, so a relative target resolves against the
/// link's parent directory. With `replace`, an existing non-directory at
/// `path` is removed first.
pub fn create_symlink(fs: &dyn Filesystem, target: &Path, path: &Path, replace: bool) -> Result<()> {
    let error = |source: io::Error| Error::Symlink {
        path: path.to_path_buf(),
        target: target.to_path_buf(),
        source,
    };

    if replace {
        match fs.symlink_metadata(path) {
            Ok(metadata) if !metadata.is_dir() => fs.remove_file(path).map_err(error)?,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::stat(path, e)),
        }
    }

    fs.symlink(target, path).map_err(error)?;
    debug!("linked '{}' -> '{}'", path.display(), target.display());
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::fs::OsFilesystem;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_relative_target_resolves_from_parent() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("wow")).unwrap();
        fs::write(temp.path().join("wow/suchempty"), "such").unwrap();

        let link = temp.path().join("test-create-dir-symlink");
        create_symlink(&OsFilesystem, Path::new("wow"), &link, false).unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), Path::new("wow"));
        assert_eq!(fs::read_to_string(link.join("suchempty")).unwrap(), "such");
    }

    #[test]
    fn test_existing_file_without_replace_fails() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("taken");
        fs::write(&link, "").unwrap();

        let err = create_symlink(&OsFilesystem, Path::new("x"), &link, false).unwrap_err();
        assert_eq!(err.kind(), Some(io::ErrorKind::AlreadyExists));
    }

    #[test]
    fn test_replace_swaps_existing_link() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("link");
        create_symlink(&OsFilesystem, Path::new("old"), &link, true).unwrap();
        create_symlink(&OsFilesystem, Path::new("new"), &link, true).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("new"));
    }
}
