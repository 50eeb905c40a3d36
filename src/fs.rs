//! Filesystem primitives used by the sink.
//!
//! Every system call the sink issues goes through [`Filesystem`], so the
//! real implementation can be wrapped to observe or fail individual calls.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::path::Path;

/// The primitives a sink needs: stat, mkdir, open, chmod and symlink.
pub trait Filesystem: Send + Sync {
    /// Stat without following a final symlink.
    fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata>;

    /// Stat, following symlinks.
    fn metadata(&self, path: &Path) -> io::Result<Metadata>;

    /// Create one directory. The parent must exist.
    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Open a file for writing, creating it with `mode` or truncating it.
    fn create_file(&self, path: &Path, mode: u32) -> io::Result<File>;

    /// Change the permission bits of `path`.
    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Create a symbolic link at `link` pointing to `target`.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Remove a file or symlink.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        fs::symlink_metadata(path)
    }

    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        fs::metadata(path)
    }

    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(path)
    }

    fn create_file(&self, path: &Path, mode: u32) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        options.open(path)
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_permissions(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let resolved = link.parent().map(|p| p.join(target));
        match resolved {
            Some(ref dir) if dir.is_dir() => std::os::windows::fs::symlink_dir(target, link),
            _ => std::os::windows::fs::symlink_file(target, link),
        }
    }

    #[cfg(not(any(unix, windows)))]
    fn symlink(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Permission bits of a stat result (0 where the platform has none).
pub fn mode_of(metadata: &Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode()
    }
    #[cfg(not(unix))]
    {
        let _ = metadata;
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    #[cfg(unix)]
    fn test_create_file_applies_mode_at_creation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.txt");
        let mut file = OsFilesystem.create_file(&path, 0o600).unwrap();
        file.write_all(b"x").unwrap();
        drop(file);
        // 0600 survives any umask that leaves the owner bits alone.
        assert_eq!(mode_of(&fs::metadata(&path).unwrap()) & 0o077, 0);
    }

    #[test]
    fn test_create_file_truncates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.txt");
        fs::write(&path, "a much longer old body").unwrap();
        let mut file = OsFilesystem.create_file(&path, 0o644).unwrap();
        file.write_all(b"new").unwrap();
        drop(file);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_create_dir_reports_already_exists() {
        let temp = TempDir::new().unwrap();
        let err = OsFilesystem.create_dir(temp.path(), 0o755).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    #[cfg(unix)]
    fn test_set_permissions_and_mode_of() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x");
        fs::write(&path, "").unwrap();
        OsFilesystem.set_permissions(&path, 0o741).unwrap();
        assert_eq!(mode_of(&fs::metadata(&path).unwrap()) & 0o777, 0o741);
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("link");
        OsFilesystem.symlink(Path::new("target"), &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("target"));
        assert!(OsFilesystem
            .symlink_metadata(&link)
            .unwrap()
            .file_type()
            .is_symlink());
    }
}
