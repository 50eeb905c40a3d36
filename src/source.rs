//! Build descriptors from a directory tree on disk.
//!
//! This is the producer the `filedest` binary feeds into a sink. Every entry
//! below `root` becomes one descriptor whose `base` is `root`, so the sink
//! reproduces the tree's layout under its destination.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::descriptor::{Contents, FileDescriptor, Kind};
use crate::error::Result;
use crate::fs::mode_of;
use crate::stream::ContentStream;

/// How file contents are loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Read whole files into memory.
    #[default]
    Buffer,
    /// Stream files lazily.
    Stream,
    /// Do not read contents at all.
    None,
}

/// Options for [`read_tree`]
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub read: ReadMode,
    /// Keep only files whose path relative to the root matches.
    pub pattern: Option<String>,
    /// Copy what symlinks point to instead of recreating the links.
    pub follow_symlinks: bool,
}

/// Walk `root` and build one descriptor per entry, in file-name order.
pub fn read_tree(root: &Path, options: &SourceOptions) -> Result<Vec<FileDescriptor>> {
    let pattern = options
        .pattern
        .as_deref()
        .map(Pattern::new)
        .transpose()?;
    let cwd = root.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut descriptors = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;
        let path = entry.path().to_path_buf();
        let file_type = entry.file_type();

        let kind = if file_type.is_dir() {
            Kind::Directory
        } else if file_type.is_symlink() {
            let target = fs::read_link(&path)?;
            Kind::Symlink(target)
        } else {
            Kind::File
        };

        if kind == Kind::File || matches!(kind, Kind::Symlink(_)) {
            if let Some(pattern) = &pattern {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                if !pattern.matches_path(relative) {
                    continue;
                }
            }
        }

        let metadata = entry.metadata()?;
        let contents = match (&kind, options.read) {
            (Kind::File, ReadMode::Buffer) => Contents::Buffered(fs::read(&path)?),
            (Kind::File, ReadMode::Stream) => Contents::Stream(ContentStream::from_path(&path)),
            _ => Contents::Absent,
        };

        descriptors.push(FileDescriptor {
            cwd: cwd.clone(),
            base: PathBuf::from(root),
            path,
            contents,
            mode: Some(mode_of(&metadata)),
            kind,
        });
    }

    Ok(descriptors)
}
