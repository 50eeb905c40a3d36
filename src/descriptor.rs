//! File descriptors: the unit that flows through a sink.

use std::env;
use std::path::{Path, PathBuf};

use crate::path;
use crate::stream::ContentStream;

/// The contents carried by a descriptor
#[derive(Debug, Default)]
pub enum Contents {
    /// Nothing to write. The sink never creates a file for these.
    #[default]
    Absent,
    /// All bytes are available up front.
    Buffered(Vec<u8>),
    /// Bytes arrive incrementally.
    Stream(ContentStream),
}

impl Contents {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// The buffered bytes, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for Contents {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffered(bytes)
    }
}

impl From<&str> for Contents {
    fn from(text: &str) -> Self {
        Self::Buffered(text.as_bytes().to_vec())
    }
}

impl From<ContentStream> for Contents {
    fn from(stream: ContentStream) -> Self {
        Self::Stream(stream)
    }
}

/// What a descriptor materializes as
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Kind {
    /// A regular file.
    #[default]
    File,
    /// A directory. Contents are ignored.
    Directory,
    /// A symbolic link to the given target, relative to the link's parent.
    Symlink(PathBuf),
}

/// A file, directory or symlink in transit to the filesystem.
#[derive(Debug)]
pub struct FileDescriptor {
    /// Working directory used to resolve a relative `path` or `base`.
    pub cwd: PathBuf,
    /// Root directory the descriptor's relative layout is computed from.
    pub base: PathBuf,
    /// Location of the descriptor.
    pub path: PathBuf,
    /// What to write.
    pub contents: Contents,
    /// Permission bits captured from the source, if known.
    pub mode: Option<u32>,
    /// File, directory or symlink.
    pub kind: Kind,
}

impl FileDescriptor {
    /// Create a file descriptor rooted at the process working directory.
    ///
    /// Both `cwd` and `base` default to the current directory; use
    /// [`with_cwd`](Self::with_cwd) and [`with_base`](Self::with_base) to change them.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            base: cwd.clone(),
            cwd,
            path: path.into(),
            contents: Contents::Absent,
            mode: None,
            kind: Kind::File,
        }
    }

    /// Create a directory descriptor.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: Kind::Directory,
            ..Self::new(path)
        }
    }

    /// Create a symlink descriptor pointing at `target`.
    pub fn symlink(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            kind: Kind::Symlink(target.into()),
            ..Self::new(path)
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    pub fn with_contents(mut self, contents: impl Into<Contents>) -> Self {
        self.contents = contents.into();
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn is_directory(&self) -> bool {
        self.kind == Kind::Directory
    }

    pub fn symlink_target(&self) -> Option<&Path> {
        match &self.kind {
            Kind::Symlink(target) => Some(target),
            _ => None,
        }
    }

    /// `path` made absolute against `cwd`.
    pub fn absolute_path(&self) -> PathBuf {
        path::resolve(&self.cwd, &self.path)
    }

    /// `base` made absolute against `cwd`.
    pub fn absolute_base(&self) -> PathBuf {
        path::resolve(&self.cwd, &self.base)
    }

    /// `path` relative to `base`. May start with `..` when `path` lies outside `base`.
    pub fn relative(&self) -> PathBuf {
        path::relative_to(&self.absolute_path(), &self.absolute_base())
    }

    /// Move the descriptor to a new location.
    ///
    /// Consumes `self` and returns the rewritten descriptor; contents, mode and
    /// kind carry over unchanged.
    pub fn relocate(self, cwd: PathBuf, base: PathBuf, path: PathBuf) -> Self {
        Self {
            cwd,
            base,
            path,
            ..self
        }
    }
}
