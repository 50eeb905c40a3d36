//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new().with_source_file("a.txt", "hello");
//! fixture.command().arg("copy").arg("src").arg("out").assert().success();
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::is_root;
    pub use super::TestFixture;
}

/// Whether the tests run with root privileges, which bypass permission
/// checks.
#[allow(dead_code)]
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// A temporary directory holding a `src/` tree to copy from.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_source_file("docs/readme.md", "# hi")
///     .with_config("destination: out\n");
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a fixture with an empty `src/` directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("src")
            .create_dir_all()
            .expect("Failed to create source directory");
        Self { temp_dir }
    }

    /// Add a file below `src/`.
    pub fn with_source_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child("src")
            .child(path)
            .write_str(content)
            .expect("Failed to write source file");
        self
    }

    /// Add an empty directory below `src/`.
    pub fn with_source_dir(self, path: &str) -> Self {
        self.temp_dir
            .child("src")
            .child(path)
            .create_dir_all()
            .expect("Failed to create source directory");
        self
    }

    /// Add a `filedest.yaml` config file at the fixture root.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("filedest.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn source(&self) -> PathBuf {
        self.temp_dir.path().join("src")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("filedest.yaml")
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A command for the `filedest` binary running in the fixture directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("filedest");
        cmd.current_dir(self.path()).env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_source_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.source().is_dir());
    }

    #[test]
    fn test_fixture_with_source_file() {
        let fixture = TestFixture::new().with_source_file("nested/a.txt", "hello");
        assert!(fixture.source().join("nested/a.txt").exists());
    }
}
