//! # filedest
//!
//! This library writes in-memory file descriptors onto a real filesystem. A
//! [`Sink`](sink::Sink) consumes a sequence of descriptors, each carrying a
//! path, a base directory, contents that may be absent, buffered, or still
//! arriving, and optional permission or symlink metadata. It reproduces the
//! directory structure, permission bits and symlinks under a destination
//! folder, and hands every written descriptor back relocated to its new home.
//!
//! ## Quick Example
//!
//! ```
//! use filedest::descriptor::FileDescriptor;
//! use filedest::options::SinkOptions;
//! use filedest::sink::Sink;
//!
//! let out = tempfile::tempdir().unwrap();
//! let sink = Sink::new(out.path(), SinkOptions::new().mode(0o644)).unwrap();
//!
//! let file = FileDescriptor::new("/project/src/readme.txt")
//!     .with_base("/project/src")
//!     .with_contents("# My Project");
//!
//! let written = sink.write(file).unwrap();
//! assert_eq!(written.path, out.path().join("readme.txt"));
//! assert_eq!(std::fs::read_to_string(&written.path).unwrap(), "# My Project");
//! ```
//!
//! ## Core Concepts
//!
//! - **Descriptors (`descriptor`, `stream`)**: the unit flowing through a
//!   sink, and the bounded chunk stream used for incremental contents.
//! - **Configuration (`options`)**: destination folder, working directory,
//!   modes, overwrite policy and base override, from code or a YAML file.
//! - **Resolution (`path`, `mode`)**: where a descriptor lands and which
//!   permission bits it should end up with.
//! - **Materialization (`dirs`, `write`, `permissions`, `symlink`)**: the
//!   individual filesystem steps, all issued through the `fs::Filesystem`
//!   trait.
//! - **Orchestration (`sink`)**: runs the steps per descriptor and reports
//!   typed outcomes as a stream of events.
//! - **Source (`source`)**: builds descriptors from a directory tree, used by
//!   the `filedest` binary.

pub mod descriptor;
pub mod dirs;
pub mod error;
pub mod fs;
pub mod mode;
pub mod options;
pub mod output;
pub mod path;
pub mod permissions;
pub mod sink;
pub mod source;
pub mod stream;
pub mod symlink;
pub mod write;

#[cfg(test)]
mod path_proptest;
