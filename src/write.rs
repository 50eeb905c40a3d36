//! Writing descriptor contents to disk
//!
//! This is the step of the sink that puts bytes on the host filesystem.
//!
//! ## Process
//!
//! 1.  **Absent contents**: nothing is opened or written.
//!
//! 2.  **Buffered contents**: the destination is opened (created with the
//!     target mode, or truncated), all bytes are written, and it is closed.
//!
//! 3.  **Streamed contents**: the destination is opened the same way and each
//!     chunk is relayed as it arrives. Pulling the next chunk only happens
//!     after the previous one has been handed to the file, so a slow disk
//!     holds the producer back through the stream's bounded channel.
//!
//! Parent directories are the caller's concern; see [`crate::dirs`].

use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::descriptor::Contents;
use crate::error::{Error, Result};
use crate::fs::Filesystem;
use crate::stream::{ContentStream, CHUNK_SIZE};

/// What the content step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Written {
    /// Contents were absent; the destination was not touched.
    Nothing,
    /// A buffered payload of this many bytes was written.
    Buffered(u64),
    /// A stream of this many bytes was relayed.
    Streamed(u64),
}

/// Write `contents` to `path`, creating the file with `mode` if it is new.
///
/// Streamed contents are consumed. On success they are replaced with a lazy
/// stream reading the destination back, so the descriptor can be handed on
/// to another stage.
pub fn write_contents(
    fs: &dyn Filesystem,
    path: &Path,
    contents: &mut Contents,
    mode: u32,
) -> Result<Written> {
    match contents {
        Contents::Absent => Ok(Written::Nothing),
        Contents::Buffered(bytes) => {
            write_buffered(fs, path, bytes, mode)?;
            Ok(Written::Buffered(bytes.len() as u64))
        }
        Contents::Stream(stream) => {
            let total = relay_stream(fs, path, stream, mode)?;
            *contents = Contents::Stream(ContentStream::from_path(path));
            Ok(Written::Streamed(total))
        }
    }
}

/// Write a fully available payload.
pub fn write_buffered(fs: &dyn Filesystem, path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
    let mut file = fs
        .create_file(path, mode)
        .map_err(|e| Error::write("open", path, e))?;
    file.write_all(bytes)
        .map_err(|e| Error::write("write", path, e))?;
    debug!("wrote {} bytes to '{}'", bytes.len(), path.display());
    Ok(())
}

/// Relay a stream chunk by chunk. Returns the number of bytes written.
pub fn relay_stream(
    fs: &dyn Filesystem,
    path: &Path,
    stream: &mut ContentStream,
    mode: u32,
) -> Result<u64> {
    let file = fs
        .create_file(path, mode)
        .map_err(|e| Error::write("open", path, e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut total = 0u64;

    for chunk in stream.by_ref() {
        let chunk = chunk.map_err(|e| Error::write("relay", path, e))?;
        writer
            .write_all(&chunk)
            .map_err(|e| Error::write("write", path, e))?;
        total += chunk.len() as u64;
    }

    writer
        .into_inner()
        .map_err(|e| Error::write("close", path, e.into_error()))?;
    debug!("relayed {} bytes to '{}'", total, path.display());
    Ok(total)
}
