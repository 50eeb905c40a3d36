//! Reconcile on-disk permission bits with a target mode.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::fs::{mode_of, Filesystem};
use crate::mode::{keep_special_bits, masked};

/// Whether [`sync_mode`] had to change anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSync {
    Unchanged,
    Changed { from: u32, to: u32 },
}

/// Stat `path` and chmod it to `target` only if the standard permission bits
/// differ.
///
/// Special bits already on the destination do not count as a mismatch and
/// are carried over when a change is needed.
pub fn sync_mode(fs: &dyn Filesystem, path: &Path, target: u32) -> Result<ModeSync> {
    let metadata = fs.metadata(path).map_err(|e| Error::stat(path, e))?;
    let on_disk = mode_of(&metadata);
    let current = masked(on_disk);
    let target = masked(target);

    if current == target {
        return Ok(ModeSync::Unchanged);
    }

    let mode = keep_special_bits(on_disk, target);
    fs.set_permissions(path, mode)
        .map_err(|source| Error::ModeChange {
            path: path.to_path_buf(),
            mode,
            source,
        })?;
    debug!(
        "changed mode of '{}' from {:o} to {:o}",
        path.display(),
        current,
        target
    );
    Ok(ModeSync::Changed {
        from: current,
        to: target,
    })
}
