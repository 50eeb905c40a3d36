//! Permission-mode resolution
//!
//! Target modes come from the sink options first, then from the descriptor's
//! source mode, then from the conventional `0666`/`0777` defaults with the
//! process umask applied. Comparisons only look at the nine standard
//! permission bits; setuid, setgid and sticky bits on an existing destination
//! are never treated as a mismatch.

use crate::descriptor::FileDescriptor;
use crate::options::SinkConfig;

/// All permission and special bits.
pub const MODE_MASK: u32 = 0o7777;

/// The standard read/write/execute bits.
pub const PERMISSION_MASK: u32 = 0o777;

/// setuid, setgid and sticky.
pub const SPECIAL_MASK: u32 = 0o7000;

const DEFAULT_FILE_MODE: u32 = 0o666;
const DEFAULT_DIR_MODE: u32 = 0o777;

/// Restrict a mode to the standard permission bits.
pub fn masked(mode: u32) -> u32 {
    mode & PERMISSION_MASK
}

/// Combine the standard bits of `target` with the special bits of `current`.
///
/// Used when chmodding an existing path so setuid/setgid/sticky survive.
pub fn keep_special_bits(current: u32, target: u32) -> u32 {
    (current & SPECIAL_MASK) | masked(target)
}

/// Default mode for new files: `0666` minus the umask.
pub fn default_file_mode(umask: u32) -> u32 {
    DEFAULT_FILE_MODE & !umask
}

/// Default mode for new directories: `0777` minus the umask.
pub fn default_dir_mode(umask: u32) -> u32 {
    DEFAULT_DIR_MODE & !umask
}

/// Target mode for a regular file or symlink descriptor.
pub fn file_mode(config: &SinkConfig, file: &FileDescriptor) -> u32 {
    match (config.mode, file.mode) {
        (Some(mode), _) => masked(mode),
        (None, Some(source)) => masked(source),
        (None, None) => default_file_mode(config.umask),
    }
}

/// Target mode for directories created on the way to a destination.
pub fn parent_dir_mode(config: &SinkConfig) -> u32 {
    config
        .dir_mode
        .map(masked)
        .unwrap_or_else(|| default_dir_mode(config.umask))
}

/// Target mode for a directory descriptor itself.
///
/// Falls back to the descriptor's source mode before the default, so a copied
/// directory keeps its permissions unless `dir_mode` says otherwise.
pub fn directory_mode(config: &SinkConfig, file: &FileDescriptor) -> u32 {
    match (config.dir_mode, file.mode) {
        (Some(mode), _) => masked(mode),
        (None, Some(source)) => masked(source),
        (None, None) => default_dir_mode(config.umask),
    }
}

/// Read the process umask.
///
/// On Linux this reads `/proc/self/status` and leaves the umask untouched.
/// Elsewhere it sets and immediately restores the umask.
#[cfg(unix)]
pub fn current_umask() -> u32 {
    #[cfg(target_os = "linux")]
    {
        if let Some(umask) = proc_status_umask() {
            return umask;
        }
    }

    use nix::sys::stat::{umask, Mode};
    let previous = umask(Mode::from_bits_truncate(0o022));
    umask(previous);
    u32::from(previous.bits())
}

#[cfg(not(unix))]
pub fn current_umask() -> u32 {
    0
}

#[cfg(target_os = "linux")]
fn proc_status_umask() -> Option<u32> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("Umask:"))
        .and_then(|value| u32::from_str_radix(value.trim(), 8).ok())
}
