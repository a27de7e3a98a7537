//! Store directory provisioning.
//!
//! Makes sure a store directory exists and is private to the current user
//! (`0700` by default). Used by the façade before it opens the backing file.

use crate::error::{Error, Result};
use std::path::Path;

/// Permission bits applied to store directories.
pub const STORE_DIR_MODE: u32 = 0o700;

/// Ensure `dir` exists as a directory with exactly `mode` permission bits.
///
/// Missing directories (and their parents) are created. An existing
/// directory with different bits is `chmod`ed. Calling this repeatedly is a
/// no-op once the directory is in place.
pub fn ensure_directory(dir: &Path, mode: u32) -> Result<()> {
    if !dir.exists() {
        create_dir_all(dir, mode).map_err(|e| Error::io(dir, e))?;
        tracing::debug!(path = %dir.display(), mode = format_args!("{mode:o}"), "created store directory");
    }

    if !dir.is_dir() {
        return Err(Error::DirectoryConflict {
            path: dir.to_path_buf(),
        });
    }

    let current = file_permissions(dir)?;
    if current != mode {
        tracing::warn!(
            path = %dir.display(),
            from = format_args!("{current:o}"),
            to = format_args!("{mode:o}"),
            "resetting store directory permissions"
        );
        set_permissions(dir, mode).map_err(|e| Error::io(dir, e))?;
    }
    Ok(())
}

/// The `0o777` permission bits of `path`.
#[cfg(unix)]
pub fn file_permissions(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    Ok(meta.permissions().mode() & 0o777)
}

/// Permission bits are not tracked off Unix; report the requested mode.
#[cfg(not(unix))]
pub fn file_permissions(path: &Path) -> Result<u32> {
    std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    Ok(STORE_DIR_MODE)
}

#[cfg(unix)]
fn create_dir_all(dir: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new().recursive(true).mode(mode).create(dir)
}

#[cfg(not(unix))]
fn create_dir_all(dir: &Path, _mode: u32) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_permissions(dir: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_dir: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
