//! Remount: replace a local directory with a symlink into shared storage.
//!
//! Every step is fatal on error and nothing is rolled back; a failed run is
//! expected to be restarted by the orchestrator, and a rerun converges to the
//! same result.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use super::DirBinding;
use crate::errors::{Result, SidecarError};

/// Replace `binding.local` with a symlink to `binding.target`
///
/// 1. If `local` is a symlink (live or dangling) it is unlinked; the
///    directory it pointed at is left alone.
/// 2. If `local` is a real directory it is removed recursively.
/// 3. `target` is created with its parents if missing.
/// 4. `local -> target` is created.
///
/// A `local` that exists as anything else (regular file, socket, ...) is a
/// path collision and fails.
pub fn remount(binding: &DirBinding) -> Result<()> {
    clear_local(&binding.local)?;

    fs::create_dir_all(&binding.target)
        .map_err(|e| fs_error("create directory", &binding.target, e))?;

    symlink_dir(&binding.target, &binding.local)
        .map_err(|e| fs_error("create symlink", &binding.local, e))?;

    info!(
        "Linked {} -> {}",
        binding.local.display(),
        binding.target.display()
    );
    Ok(())
}

/// Remount every binding in order, stopping at the first failure
pub fn remount_all(bindings: &[DirBinding]) -> Result<()> {
    for binding in bindings {
        remount(binding)?;
    }
    Ok(())
}

fn clear_local(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist, nothing to remove", path.display());
            return Ok(());
        }
        Err(e) => return Err(fs_error("inspect", path, e)),
    };

    if meta.file_type().is_symlink() {
        debug!("Removing existing symlink {}", path.display());
        remove_symlink(path).map_err(|e| fs_error("remove symlink", path, e))
    } else if meta.is_dir() {
        debug!("Removing directory {} recursively", path.display());
        fs::remove_dir_all(path).map_err(|e| fs_error("remove directory", path, e))
    } else {
        Err(SidecarError::filesystem(format!(
            "cannot remount {}: path exists and is not a directory",
            path.display()
        )))
    }
}

fn fs_error(action: &str, path: &Path, err: io::Error) -> SidecarError {
    SidecarError::filesystem(format!(
        "failed to {} {}: {}",
        action,
        path.display(),
        err
    ))
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

// Windows 上目录符号链接需要用 remove_dir 删除
#[cfg(windows)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    fs::remove_dir(path).or_else(|_| fs::remove_file(path))
}
