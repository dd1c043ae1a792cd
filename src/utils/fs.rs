//! Small filesystem helpers shared by compilation and publishing.

use anyhow::{Context, Result};
use std::{fs, io, path::Path};

/// Remove a file if it exists.
///
/// Returns `true` when a file was actually removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Copy `src` to `dst`, overwriting `dst`, and carry over the modification time.
pub fn copy_with_mtime(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy `{}` to `{}`", src.display(), dst.display()))?;

    let modified = fs::metadata(src)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("Failed to read mtime of `{}`", src.display()))?;
    fs::File::options()
        .write(true)
        .open(dst)
        .and_then(|file| file.set_modified(modified))
        .with_context(|| format!("Failed to set mtime of `{}`", dst.display()))?;

    Ok(())
}
