//! Scoped change of the process working directory.

use anyhow::{Context, Result};
use parking_lot::{Mutex, MutexGuard};
use std::{
    env,
    path::{Path, PathBuf},
};

/// Serializes every working-directory switch in the process.
static WORKDIR_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Switches the process working directory and restores it on drop.
///
/// Holds a process-wide lock for its whole lifetime. Do not nest guards on
/// the same thread: the second `enter` would block forever.
///
/// # Example
/// ```ignore
/// {
///     let _guard = WorkdirGuard::enter(&site_dir)?;
///     exec!(["xelatex"]; "resume.tex")?;
/// } // previous directory restored here, even on early return
/// ```
pub struct WorkdirGuard {
    previous: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl WorkdirGuard {
    pub fn enter(target: &Path) -> Result<Self> {
        let lock = WORKDIR_LOCK.lock();
        let previous = env::current_dir().context("Failed to read current directory")?;
        env::set_current_dir(target)
            .with_context(|| format!("Failed to enter `{}`", target.display()))?;

        Ok(Self {
            previous,
            _lock: lock,
        })
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            crate::log!("error"; "failed to restore `{}`: {e}", self.previous.display());
        }
    }
}

/// Run `f` while holding the working-directory lock without switching.
///
/// Tests that observe `current_dir()` use this so they don't race a guard
/// held by another test thread.
#[cfg(test)]
pub fn with_lock<T>(f: impl FnOnce() -> T) -> T {
    let _lock = WORKDIR_LOCK.lock();
    f()
}
