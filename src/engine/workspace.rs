//! Per-run directory holding downloaded tiles until they are composed

use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, StitchError};

/// Name of a run directory: creation time plus a random suffix.
pub fn run_dir_name(now: OffsetDateTime, id: Uuid) -> String {
    let stamp = now
        .format(format_description!(
            "[year]-[month]-[day]_[hour]-[minute]-[second]"
        ))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());

    let suffix = id.simple().to_string();
    format!("tiles-{}-{}", stamp, &suffix[..8])
}

/// Transient tile directory, removed by [`Workspace::cleanup`].
///
/// Dropping a workspace that was not cleaned up is the last-resort path for
/// abandoned runs and panics: the removal is handed to the blocking pool
/// when a tokio runtime is running, and done inline otherwise.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    removed: bool,
}

impl Workspace {
    /// Create a fresh run directory under `root`.
    pub async fn create(root: &Path) -> Result<Self> {
        let dir = root.join(run_dir_name(OffsetDateTime::now_utc(), Uuid::new_v4()));

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StitchError::storage(&dir, e))?;

        debug!(dir = %dir.display(), "Created tile workspace");

        Ok(Self {
            dir,
            removed: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove the directory and everything in it.
    pub async fn cleanup(mut self) -> Result<()> {
        self.removed = true;

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                debug!(dir = %self.dir.display(), "Removed tile workspace");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StitchError::storage(&self.dir, e)),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        let dir = std::mem::take(&mut self.dir);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_abandoned(&dir));
            }
            Err(_) => remove_abandoned(&dir),
        }
    }
}

fn remove_abandoned(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!(dir = %dir.display(), "Removed abandoned tile workspace"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to remove tile workspace"),
    }
}

/// Write one tile's bytes to its destination.
pub async fn store_tile(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| StitchError::storage(path, e))
}
