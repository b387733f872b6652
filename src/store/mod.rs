// src/store/mod.rs
pub mod prefs;
pub mod seen;

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Persistence failures are fatal to the current cycle: if seen-ids cannot be
/// durably recorded, nothing downstream may notify.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store decode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable JSON write: temp file in the same directory, fsync, then rename
/// over the target. A crash mid-write leaves the previous file intact.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value)?;
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
