//! Disk writer for decoded pages and the run status marker

use crate::error::Result;
use crate::paths::ensure_dir;
use crate::types::{Record, StatusMarker};
use std::path::{Path, PathBuf};

/// File name of the status marker at the root of a run directory
pub const STATUS_FILE: &str = "status.json";

/// Write one page of records to `<dir>/<sequence>.json`
///
/// The page is written to a temporary file first and renamed into place, so
/// observers never see a half-written page. Rerunning the same job overwrites
/// the same path.
pub async fn write_page(dir: &Path, sequence: u64, records: &[Record]) -> Result<PathBuf> {
    let path = dir.join(format!("{sequence}.json"));
    let bytes = serde_json::to_vec(records)?;
    write_atomic(&path, &bytes).await?;
    tracing::debug!(path = %path.display(), records = records.len(), "wrote page");
    Ok(path)
}

/// Make sure the run root exists
///
/// When this call creates the directory it also writes the initial
/// `{"complete": false}` status marker. Returns `true` on first creation.
pub async fn ensure_run_root(save_path: &Path) -> Result<bool> {
    let created = ensure_dir(save_path).await?;
    if created {
        let bytes = serde_json::to_vec(&StatusMarker { complete: false })?;
        write_atomic(&save_path.join(STATUS_FILE), &bytes).await?;
        tracing::info!(save_path = %save_path.display(), "created export run directory");
    }
    Ok(created)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
