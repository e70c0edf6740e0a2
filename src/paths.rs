//! Per-identifier output directories
//!
//! Identifier tokens may embed labels (`<primary>=<label>...`). The directory
//! a token's pages land in is named after the labels followed by the primary
//! component. Only printable ASCII survives, and every character that is unsafe
//! in a file name is replaced.

use crate::error::Result;
use crate::types::Identifier;
use std::path::{Path, PathBuf};

/// Characters replaced with `_` in directory names
const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '-', ' '];

/// Directory name for an identifier token
///
/// # Examples
///
/// ```
/// use sensor_export::paths::directory_name;
///
/// assert_eq!(directory_name("007"), "007");
/// assert_eq!(directory_name("egg01=Living Room=North"), "Living_Room_North_egg01");
/// ```
pub fn directory_name(token: &str) -> String {
    let raw = if token.contains('=') {
        let identifier = Identifier::parse(token);
        let mut parts = identifier.labels;
        parts.push(identifier.primary);
        parts.join("_")
    } else {
        token.to_string()
    };
    sanitize(&raw)
}

/// Full path of the directory for an identifier token under `base`
pub fn directory_for(token: &str, base: &Path) -> PathBuf {
    base.join(directory_name(token))
}

/// Create a directory if it does not exist yet
///
/// Returns `true` when the directory was created by this call.
pub async fn ensure_dir(path: &Path) -> Result<bool> {
    if is_dir(path).await {
        return Ok(false);
    }
    match tokio::fs::create_dir_all(path).await {
        Ok(()) => Ok(true),
        // Another invocation won the race
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && is_dir(path).await => {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Names of the directories directly under `path`, sorted
///
/// A missing `path` yields an empty list.
pub async fn list_subdirectories(path: &Path) -> Result<Vec<String>> {
    if !is_dir(path).await {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| *c == ' ' || c.is_ascii_graphic())
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
