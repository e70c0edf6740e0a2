//! Identifier iteration: what happens once an identifier has no more pages

use crate::error::Result;
use crate::paths::list_subdirectories;
use crate::types::{JobDescriptor, StitchDescriptor};

/// Successor produced when the current identifier is exhausted
#[derive(Clone, Debug, PartialEq)]
pub enum Advance {
    /// Start pagination for the next identifier
    NextIdentifier(JobDescriptor),
    /// Every identifier is done; hand the run to the stitch stage
    Handoff(StitchDescriptor),
}

/// Move past the current identifier
///
/// With identifiers left, pagination restarts from `original_url` at
/// sequence 1. Otherwise the directories present under `save_path` are
/// enumerated and handed off for stitching.
pub async fn advance(job: &JobDescriptor) -> Result<Advance> {
    if let Some(next) = job.for_next_identifier() {
        tracing::info!(
            identifier = %next.identifiers[0],
            remaining = next.identifiers.len(),
            "advancing to next identifier"
        );
        return Ok(Advance::NextIdentifier(next));
    }

    let directories = list_subdirectories(&job.save_path).await?;
    tracing::info!(
        save_path = %job.save_path.display(),
        directories = directories.len(),
        "all identifiers processed, handing off to stitch"
    );

    Ok(Advance::Handoff(StitchDescriptor {
        title: format!("stitching data after {}", job.url),
        save_path: job.save_path.clone(),
        original_identifiers: job.original_identifiers.clone(),
        original_url: job.original_url.clone(),
        identifiers: directories,
        user_id: job.user_id.clone(),
        email: job.email.clone(),
        options: job.options.clone(),
    }))
}
