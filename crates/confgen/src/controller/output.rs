//! All-or-nothing commit of generated output.
//!
//! The generated text is written to a temporary file next to the destination
//! and renamed over it, so readers never observe a partial file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::error::ConfigError;
use super::request::Overwrite;

/// What a run did to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The destination did not exist and was written.
    Created,
    /// An existing destination was replaced.
    Replaced,
    /// The destination already held the generated content.
    Unchanged,
    /// The destination existed and the overwrite policy is `no`.
    Skipped,
}

/// Writes `content` to `path` according to `policy`.
pub(crate) fn commit(
    path: &Path,
    content: &str,
    policy: Overwrite,
) -> Result<Outcome, ConfigError> {
    let exists = path.exists();
    if exists {
        match policy {
            Overwrite::No => {
                info!(path = %path.display(), "skipped configuring, overwrite is off");
                return Ok(Outcome::Skipped);
            }
            Overwrite::Update => {
                let existing = fs::read(path).map_err(|source| commit_error(path, source))?;
                if existing == content.as_bytes() {
                    info!(path = %path.display(), "skipped configuring, existing file is identical");
                    return Ok(Outcome::Unchanged);
                }
                debug!(path = %path.display(), "content changed, replacing");
            }
            Overwrite::Yes => {}
        }
    }

    write_atomically(path, content).map_err(|source| commit_error(path, source))?;
    if exists {
        info!(path = %path.display(), "configured project");
        Ok(Outcome::Replaced)
    } else {
        debug!(path = %path.display(), "created output");
        Ok(Outcome::Created)
    }
}

fn write_atomically(path: &Path, content: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut temporary = NamedTempFile::new_in(dir)?;
    temporary.write_all(content.as_bytes())?;
    temporary.flush()?;
    temporary.persist(path).map_err(|error| error.error)?;
    Ok(())
}

fn commit_error(path: &Path, source: io::Error) -> ConfigError {
    ConfigError::Commit {
        path: path.to_path_buf(),
        source,
    }
}
