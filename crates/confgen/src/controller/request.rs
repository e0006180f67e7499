//! Run inputs and the explicit build context.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overwrite {
    /// Always replace the destination.
    #[default]
    Yes,
    /// Leave an existing destination alone and skip the run.
    No,
    /// Replace the destination only when the generated content differs.
    Update,
}

/// A string that names no overwrite policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid overwrite policy '{0}', expected 'yes', 'no' or 'update'")]
pub struct InvalidOverwrite(pub String);

impl FromStr for Overwrite {
    type Err = InvalidOverwrite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(Overwrite::Yes),
            "no" => Ok(Overwrite::No),
            "update" => Ok(Overwrite::Update),
            _ => Err(InvalidOverwrite(s.to_string())),
        }
    }
}

impl Display for Overwrite {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Overwrite::Yes => "yes",
            Overwrite::No => "no",
            Overwrite::Update => "update",
        })
    }
}

/// One template run: which template, where the output goes, which
/// configurations are switched on or off and which properties are overridden.
///
/// # Example
///
/// ```
/// use confgen::{ConfigRequest, Overwrite};
///
/// let request = ConfigRequest::builder()
///     .template("board.tpl")
///     .output("board.mk")
///     .selected(vec!["debug".to_string()])
///     .overwrite(Overwrite::Update)
///     .build();
/// assert_eq!(request.overwrite, Overwrite::Update);
/// assert!(request.deselected.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(on(PathBuf, into))]
pub struct ConfigRequest {
    /// Template file to compile.
    pub template: PathBuf,
    /// Destination file.
    pub output: PathBuf,
    /// Configurations to switch on. Names are matched ignoring case.
    #[builder(default)]
    #[serde(default)]
    pub selected: Vec<String>,
    /// Configurations to switch off. Applied after `selected`.
    #[builder(default)]
    #[serde(default)]
    pub deselected: Vec<String>,
    /// Property overrides.
    #[builder(default)]
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[builder(default)]
    #[serde(default)]
    pub overwrite: Overwrite,
}

/// Ambient settings shared by the runs of one build.
#[derive(Debug, Clone, Default, Builder)]
#[builder(on(PathBuf, into))]
pub struct BuildContext {
    /// Directory that relative template and output paths are joined onto.
    #[builder(default)]
    pub base_dir: PathBuf,
    /// Log the run inputs at `info` level before running.
    #[builder(default)]
    pub log_config: bool,
}

impl BuildContext {
    /// Resolves `path` against [`BuildContext::base_dir`]. Absolute paths are
    /// returned unchanged.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }
}
