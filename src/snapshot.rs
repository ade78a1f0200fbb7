//! Snapshot files for offline planning.
//!
//! `sync --dump DIR` writes `source.json` and `target.json`; `plan` reads them
//! back.

use anyhow::{Context, Result};
use reconcile::{MailboxWithPermissions, ScimGroup, ScimUser};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SOURCE_FILE: &str = "source.json";
pub const TARGET_FILE: &str = "target.json";

/// Fetched mailboxes with their permission grants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub mailboxes: Vec<MailboxWithPermissions>,
}

/// Fetched SCIM users and groups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetFile {
    #[serde(default)]
    pub users: Vec<ScimUser>,
    #[serde(default)]
    pub groups: Vec<ScimGroup>,
}

pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid snapshot format in {}", path.display()))
}

pub fn write<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))
}

/// Write both snapshots into `dir`, creating it if needed.
pub fn dump(dir: &Path, source: &SourceFile, target: &TargetFile) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;

    let source_path = dir.join(SOURCE_FILE);
    let target_path = dir.join(TARGET_FILE);
    write(&source_path, source)?;
    write(&target_path, target)?;
    Ok((source_path, target_path))
}
