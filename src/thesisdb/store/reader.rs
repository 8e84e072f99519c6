//! Resilient reads.
//!
//! A read never fails: a damaged primary file falls back to the newest backup
//! that parses, and failing that to the resource's empty default. The primary
//! is never rewritten here; persisting recovered content is an explicit
//! [`JsonStore::recover`](super::JsonStore::recover).

use super::backup::{file_stem, BackupRotator};
use crate::audit::{AuditLevel, AuditSink};
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where the returned content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSource {
    Primary,
    Backup(PathBuf),
    Default,
}

impl ReadSource {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, ReadSource::Primary)
    }
}

impl fmt::Display for ReadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadSource::Primary => write!(f, "primary"),
            ReadSource::Backup(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                write!(f, "backup {}", name)
            }
            ReadSource::Default => write!(f, "empty default"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<C> {
    pub content: C,
    pub source: ReadSource,
}

pub(crate) fn parse_file<C: DeserializeOwned>(path: &Path) -> Result<C, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

/// Read `path`, falling back through the backups of its stem.
pub fn read_resilient<C>(path: &Path, backups: &BackupRotator, audit: &dyn AuditSink) -> Loaded<C>
where
    C: DeserializeOwned + Default,
{
    let err = match parse_file(path) {
        Ok(content) => {
            return Loaded {
                content,
                source: ReadSource::Primary,
            }
        }
        Err(err) => err,
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    warn!(file = %name, error = %err, "primary read failed, trying backups");
    audit.log(
        "JSON_READ_FAILED",
        "system",
        &format!("{}: {}", name, err),
        AuditLevel::Warn,
    );

    let snapshots = match backups.snapshots(&file_stem(path)) {
        Ok(snapshots) => snapshots,
        Err(e) => {
            warn!(error = %e, "cannot list backups");
            Vec::new()
        }
    };
    for snapshot in snapshots {
        match parse_file(&snapshot) {
            Ok(content) => {
                debug!(snapshot = %snapshot.display(), "read served from backup");
                return Loaded {
                    content,
                    source: ReadSource::Backup(snapshot),
                };
            }
            Err(e) => debug!(snapshot = %snapshot.display(), error = %e, "backup unusable"),
        }
    }

    Loaded {
        content: C::default(),
        source: ReadSource::Default,
    }
}
