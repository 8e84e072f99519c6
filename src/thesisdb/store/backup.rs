//! Timestamped backup snapshots.
//!
//! Every write first copies the current file into the shared backup directory
//! as `<stem>_<UTC timestamp>.json`. Timestamps are fixed width, so sorting
//! names sorts snapshots by age. Only the newest `retention` snapshots per
//! resource are kept; a retention of 0 keeps everything.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const BACKUP_DIR_NAME: &str = "_bak";
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub taken_at: Option<DateTime<Utc>>,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct BackupRotator {
    dir: PathBuf,
    retention: usize,
}

impl BackupRotator {
    pub fn new(dir: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            dir: dir.into(),
            retention,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Snapshot `path` (if it exists) and prune old snapshots.
    /// Returns the new snapshot path, or `None` when there was nothing to copy.
    pub fn rotate(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        if !path.exists() {
            return Ok(None);
        }
        let stem = file_stem(path);
        fs::create_dir_all(&self.dir)?;

        let stamp = Utc::now().format("%Y%m%d-%H%M%S-%6f");
        let dst = self.dir.join(format!("{}_{}.json", stem, stamp));
        fs::copy(path, &dst)?;
        debug!(snapshot = %dst.display(), "backup taken");

        self.prune(&stem)?;
        Ok(Some(dst))
    }

    /// Delete every snapshot of `stem` beyond the retention count, oldest first.
    pub fn prune(&self, stem: &str) -> io::Result<usize> {
        if self.retention == 0 {
            return Ok(0);
        }
        let mut removed = 0;
        for old in self.snapshots(stem)?.into_iter().skip(self.retention) {
            match fs::remove_file(&old) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(snapshot = %old.display(), error = %e, "failed to prune backup"),
            }
        }
        Ok(removed)
    }

    /// Snapshot paths for `stem`, newest first.
    pub fn snapshots(&self, stem: &str) -> io::Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", stem);
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stamp) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };
            if parse_stamp(stamp).is_some() {
                found.push(entry.path());
            }
        }
        found.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(found)
    }

    /// Snapshot details for `stem`, newest first.
    pub fn list(&self, stem: &str) -> io::Result<Vec<BackupInfo>> {
        let prefix = format!("{}_", stem);
        self.snapshots(stem)?
            .into_iter()
            .map(|path| {
                let size = fs::metadata(&path)?.len();
                let taken_at = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix(&prefix))
                    .and_then(|n| n.strip_suffix(".json"))
                    .and_then(parse_stamp);
                Ok(BackupInfo {
                    path,
                    taken_at,
                    size,
                })
            })
            .collect()
    }
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Accepts `YYYYmmdd-HHMMSS` and `YYYYmmdd-HHMMSS-ffffff`.
fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let (base, micros) = match stamp.len() {
        15 => (stamp, 0),
        22 if stamp.as_bytes()[15] == b'-' => {
            let frac = &stamp[16..];
            if !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (&stamp[..15], frac.parse::<u32>().ok()?)
        }
        _ => return None,
    };
    let naive = NaiveDateTime::parse_from_str(base, STAMP_FORMAT).ok()?;
    let naive = naive.checked_add_signed(chrono::Duration::microseconds(micros as i64))?;
    Some(naive.and_utc())
}
