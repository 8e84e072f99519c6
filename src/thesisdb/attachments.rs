//! # Attachments
//!
//! Files uploaded alongside records (thesis PDFs, page scans) are copied into a
//! directory under the data dir with the same temp-then-rename protocol as the
//! JSON resources. Each stored file gets a `<file>.sha256` sidecar holding its
//! digest.
//!
//! With dedupe on, a file whose content already exists (same extension, same
//! sidecar digest) is not copied again; the existing path is returned. Without
//! it, or when the content is new, a taken name gets a `_v2`, `_v3`, ...
//! suffix instead of being overwritten.

use crate::error::{Result, StoreError};
use crate::store::atomic::{atomic_copy, write_atomic};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const ATTACHMENTS_DIR_NAME: &str = "files";
const SIDECAR_SUFFIX: &str = ".sha256";
const MAX_BASENAME_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    pub path: PathBuf,
    pub sha256: String,
    pub size: u64,
    /// True when an identical file was already stored and no copy was made.
    pub reused: bool,
}

/// Make `name` safe to use as a single path component.
///
/// Spaces become `_`, characters other than letters, digits, `.`, `_` and
/// `-` become `_`, leading dots are stripped and the part before the
/// extension is cut to 120 characters. Arabic `ي`/`ك` are written as the
/// Persian `ی`/`ک`.
pub fn secure_filename(name: &str) -> String {
    let mapped: String = name
        .trim()
        .chars()
        .map(|c| match c {
            'ي' => 'ی',
            'ك' => 'ک',
            c if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') => c,
            _ => '_',
        })
        .collect();
    let stripped = mapped.trim_start_matches('.');
    if stripped.is_empty() {
        return fallback_name();
    }
    match stripped.rsplit_once('.') {
        Some((base, ext)) => {
            let base: String = base.chars().take(MAX_BASENAME_CHARS).collect();
            format!("{}.{}", base, ext)
        }
        None => stripped.chars().take(MAX_BASENAME_CHARS).collect(),
    }
}

fn fallback_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("file_{}", secs)
}

/// Hex SHA-256 of a file, read in 1 MiB chunks.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(SIDECAR_SUFFIX);
    path.with_file_name(name)
}

/// `report.pdf` → `report_v2.pdf`, `report_v3.pdf`, ... until a free name.
fn versioned(dest: PathBuf) -> PathBuf {
    if !dest.exists() {
        return dest;
    }
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = dest
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (2u32..)
        .map(|i| dest.with_file_name(format!("{}_v{}{}", stem, i, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(dest)
}

pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The conventional `<data-dir>/files` location.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(ATTACHMENTS_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `src` in under `name` (sanitized).
    pub fn store(&self, src: &Path, name: &str, dedupe: bool) -> Result<StoredAttachment> {
        let meta = fs::metadata(src).map_err(|e| {
            StoreError::InvalidAttachment(format!("{}: {}", src.display(), e))
        })?;
        if !meta.is_file() {
            return Err(StoreError::InvalidAttachment(format!(
                "{} is not a regular file",
                src.display()
            )));
        }
        if meta.len() == 0 {
            return Err(StoreError::InvalidAttachment(format!(
                "{} is empty",
                src.display()
            )));
        }

        fs::create_dir_all(&self.dir)?;
        let sha256 = sha256_file(src)?;
        let name = secure_filename(name);
        let target = self.dir.join(&name);

        if dedupe {
            if let Some(existing) = self.find_by_hash(&sha256, target.extension().and_then(|e| e.to_str())) {
                debug!(path = %existing.display(), "attachment already stored");
                return Ok(StoredAttachment {
                    path: existing,
                    sha256,
                    size: meta.len(),
                    reused: true,
                });
            }
        }

        let dest = versioned(target);
        let size = atomic_copy(src, &dest)?;
        if let Err(e) = write_atomic(&sidecar_path(&dest), sha256.as_bytes()) {
            warn!(path = %dest.display(), error = %e, "could not write digest sidecar");
        }
        debug!(path = %dest.display(), size, "attachment stored");
        Ok(StoredAttachment {
            path: dest,
            sha256,
            size,
            reused: false,
        })
    }

    /// A stored file with the same extension whose sidecar holds `sha256`.
    fn find_by_hash(&self, sha256: &str, ext: Option<&str>) -> Option<PathBuf> {
        let entries = fs::read_dir(&self.dir).ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == ext)
            .collect();
        candidates.sort();
        candidates.into_iter().find(|p| {
            fs::read_to_string(sidecar_path(p))
                .map(|digest| digest.trim() == sha256)
                .unwrap_or(false)
        })
    }
}
