//! # Audit Trail
//!
//! The store reports degradations (unreadable primaries, failed backups, failed
//! writes) to an [`AuditSink`]. Sinks are fire-and-forget: they swallow their own
//! failures and never hand an error back to the caller.
//!
//! ## Implementations
//!
//! - [`FileAuditSink`]: production trail. Every event becomes one line in
//!   `audit.log` (pipe-separated columns) and one JSON record in `audit.jsonl`.
//!   Both files rotate by size and keep a bounded number of rotated copies.
//! - [`TracingAuditSink`]: forwards events to `tracing`.
//! - [`MemoryAuditSink`]: keeps events in memory, for tests.
//! - [`NullAuditSink`]: discards everything.
//!
//! ## Sanitization
//!
//! Text columns have control characters and pipes neutralized so a detail
//! string cannot forge extra columns or lines. Emails and long digit runs are
//! masked in both outputs.

use crate::model::now_iso;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub const AUDIT_LOG_FILE: &str = "audit.log";
pub const AUDIT_JSONL_FILE: &str = "audit.jsonl";
pub const SCHEMA_VERSION: u32 = 1;

const MAX_COLUMN_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditLevel {
    Info,
    Warn,
    Error,
    Security,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Warn => "WARN",
            AuditLevel::Error => "ERROR",
            AuditLevel::Security => "SECURITY",
        }
    }
}

/// Receives audit events. Implementations must not panic or block for long.
pub trait AuditSink: Send + Sync {
    fn log(&self, action: &str, who: &str, detail: &str, level: AuditLevel);

    fn info(&self, action: &str, who: &str, detail: &str) {
        self.log(action, who, detail, AuditLevel::Info);
    }

    fn warn(&self, action: &str, who: &str, detail: &str) {
        self.log(action, who, detail, AuditLevel::Warn);
    }

    fn error(&self, action: &str, who: &str, detail: &str) {
        self.log(action, who, detail, AuditLevel::Error);
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9._%+-]+)@([A-Za-z0-9.-]+\.[A-Za-z]{2,})").expect("valid email regex")
});
static LONG_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{6,})\b").expect("valid digit regex"));

/// Mask emails (`sa***@***`) and digit runs of six or more (`98***`).
pub fn mask_pii(text: &str) -> String {
    let masked = EMAIL_RE.replace_all(text, |caps: &regex::Captures| {
        let user: String = caps[1].chars().take(2).collect();
        format!("{}***@***", user)
    });
    LONG_DIGITS_RE
        .replace_all(&masked, |caps: &regex::Captures| {
            let head: String = caps[1].chars().take(2).collect();
            format!("{}***", head)
        })
        .into_owned()
}

/// Neutralize characters that would break the pipe-separated log format.
pub fn clean_text_column(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| match c {
            '\r' | '\n' | '\t' => ' ',
            '|' => '¦',
            other => other,
        })
        .collect();
    if cleaned.chars().count() > MAX_COLUMN_CHARS {
        let mut cut: String = cleaned.chars().take(MAX_COLUMN_CHARS).collect();
        cut.push('…');
        cut
    } else {
        cleaned
    }
}

/// Recursively mask string leaves of a JSON value.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(mask_pii(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Append-only file that rotates to `<prefix>-<stamp><ext>` once it grows past
/// `rotate_bytes`, keeping the newest `retention` rotated copies.
#[derive(Debug, Clone)]
pub struct RotatingFile {
    path: PathBuf,
    prefix: String,
    rotate_bytes: u64,
    retention: usize,
}

impl RotatingFile {
    pub fn new(path: PathBuf, prefix: &str, rotate_bytes: u64, retention: usize) -> Self {
        Self {
            path,
            prefix: prefix.to_string(),
            rotate_bytes,
            retention,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default()
    }

    /// Append one line (a trailing newline is added) and fsync.
    pub fn append_line(&self, line: &str) -> io::Result<()> {
        self.rotate_if_needed(line.len() as u64 + 1)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{}\n", line).as_bytes())?;
        file.sync_all()
    }

    fn rotate_if_needed(&self, incoming: u64) -> io::Result<()> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if size == 0 || size + incoming <= self.rotate_bytes {
            return Ok(());
        }
        let ext = self.extension();
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let rotated = self
            .path
            .with_file_name(format!("{}-{}{}", self.prefix, stamp, ext));
        fs::rename(&self.path, &rotated)?;
        self.prune_rotated(&ext)
    }

    fn prune_rotated(&self, ext: &str) -> io::Result<()> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };
        let prefix = format!("{}-", self.prefix);
        let mut rotated: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&prefix) && n.ends_with(ext))
                    .unwrap_or(false)
            })
            .collect();
        rotated.sort();
        if rotated.len() > self.retention {
            let excess = rotated.len() - self.retention;
            for old in rotated.into_iter().take(excess) {
                let _ = fs::remove_file(old);
            }
        }
        Ok(())
    }
}

/// Persistent audit trail in a data directory.
#[derive(Debug)]
pub struct FileAuditSink {
    text: RotatingFile,
    jsonl: RotatingFile,
    guard: Mutex<()>,
    dropped: AtomicU64,
}

impl FileAuditSink {
    pub fn new(dir: &Path, rotate_bytes: u64, retention: usize) -> Self {
        Self {
            text: RotatingFile::new(dir.join(AUDIT_LOG_FILE), "audit", rotate_bytes, retention),
            jsonl: RotatingFile::new(
                dir.join(AUDIT_JSONL_FILE),
                "audit",
                rotate_bytes,
                retention,
            ),
            guard: Mutex::new(()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Number of events that could not be written.
    pub fn dropped_writes(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn log_path(&self) -> &Path {
        self.text.path()
    }

    pub fn jsonl_path(&self) -> &Path {
        self.jsonl.path()
    }

    fn format_line(ts: &str, action: &str, who: &str, detail: &str, level: AuditLevel) -> String {
        format!(
            "{} | {:<8} | {:<12} | {:<24} | {}",
            ts,
            level.as_str(),
            clean_text_column(who),
            clean_text_column(action),
            clean_text_column(&mask_pii(detail))
        )
    }
}

impl AuditSink for FileAuditSink {
    fn log(&self, action: &str, who: &str, detail: &str, level: AuditLevel) {
        let ts = now_iso();
        let line = Self::format_line(&ts, action, who, detail, level);
        let record = json!({
            "schema_version": SCHEMA_VERSION,
            "ts": ts,
            "level": level,
            "who": who,
            "action": action,
            "detail": mask_pii(detail),
        });

        let _held = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.text.append_line(&line).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        if self.jsonl.append_line(&record.to_string()).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Forwards audit events to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&self, action: &str, who: &str, detail: &str, level: AuditLevel) {
        let detail = mask_pii(detail);
        match level {
            AuditLevel::Info => tracing::info!(target: "thesisdb::audit", action, who, %detail),
            AuditLevel::Warn => tracing::warn!(target: "thesisdb::audit", action, who, %detail),
            AuditLevel::Error | AuditLevel::Security => {
                tracing::error!(target: "thesisdb::audit", action, who, %detail, severity = level.as_str())
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn log(&self, _action: &str, _who: &str, _detail: &str, _level: AuditLevel) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub action: String,
    pub who: String,
    pub detail: String,
    pub level: AuditLevel,
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn log(&self, action: &str, who: &str, detail: &str, level: AuditLevel) {
        if let Ok(mut events) = self.events.lock() {
            events.push(AuditEvent {
                action: action.to_string(),
                who: who.to_string(),
                detail: detail.to_string(),
                level,
            });
        }
    }
}
