//! # Storage Layer
//!
//! The store keeps each resource as one pretty-printed JSON file and makes it
//! safe to share between processes and threads without a database.
//!
//! ## Building Blocks
//!
//! - [`lock`]: sidecar `<file>.lock` markers, exclusive create, stale recovery
//! - [`atomic`]: temp file + fsync + rename, then fsync of the directory
//! - [`backup`]: timestamped snapshots in `_bak/` with per-resource retention
//! - [`reader`]: reads that fall back to backups, then to the empty default
//! - [`fs::JsonStore`]: the transactional [`update`](fs::JsonStore::update)
//!   tying the above together
//!
//! ## Storage Format
//!
//! ```text
//! <data-dir>/
//! ├── students.json            # one JSON document per resource
//! ├── students.json.lock       # present only while a writer holds the lock
//! ├── thesis.json
//! ├── ...
//! ├── _bak/
//! │   ├── students_20261019-081400-123456.json
//! │   └── thesis_20261019-081402-000031.json
//! ├── audit.log / audit.jsonl  # audit trail (FileAuditSink)
//! └── thesisdb.toml            # optional configuration
//! ```
//!
//! ## Update Lifecycle
//!
//! ```text
//! Idle → LockAcquired → Loaded → Transformed → BackedUp → Written → Released
//! ```
//!
//! A lock timeout ends the update before anything is read. A failing transform
//! releases the lock without writing. A failed backup is a warning and the
//! write continues. A failed write leaves the previous file in place.
//!
//! Reads take no lock: the rename in [`atomic`] guarantees a reader sees
//! either the previous or the next complete file.

pub mod atomic;
pub mod backup;
pub mod fs;
pub mod lock;
pub mod reader;

pub use backup::BackupInfo;
pub use fs::JsonStore;
pub use lock::LockState;
pub use reader::{Loaded, ReadSource};
