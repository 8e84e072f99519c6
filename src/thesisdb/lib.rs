//! # thesisdb Architecture
//!
//! thesisdb is the **persistence engine** of a thesis-management workflow. It keeps
//! a fixed catalog of resources (students, teachers, courses, active thesis records,
//! archived defenses, notifications) as flat JSON files and makes them safe to share
//! between concurrent processes and threads. The CLI is one client of the library,
//! an HTTP server or a worker pool are others.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Normalizes inputs (resource names → ResourceKind)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command + Domain Layer (commands/*.rs, ops/, notifications)│
//! │  - Maintenance commands returning CmdResult                 │
//! │  - Record helpers: upsert, archive, windowed append         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - Lock markers, atomic writes, backups, resilient reads    │
//! │  - JsonStore::update, the one way to mutate a resource      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: Every Mutation Is One Update
//!
//! Code that changes a resource does so inside [`store::JsonStore::update`]:
//! lock, read, transform, back up, write atomically, unlock. A transform that
//! fails leaves the file byte-for-byte unchanged. Reads never block and never
//! fail: a corrupt primary falls back to the newest readable backup, then to
//! the empty default, and the degradation is reported to the audit sink.
//!
//! From `api.rs` inward, code never writes to stdout/stderr and never exits the
//! process. Diagnostics go through `tracing`; the persisted trail goes through
//! [`audit::AuditSink`].
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade used by the CLI
//! - [`commands`]: Maintenance commands (status, show, recover, purge, ...)
//! - [`store`]: Locking, atomic writes, backups and the transactional update
//! - [`resource`]: The resource catalog and typed resource handles
//! - [`model`]: Typed records (`Student`, `Thesis`, `DefenseRecord`, ...)
//! - [`ops`]: Domain helpers built on `update`
//! - [`notifications`]: The notification feed with dedupe and a JSON-lines mirror
//! - [`attachments`]: Content-addressed, dedupe-aware file storage
//! - [`audit`]: Audit sinks and PII masking
//! - [`config`]: Configuration management
//! - [`error`]: Error types
//! - `cli`: Argument parsing, logging setup and rendering for the binary (not part of the lib API)

pub mod api;
pub mod attachments;
pub mod audit;
pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod notifications;
pub mod ops;
pub mod resource;
pub mod store;

#[cfg(test)]
mod test_utils;
