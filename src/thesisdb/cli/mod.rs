//! # CLI
//!
//! **One UI client** of the thesisdb library: a maintenance tool for a data
//! directory. It is the only place that knows about terminal I/O, exit codes,
//! log subscribers and output formatting. For the architecture see the crate
//! documentation of `thesisdb`.
//!
//! ## Data Directory
//!
//! Resolved from `--data-dir`, then `$THESISDB_HOME`, then the platform data
//! directory (`~/.local/share/thesisdb` on Linux).
//!
//! ## Safety
//!
//! - `show` and `status` never write, even when a resource is corrupt; they
//!   report the fallback source instead. `recover` persists it.
//! - `purge` asks for confirmation unless `--yes` is given, and refuses when
//!   stdin is not a terminal.
//!
//! ## Module Structure
//!
//! - `commands`: Dispatch and per-command handlers that call the API
//! - `render`: Output formatting (status table, backups, notifications, messages)
//! - `setup`: Argument parsing via clap and the `tracing` subscriber

mod commands;
mod render;
pub mod setup;

pub use commands::run;
