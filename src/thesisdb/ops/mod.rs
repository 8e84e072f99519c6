//! # Domain Helpers
//!
//! Record-level operations built on [`JsonStore::update`](crate::store::JsonStore::update).
//! Each helper is exactly one lock scope on one resource: it either lands
//! completely or not at all. Helpers touching two resources (archiving a
//! defense and announcing it) use two independent scopes.
//!
//! - [`merge`]: deep merge and key-matched upsert, thesis metadata
//! - [`archive`]: replace-by-key and the finalized-defense archive
//! - [`append`]: plain and windowed appends
//! - [`register`]: unique-code registration of students and teachers

pub mod append;
pub mod archive;
pub mod merge;
pub mod register;

pub use append::{append, append_windowed};
pub use archive::{archive_defense, replace_by_key, FinalizedDefense};
pub use merge::{add_thesis_metadata, deep_merge, find_thesis, merge_upsert, upsert_thesis};
pub use register::{register_student, register_teacher, NewStudent, NewTeacher};

/// Audit `who` for operations performed by the store helpers.
pub(crate) const AUDIT_ACTOR: &str = "store";
