//! # Named Resources
//!
//! A resource is one JSON document in the data directory. [`Resource<C>`] is a
//! typed handle: `C` is the content type the file holds and its
//! `Default` value is the declared empty shape written when the file is
//! created or purged (`Vec<_>` gives `[]`, a map gives `{}`).
//!
//! The catalog below is the fixed set of resources the thesis workflow uses.
//! [`ResourceKind`] names them for the CLI, where the content is handled as
//! untyped JSON.

use crate::error::StoreError;
use crate::model::{Course, DefenseRecord, Student, Teacher, Thesis};
use crate::notifications::Notification;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

pub struct Resource<C> {
    file_name: &'static str,
    _content: PhantomData<fn() -> C>,
}

impl<C> Resource<C> {
    pub const fn new(file_name: &'static str) -> Self {
        Self {
            file_name,
            _content: PhantomData,
        }
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    /// File name without the `.json` extension; the backup prefix.
    pub fn stem(&self) -> &'static str {
        self.file_name
            .strip_suffix(".json")
            .unwrap_or(self.file_name)
    }
}

impl<C> Clone for Resource<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Resource<C> {}

impl<C> fmt::Debug for Resource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resource").field(&self.file_name).finish()
    }
}

pub const STUDENTS: Resource<Vec<Student>> = Resource::new("students.json");
pub const TEACHERS: Resource<Vec<Teacher>> = Resource::new("teachers.json");
pub const COURSES: Resource<Vec<Course>> = Resource::new("courses.json");
pub const THESIS: Resource<Vec<Thesis>> = Resource::new("thesis.json");
pub const DEFENDED: Resource<Vec<DefenseRecord>> = Resource::new("defended_thesis.json");
pub const NOTIFICATIONS: Resource<Vec<Notification>> = Resource::new("notifications.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Students,
    Teachers,
    Courses,
    Thesis,
    Defended,
    Notifications,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Students,
        ResourceKind::Teachers,
        ResourceKind::Courses,
        ResourceKind::Thesis,
        ResourceKind::Defended,
        ResourceKind::Notifications,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ResourceKind::Students => STUDENTS.file_name(),
            ResourceKind::Teachers => TEACHERS.file_name(),
            ResourceKind::Courses => COURSES.file_name(),
            ResourceKind::Thesis => THESIS.file_name(),
            ResourceKind::Defended => DEFENDED.file_name(),
            ResourceKind::Notifications => NOTIFICATIONS.file_name(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Students => "students",
            ResourceKind::Teachers => "teachers",
            ResourceKind::Courses => "courses",
            ResourceKind::Thesis => "thesis",
            ResourceKind::Defended => "defended",
            ResourceKind::Notifications => "notifications",
        }
    }

    /// The same file viewed as a list of untyped JSON records.
    pub fn untyped(&self) -> Resource<Vec<Value>> {
        Resource::new(self.file_name())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = StoreError;

    /// Accepts the short name, the file stem or the file name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| {
                let file = kind.file_name();
                wanted == kind.name()
                    || wanted == file
                    || Some(wanted.as_str()) == file.strip_suffix(".json")
            })
            .ok_or_else(|| StoreError::UnknownResource(s.to_string()))
    }
}
