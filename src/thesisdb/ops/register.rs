use super::AUDIT_ACTOR;
use crate::audit::AuditLevel;
use crate::error::{Result, StoreError};
use crate::model::{now_iso, Extra, Student, Teacher};
use crate::resource::{STUDENTS, TEACHERS};
use crate::store::JsonStore;

/// A student to register. The password arrives already hashed.
#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub name: String,
    pub student_code: String,
    pub password_hash: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTeacher {
    pub name: String,
    pub teacher_code: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub capacity_supervise: u32,
    pub capacity_judge: u32,
}

impl Default for NewTeacher {
    fn default() -> Self {
        Self {
            name: String::new(),
            teacher_code: String::new(),
            password_hash: String::new(),
            email: None,
            capacity_supervise: 5,
            capacity_judge: 10,
        }
    }
}

fn is_email(s: &str) -> bool {
    s.contains('@') && !s.contains(char::is_whitespace)
}

fn check_email(kind: &str, email: &str) -> Result<()> {
    if !email.is_empty() && !is_email(email) {
        return Err(StoreError::Rejected(format!("Invalid {} email", kind)));
    }
    Ok(())
}

/// Add a student with a unique `student_code`. Returns the stored record.
pub fn register_student(store: &JsonStore, new: NewStudent) -> Result<Student> {
    if new.student_code.trim().is_empty() {
        return Err(StoreError::MissingKey("student_code".to_string()));
    }
    let email = new.email.unwrap_or_default();
    check_email("student", &email)?;

    let record = Student {
        name: new.name,
        student_code: new.student_code,
        password_hash: new.password_hash,
        email,
        created_at: now_iso(),
        active: true,
        extra: Extra::new(),
    };
    let stored = store.update(&STUDENTS, |students| {
        if students.iter().any(|s| s.student_code == record.student_code) {
            return Err(StoreError::Duplicate(format!(
                "student_code {} already exists",
                record.student_code
            )));
        }
        students.push(record.clone());
        Ok(record)
    })?;
    store
        .audit()
        .log("REGISTER_STUDENT", AUDIT_ACTOR, &stored.student_code, AuditLevel::Info);
    Ok(stored)
}

/// Add a teacher with a unique `teacher_code`. Returns the stored record.
pub fn register_teacher(store: &JsonStore, new: NewTeacher) -> Result<Teacher> {
    if new.teacher_code.trim().is_empty() {
        return Err(StoreError::MissingKey("teacher_code".to_string()));
    }
    let email = new.email.unwrap_or_default();
    check_email("teacher", &email)?;

    let record = Teacher {
        name: new.name,
        teacher_code: new.teacher_code,
        password_hash: new.password_hash,
        email,
        capacity_supervise: new.capacity_supervise,
        capacity_judge: new.capacity_judge,
        created_at: now_iso(),
        active: true,
        extra: Extra::new(),
    };
    let stored = store.update(&TEACHERS, |teachers| {
        if teachers.iter().any(|t| t.teacher_code == record.teacher_code) {
            return Err(StoreError::Duplicate(format!(
                "teacher_code {} already exists",
                record.teacher_code
            )));
        }
        teachers.push(record.clone());
        Ok(record)
    })?;
    store
        .audit()
        .log("REGISTER_TEACHER", AUDIT_ACTOR, &stored.teacher_code, AuditLevel::Info);
    Ok(stored)
}
