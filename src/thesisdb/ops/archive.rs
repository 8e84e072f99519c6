use super::AUDIT_ACTOR;
use crate::audit::AuditLevel;
use crate::error::{Result, StoreError};
use crate::model::{now_iso, DefenseRecord, Extra, Judges, Keyed, Scores};
use crate::notifications::{NewNotification, NotificationLevel, Notifier};
use crate::resource::{Resource, DEFENDED};
use crate::store::JsonStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Drop every record sharing `record`'s key, then append `record`.
///
/// Running it twice with the same record leaves one copy.
pub fn replace_by_key<T>(store: &JsonStore, resource: &Resource<Vec<T>>, record: T) -> Result<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned,
{
    let key = record.key();
    store.update(resource, |records| {
        records.retain(|r| r.key() != key);
        records.push(record.clone());
        Ok(record)
    })
}

/// A defense as reported by the session that concluded it.
#[derive(Debug, Clone, Default)]
pub struct FinalizedDefense {
    pub student_code: String,
    pub course_id: String,
    pub title: String,
    pub year: i32,
    pub semester: String,
    pub supervisor: String,
    /// Any accepted judges shape, see [`Judges::from_value`].
    pub judges: Value,
    pub scores: Scores,
    pub attendees: Vec<String>,
    pub files: BTreeMap<String, String>,
    /// Extra fields stored verbatim (grade letters and the like).
    pub extra: Extra,
}

impl FinalizedDefense {
    fn into_record(self) -> DefenseRecord {
        let scores = self.scores.clamped();
        DefenseRecord {
            judges: Judges::from_value(&self.judges),
            score: scores.average(),
            scores,
            student_code: self.student_code,
            course_id: self.course_id,
            title: self.title,
            year: self.year,
            semester: self.semester,
            supervisor: self.supervisor,
            attendees: self.attendees,
            files: self.files,
            finalized_at: now_iso(),
            extra: self.extra,
        }
    }
}

/// Archive a finalized defense, replacing any earlier archive entry for the
/// same student and course, then announce it on the notification feed.
///
/// The announcement is a separate write; failing it does not undo the archive.
pub fn archive_defense(store: &JsonStore, defense: FinalizedDefense) -> Result<DefenseRecord> {
    if defense.student_code.is_empty() {
        return Err(StoreError::MissingKey("student_code".to_string()));
    }
    if defense.course_id.is_empty() {
        return Err(StoreError::MissingKey("course_id".to_string()));
    }

    let record = replace_by_key(store, &DEFENDED, defense.into_record())?;
    store.audit().log(
        "ARCHIVE_DEFENSE",
        AUDIT_ACTOR,
        &format!(
            "{}/{} score={:.2}",
            record.student_code, record.course_id, record.score
        ),
        AuditLevel::Info,
    );

    let payload: Map<String, Value> = match json!({
        "student": record.student_code,
        "course": record.course_id,
        "score": record.score,
    }) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let announced = Notifier::new(store).emit(
        NewNotification::new("finalized", payload)
            .level(NotificationLevel::Success)
            .topic("defense")
            .actor(record.supervisor.clone())
            .source("store"),
    );
    if let Err(e) = announced {
        warn!(error = %e, "defense archived but not announced");
    }
    Ok(record)
}
