use super::AUDIT_ACTOR;
use crate::audit::AuditLevel;
use crate::error::{Result, StoreError};
use crate::model::{Keyed, Thesis};
use crate::resource::{Resource, THESIS};
use crate::store::JsonStore;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Merge `incoming` into `existing`.
///
/// Objects merge key by key, recursing where both sides hold an object.
/// Anything else in `incoming` replaces what was there. Keys absent from
/// `incoming` are left alone.
pub fn deep_merge(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(update)) => {
            for (key, value) in update {
                let nested = value.is_object() && current.get(&key).is_some_and(Value::is_object);
                match current.get_mut(&key) {
                    Some(slot) if nested => deep_merge(slot, value),
                    _ => {
                        current.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Merge `candidate` into the first record whose `key_fields` all equal the
/// candidate's, or append it when none does. Returns the stored record.
///
/// A candidate without a value for every key field is refused before the
/// lock is taken. The merged record must read as a `T`, otherwise nothing is
/// written.
pub fn merge_upsert<T>(
    store: &JsonStore,
    resource: &Resource<Vec<T>>,
    candidate: Map<String, Value>,
    key_fields: &[&str],
) -> Result<T>
where
    T: DeserializeOwned,
{
    for field in key_fields {
        if candidate.get(*field).map(is_blank).unwrap_or(true) {
            return Err(StoreError::MissingKey(field.to_string()));
        }
    }

    let raw: Resource<Vec<Value>> = Resource::new(resource.file_name());
    store.update(&raw, |records| {
        let position = records
            .iter()
            .position(|r| key_fields.iter().all(|f| r.get(*f) == candidate.get(*f)));
        let stored = match position {
            Some(i) => {
                deep_merge(&mut records[i], Value::Object(candidate));
                records[i].clone()
            }
            None => {
                let record = Value::Object(candidate);
                records.push(record.clone());
                record
            }
        };
        Ok(serde_json::from_value(stored)?)
    })
}

/// Insert or merge a thesis keyed by `(student_code, course_id)`.
pub fn upsert_thesis(store: &JsonStore, candidate: Map<String, Value>) -> Result<Thesis> {
    let thesis = merge_upsert(store, &THESIS, candidate, Thesis::KEY_FIELDS)?;
    store.audit().log(
        "UPSERT_THESIS",
        AUDIT_ACTOR,
        &format!("{}/{}", thesis.student_code, thesis.course_id),
        AuditLevel::Info,
    );
    Ok(thesis)
}

/// Set abstract and keywords on a thesis, creating a pending request when
/// the student has none for the course.
pub fn add_thesis_metadata(
    store: &JsonStore,
    student_code: &str,
    course_id: &str,
    abstract_text: &str,
    keywords: &[String],
) -> Result<Thesis> {
    let thesis = store.update(&THESIS, |theses| {
        let index = match theses
            .iter()
            .position(|t| t.student_code == student_code && t.course_id == course_id)
        {
            Some(i) => i,
            None => {
                theses.push(Thesis::pending_request(student_code, course_id));
                theses.len() - 1
            }
        };
        let thesis = &mut theses[index];
        thesis.abstract_text = Some(abstract_text.to_string());
        thesis.keywords = keywords.to_vec();
        Ok::<_, StoreError>(thesis.clone())
    })?;
    store.audit().log(
        "ADD_THESIS_METADATA",
        AUDIT_ACTOR,
        &format!("{}/{}", student_code, course_id),
        AuditLevel::Info,
    );
    Ok(thesis)
}

pub fn find_thesis(store: &JsonStore, student_code: &str, course_id: &str) -> Option<Thesis> {
    store
        .read(&THESIS)
        .into_iter()
        .find(|t| t.student_code == student_code && t.course_id == course_id)
}
