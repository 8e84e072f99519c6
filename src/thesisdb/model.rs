//! # Domain Model: Persisted Records
//!
//! Records are typed views over JSON objects. Every record carries an `extra`
//! bag (`#[serde(flatten)]`) so fields written by other tools, or by older and
//! newer versions of this crate, survive a read-modify-write round trip.
//!
//! Every known field has a default and reads through [`lenient`]: a missing
//! key, `null` or a value of the wrong type yields the default, and numbers and
//! strings are coerced into each other. Any JSON object reads as a record, so
//! one sloppy entry never makes the whole file unreadable.
//!
//! ## Composite Keys
//!
//! Helpers that replace or merge records identify them through [`Keyed`]:
//!
//! | Record | Key |
//! |--------|-----|
//! | [`Student`] | `student_code` |
//! | [`Teacher`] | `teacher_code` |
//! | [`Course`] | `course_id` |
//! | [`Thesis`] | `(student_code, course_id)` |
//! | [`DefenseRecord`] | `(student_code, course_id)` |
//!
//! ## Timestamps
//!
//! All timestamps are UTC ISO-8601 strings with millisecond precision and a
//! trailing `Z`, see [`now_iso`].

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub(crate) mod lenient;

pub type Extra = Map<String, Value>;

/// Current UTC time as `2026-10-19T08:14:00.123Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Records addressable by a composite key.
pub trait Keyed {
    /// Names of the JSON fields forming the key, in order.
    const KEY_FIELDS: &'static [&'static str];

    fn key(&self) -> Vec<String>;
}

fn default_true() -> bool {
    true
}

fn default_supervise() -> u32 {
    5
}

fn default_judge() -> u32 {
    10
}

fn supervise_capacity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(lenient::u32_from(&Value::deserialize(deserializer)?).unwrap_or_else(default_supervise))
}

fn judge_capacity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(lenient::u32_from(&Value::deserialize(deserializer)?).unwrap_or_else(default_judge))
}

fn thesis_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient::scalar_to_string(&Value::deserialize(deserializer)?)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(Thesis::pending))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub student_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub password_hash: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: String,
    #[serde(default = "default_true", deserialize_with = "lenient::bool_or_true")]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Keyed for Student {
    const KEY_FIELDS: &'static [&'static str] = &["student_code"];

    fn key(&self) -> Vec<String> {
        vec![self.student_code.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub teacher_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub password_hash: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default = "default_supervise", deserialize_with = "supervise_capacity")]
    pub capacity_supervise: u32,
    #[serde(default = "default_judge", deserialize_with = "judge_capacity")]
    pub capacity_judge: u32,
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: String,
    #[serde(default = "default_true", deserialize_with = "lenient::bool_or_true")]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Keyed for Teacher {
    const KEY_FIELDS: &'static [&'static str] = &["teacher_code"];

    fn key(&self) -> Vec<String> {
        vec![self.teacher_code.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default, deserialize_with = "lenient::string")]
    pub course_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub teacher_code: String,
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub capacity: u32,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_i32"
    )]
    pub year: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub semester: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Keyed for Course {
    const KEY_FIELDS: &'static [&'static str] = &["course_id"];

    fn key(&self) -> Vec<String> {
        vec![self.course_id.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thesis {
    #[serde(default, deserialize_with = "lenient::string")]
    pub student_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub course_id: String,
    #[serde(default = "Thesis::pending", deserialize_with = "thesis_status")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub request_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub approval_date: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        rename = "abstract",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub abstract_text: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient::string_list"
    )]
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Thesis {
    fn pending() -> String {
        "pending".to_string()
    }

    /// A fresh pending request stamped with the current time.
    pub fn pending_request(student_code: &str, course_id: &str) -> Self {
        Self {
            student_code: student_code.to_string(),
            course_id: course_id.to_string(),
            status: Self::pending(),
            request_date: Some(now_iso()),
            approval_date: None,
            title: None,
            abstract_text: None,
            keywords: Vec::new(),
            extra: Extra::new(),
        }
    }
}

impl Keyed for Thesis {
    const KEY_FIELDS: &'static [&'static str] = &["student_code", "course_id"];

    fn key(&self) -> Vec<String> {
        vec![self.student_code.clone(), self.course_id.clone()]
    }
}

/// Defense judges. Always stored as `{"internal": .., "external": ..}` but
/// also read from the legacy list shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Judges {
    pub internal: String,
    pub external: String,
}

impl Judges {
    /// Normalize any accepted judges shape. Unrecognized shapes yield empty codes.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self {
                internal: scalar_string(map.get("internal")),
                external: scalar_string(map.get("external")),
            },
            Value::Array(items) if items.first().map(Value::is_object).unwrap_or(false) => {
                let mut judges = Self::default();
                for item in items {
                    let role = item
                        .get("role")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_lowercase();
                    let code = scalar_string(item.get("code"));
                    match role.as_str() {
                        "internal" => judges.internal = code,
                        "external" => judges.external = code,
                        _ => {}
                    }
                }
                judges
            }
            Value::Array(items)
                if items.len() >= 2
                    && items[..2].iter().all(|v| v.is_string() || v.is_number()) =>
            {
                Self {
                    internal: scalar_string(items.first()),
                    external: scalar_string(items.get(1)),
                }
            }
            _ => Self::default(),
        }
    }
}

impl<'de> Deserialize<'de> for Judges {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Judges::from_value(&value))
    }
}

fn scalar_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub supervisor: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub internal: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub external: f64,
}

impl Scores {
    pub const MAX: f64 = 20.0;

    /// Each score limited to `[0, 20]`; NaN counts as 0.
    pub fn clamped(self) -> Self {
        Self {
            supervisor: clamp_score(self.supervisor),
            internal: clamp_score(self.internal),
            external: clamp_score(self.external),
        }
    }

    /// Mean of the three scores, rounded to two decimals.
    pub fn average(&self) -> f64 {
        let mean = (self.supervisor + self.internal + self.external) / 3.0;
        (mean * 100.0).round() / 100.0
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, Scores::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub student_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub course_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::i32_or_zero")]
    pub year: i32,
    #[serde(default, deserialize_with = "lenient::string")]
    pub semester: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub supervisor: String,
    #[serde(default)]
    pub judges: Judges,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub scores: Scores,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub score: f64,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub attendees: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub files: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub finalized_at: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Keyed for DefenseRecord {
    const KEY_FIELDS: &'static [&'static str] = &["student_code", "course_id"];

    fn key(&self) -> Vec<String> {
        vec![self.student_code.clone(), self.course_id.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_now_iso_format() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-10-19T08:14:00.123Z".len());
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let raw = json!({
            "name": "Sara",
            "student_code": "s001",
            "phone": "0912",
            "prefs": {"lang": "fa"}
        });
        let student: Student = serde_json::from_value(raw).unwrap();
        assert!(student.active);
        assert_eq!(student.extra["phone"], "0912");

        let back = serde_json::to_value(&student).unwrap();
        assert_eq!(back["prefs"]["lang"], "fa");
        assert_eq!(back["phone"], "0912");
    }

    #[test]
    fn test_teacher_capacity_defaults() {
        let teacher: Teacher =
            serde_json::from_value(json!({"name": "Dr. Karimi", "teacher_code": "t01"})).unwrap();
        assert_eq!(teacher.capacity_supervise, 5);
        assert_eq!(teacher.capacity_judge, 10);
    }

    #[test]
    fn test_null_and_mistyped_fields_read() {
        let course: Course = serde_json::from_value(json!({
            "course_id": 12,
            "title": null,
            "capacity": "2",
            "year": "1404"
        }))
        .unwrap();
        assert_eq!(course.course_id, "12");
        assert_eq!(course.title, "");
        assert_eq!(course.capacity, 2);
        assert_eq!(course.year, Some(1404));

        let teacher: Teacher = serde_json::from_value(json!({
            "teacher_code": "t01",
            "capacity_supervise": null,
            "capacity_judge": "x",
            "active": null
        }))
        .unwrap();
        assert_eq!(teacher.capacity_supervise, 5);
        assert_eq!(teacher.capacity_judge, 10);
        assert!(teacher.active);

        let record: DefenseRecord = serde_json::from_value(json!({
            "student_code": "s1",
            "course_id": "c1",
            "title": null,
            "judges": null,
            "scores": "n/a",
            "score": "17.5",
            "attendees": null,
            "files": {"report": "a.pdf", "bad": [1]}
        }))
        .unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.scores, Scores::default());
        assert_eq!(record.score, 17.5);
        assert!(record.attendees.is_empty());
        assert_eq!(record.files.len(), 1);

        let thesis: Thesis =
            serde_json::from_value(json!({"student_code": "s1", "course_id": "c1", "status": null})).unwrap();
        assert_eq!(thesis.status, "pending");
    }

    #[test]
    fn test_thesis_abstract_field_name() {
        let mut thesis = Thesis::pending_request("s001", "c10");
        thesis.abstract_text = Some("On locks".to_string());
        let value = serde_json::to_value(&thesis).unwrap();
        assert_eq!(value["abstract"], "On locks");
        assert_eq!(value["status"], "pending");
        assert_eq!(thesis.key(), vec!["s001", "c10"]);
    }

    #[test]
    fn test_judges_accepts_legacy_shapes() {
        let from_obj = Judges::from_value(&json!({"internal": "t2", "external": "t9"}));
        let from_roles = Judges::from_value(&json!([
            {"role": "External", "code": "t9"},
            {"role": "internal", "code": "t2"}
        ]));
        let from_codes = Judges::from_value(&json!(["t2", "t9", "t4"]));
        let expected = Judges {
            internal: "t2".to_string(),
            external: "t9".to_string(),
        };
        assert_eq!(from_obj, expected);
        assert_eq!(from_roles, expected);
        assert_eq!(from_codes, expected);
        assert_eq!(Judges::from_value(&json!("t2")), Judges::default());
    }

    #[test]
    fn test_defense_record_reads_legacy_judges() {
        let record: DefenseRecord = serde_json::from_value(json!({
            "student_code": "s1",
            "course_id": "c1",
            "judges": [7, 8]
        }))
        .unwrap();
        assert_eq!(record.judges.internal, "7");
        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["judges"], json!({"internal": "7", "external": "8"}));
    }

    #[test]
    fn test_scores_clamp_and_average() {
        let scores = Scores {
            supervisor: 25.0,
            internal: -1.0,
            external: 17.5,
        }
        .clamped();
        assert_eq!(scores.supervisor, 20.0);
        assert_eq!(scores.internal, 0.0);
        assert_eq!(scores.average(), 12.5);

        let thirds = Scores {
            supervisor: 18.0,
            internal: 17.0,
            external: 17.0,
        };
        assert_eq!(thirds.average(), 17.33);
    }
}
