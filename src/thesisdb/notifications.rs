//! # Notification Feed
//!
//! Events worth showing to people (a thesis was approved, a defense was
//! finalized) are kept in `notifications.json` as a bounded list, newest last,
//! and mirrored as JSON lines to `notifications.jsonl` for later analysis.
//!
//! ## Emitting
//!
//! [`Notifier::emit`] sanitizes the payload (emails and long digit runs are
//! masked), replaces payloads above the size cap with a short preview, and
//! appends under the resource lock while trimming the list to the configured
//! window.
//!
//! ## Dedupe
//!
//! A notification with a `dedupe_key` and a positive window is dropped when
//! the last [`DEDUPE_SCAN`] entries already hold the same event and key
//! within that window. The dropped notification is still returned, with
//! `deduplicated` set, so callers can tell what happened.

use crate::audit::{mask_pii, sanitize_value, RotatingFile};
use crate::error::{Result, StoreError};
use crate::model::lenient;
use crate::model::now_iso;
use crate::resource::NOTIFICATIONS;
use crate::store::JsonStore;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

pub const NOTIFICATIONS_JSONL_FILE: &str = "notifications.jsonl";
pub const SCHEMA_VERSION: u32 = 1;
/// How many of the newest entries a dedupe check looks at.
pub const DEDUPE_SCAN: usize = 400;
/// Dedupe windows are capped at ten years.
const MAX_DEDUPE_WINDOW: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Success,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Debug => "debug",
            NotificationLevel::Info => "info",
            NotificationLevel::Warn => "warn",
            NotificationLevel::Error => "error",
            NotificationLevel::Success => "success",
        }
    }
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationLevel {
    type Err = std::convert::Infallible;

    /// Unknown levels read as `info`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "debug" => NotificationLevel::Debug,
            "warn" | "warning" => NotificationLevel::Warn,
            "error" => NotificationLevel::Error,
            "success" => NotificationLevel::Success,
            _ => NotificationLevel::Info,
        })
    }
}

impl<'de> Deserialize<'de> for NotificationLevel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::scalar_to_string(&Value::deserialize(deserializer)?).unwrap_or_default();
        Ok(raw.parse().unwrap_or_default())
    }
}

fn default_source() -> String {
    "cli".to_string()
}

fn default_schema() -> u32 {
    SCHEMA_VERSION
}

fn lenient_source<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(lenient::scalar_to_string(&Value::deserialize(deserializer)?)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default_source))
}

fn lenient_schema<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    Ok(lenient::u32_from(&Value::deserialize(deserializer)?).unwrap_or(SCHEMA_VERSION))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, alias = "timestamp", deserialize_with = "lenient::string")]
    pub ts: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub event: String,
    #[serde(default)]
    pub level: NotificationLevel,
    #[serde(default)]
    pub payload: Value,
    #[serde(default = "default_source", deserialize_with = "lenient_source")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub actor: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub audience: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub correlation_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub dedupe_key: Option<String>,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub dedupe_window_sec: u64,
    #[serde(default = "default_schema", deserialize_with = "lenient_schema")]
    pub schema_version: u32,
    /// Set on the value returned by `emit` when the entry was not stored.
    #[serde(skip)]
    pub deduplicated: bool,
}

impl Notification {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_ts(&self.ts)
    }
}

/// Accepts RFC 3339 and the naive `YYYY-mm-ddTHH:MM:SS[.fff]` form (read as UTC).
fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(ts) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(ts.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Input for [`Notifier::emit`].
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub event: String,
    pub payload: Map<String, Value>,
    pub level: NotificationLevel,
    pub source: Option<String>,
    pub actor: Option<String>,
    pub topic: Option<String>,
    pub tags: Vec<String>,
    pub audience: Option<String>,
    pub correlation_id: Option<String>,
    pub dedupe_key: Option<String>,
    pub dedupe_window_sec: u64,
}

impl NewNotification {
    pub fn new(event: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            event: event.into(),
            payload,
            ..Default::default()
        }
    }

    pub fn level(mut self, level: NotificationLevel) -> Self {
        self.level = level;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Drop repeats of this event with the same key within `window_sec`.
    pub fn dedupe(mut self, key: impl Into<String>, window_sec: u64) -> Self {
        self.dedupe_key = Some(key.into());
        self.dedupe_window_sec = window_sec;
        self
    }
}

/// Outcome of the locked append when it decides not to write.
enum AppendOutcome {
    Duplicate,
    Failed(StoreError),
}

impl From<StoreError> for AppendOutcome {
    fn from(e: StoreError) -> Self {
        AppendOutcome::Failed(e)
    }
}

/// Emits and lists notifications of one store.
pub struct Notifier<'a> {
    store: &'a JsonStore,
    mirror: RotatingFile,
    window: usize,
    payload_max_bytes: usize,
    preview_chars: usize,
}

impl<'a> Notifier<'a> {
    pub fn new(store: &'a JsonStore) -> Self {
        let config = store.config();
        Self {
            mirror: RotatingFile::new(
                store.root().join(NOTIFICATIONS_JSONL_FILE),
                "notifications",
                config.audit_rotate_bytes,
                config.audit_retention,
            ),
            window: config.notification_window(),
            payload_max_bytes: config.payload_max_bytes,
            preview_chars: config.payload_preview_chars,
            store,
        }
    }

    pub fn mirror_path(&self) -> &Path {
        self.mirror.path()
    }

    pub fn emit(&self, new: NewNotification) -> Result<Notification> {
        let payload = sanitize_value(Value::Object(new.payload));
        let mut notification = Notification {
            id: Uuid::new_v4().to_string(),
            ts: now_iso(),
            event: new.event,
            level: new.level,
            payload: self.limit_payload(payload),
            source: new.source.unwrap_or_else(default_source),
            actor: new.actor,
            topic: new.topic,
            tags: new.tags,
            audience: new.audience,
            correlation_id: new.correlation_id,
            dedupe_key: new.dedupe_key,
            dedupe_window_sec: new.dedupe_window_sec,
            schema_version: SCHEMA_VERSION,
            deduplicated: false,
        };

        let window = self.window;
        let appended = self.store.update(&NOTIFICATIONS, |list| {
            if is_duplicate(list, &notification, Utc::now()) {
                return Err(AppendOutcome::Duplicate);
            }
            list.push(notification.clone());
            if list.len() > window {
                let excess = list.len() - window;
                list.drain(..excess);
            }
            Ok(())
        });

        match appended {
            Ok(()) => {}
            Err(AppendOutcome::Duplicate) => {
                debug!(event = %notification.event, "notification deduplicated");
                notification.deduplicated = true;
                return Ok(notification);
            }
            Err(AppendOutcome::Failed(e)) => return Err(e),
        }

        if let Err(e) = self.append_mirror(&notification) {
            warn!(error = %e, "notification mirror append failed");
        }
        Ok(notification)
    }

    /// The newest `limit` notifications, oldest first, optionally only of one
    /// event. Filtering looks at the last `limit * 5` entries.
    pub fn list_recent(&self, limit: usize, event: Option<&str>) -> Vec<Notification> {
        let list = self.store.read(&NOTIFICATIONS);
        let scan = limit.saturating_mul(5).max(limit);
        let tail = &list[list.len().saturating_sub(scan)..];
        let matching: Vec<&Notification> = tail
            .iter()
            .filter(|n| event.map(|e| n.event == e).unwrap_or(true))
            .collect();
        matching[matching.len().saturating_sub(limit)..]
            .iter()
            .map(|n| (*n).clone())
            .collect()
    }

    /// Empty the list and remove the JSON-lines mirror.
    pub fn purge_all(&self) -> Result<()> {
        self.store.purge(&NOTIFICATIONS)?;
        match std::fs::remove_file(self.mirror.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn limit_payload(&self, payload: Value) -> Value {
        let blob = payload.to_string();
        if blob.len() <= self.payload_max_bytes {
            return payload;
        }
        let preview: String = mask_pii(&blob).chars().take(self.preview_chars).collect();
        json!({
            "_truncated": true,
            "size_bytes": blob.len(),
            "preview": preview,
        })
    }

    fn append_mirror(&self, notification: &Notification) -> Result<()> {
        let line = serde_json::to_string(notification)?;
        self.mirror.append_line(&line)?;
        Ok(())
    }
}

fn is_duplicate(list: &[Notification], candidate: &Notification, now: DateTime<Utc>) -> bool {
    let Some(key) = candidate.dedupe_key.as_deref() else {
        return false;
    };
    if candidate.dedupe_window_sec == 0 {
        return false;
    }
    let window = chrono::Duration::seconds(candidate.dedupe_window_sec.min(MAX_DEDUPE_WINDOW) as i64);
    let cutoff = now - window;
    list.iter()
        .rev()
        .take(DEDUPE_SCAN)
        .filter(|n| n.event == candidate.event && n.dedupe_key.as_deref() == Some(key))
        .any(|n| n.timestamp().map(|t| t >= cutoff).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAuditSink;
    use crate::config::StoreConfig;
    use crate::resource::ResourceKind;
    use std::fs;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn store_with(config: StoreConfig) -> (TempDir, JsonStore) {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path(), config, Arc::new(NullAuditSink)).unwrap();
        (dir, store)
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_level_parsing_is_lenient() {
        assert_eq!("SUCCESS".parse::<NotificationLevel>().unwrap(), NotificationLevel::Success);
        assert_eq!("loud".parse::<NotificationLevel>().unwrap(), NotificationLevel::Info);
        let n: Notification = serde_json::from_value(json!({"event": "x", "level": "fatal"})).unwrap();
        assert_eq!(n.level, NotificationLevel::Info);
        assert_eq!(n.source, "cli");
    }

    #[test]
    fn test_mistyped_entries_still_read() {
        let entry: Notification = serde_json::from_value(json!({
            "id": 17,
            "timestamp": "2026-01-01T00:00:00.000Z",
            "event": "defense_scheduled",
            "level": 3,
            "source": null,
            "actor": null,
            "tags": "urgent",
            "dedupe_window_sec": "60",
            "schema_version": null
        }))
        .unwrap();
        assert_eq!(entry.id, "17");
        assert_eq!(entry.level, NotificationLevel::Info);
        assert_eq!(entry.source, "cli");
        assert_eq!(entry.actor, None);
        assert_eq!(entry.tags, vec!["urgent"]);
        assert_eq!(entry.dedupe_window_sec, 60);
        assert_eq!(entry.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_emit_keeps_entries_with_null_fields() {
        let (_dir, store) = store_with(StoreConfig::default());
        let stored = vec![json!({"id": "n1", "event": "thesis_approved", "actor": null, "level": null})];
        store.write(&ResourceKind::Notifications.untyped(), &stored).unwrap();

        let notifier = Notifier::new(&store);
        notifier.emit(NewNotification::new("defense_finalized", Map::new())).unwrap();

        let events: Vec<String> = store.read(&NOTIFICATIONS).into_iter().map(|n| n.event).collect();
        assert_eq!(events, vec!["thesis_approved", "defense_finalized"]);
    }

    #[test]
    fn test_emit_stores_masked_payload_and_mirror() {
        let (_dir, store) = store_with(StoreConfig::default());
        let notifier = Notifier::new(&store);

        let n = notifier
            .emit(
                NewNotification::new("thesis_approved", payload(json!({"email": "sara@uni.ac.ir"})))
                    .level(NotificationLevel::Success)
                    .actor("t01")
                    .topic("thesis"),
            )
            .unwrap();
        assert!(!n.deduplicated);
        assert_eq!(n.payload["email"], "sa***@***");

        let stored = store.read(&NOTIFICATIONS);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, n.id);
        assert_eq!(stored[0].actor.as_deref(), Some("t01"));

        let mirror = fs::read_to_string(notifier.mirror_path()).unwrap();
        let line: Value = serde_json::from_str(mirror.trim()).unwrap();
        assert_eq!(line["event"], "thesis_approved");
        assert_eq!(line["level"], "success");
    }

    #[test]
    fn test_window_keeps_newest_entries() {
        let (_dir, store) = store_with(StoreConfig {
            notification_window: 3,
            ..Default::default()
        });
        let notifier = Notifier::new(&store);
        for i in 0..5 {
            notifier
                .emit(NewNotification::new(format!("e{}", i), Map::new()))
                .unwrap();
        }
        let events: Vec<String> = store.read(&NOTIFICATIONS).into_iter().map(|n| n.event).collect();
        assert_eq!(events, vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn test_dedupe_within_window() {
        let (_dir, store) = store_with(StoreConfig::default());
        let notifier = Notifier::new(&store);
        let make = || NewNotification::new("reminder", Map::new()).dedupe("s001/c1", 600);

        assert!(!notifier.emit(make()).unwrap().deduplicated);
        assert!(notifier.emit(make()).unwrap().deduplicated);
        assert!(!notifier
            .emit(NewNotification::new("reminder", Map::new()).dedupe("s002/c1", 600))
            .unwrap()
            .deduplicated);
        assert_eq!(store.read(&NOTIFICATIONS).len(), 2);
    }

    #[test]
    fn test_dedupe_ignores_entries_outside_window() {
        let old = Notification {
            ts: "2020-01-01T00:00:00.000Z".to_string(),
            event: "reminder".to_string(),
            dedupe_key: Some("k".to_string()),
            ..serde_json::from_value(json!({})).unwrap()
        };
        let candidate = Notification {
            event: "reminder".to_string(),
            dedupe_key: Some("k".to_string()),
            dedupe_window_sec: 60,
            ..old.clone()
        };
        assert!(!is_duplicate(&[old.clone()], &candidate, Utc::now()));
        let now = parse_ts("2020-01-01T00:00:30").unwrap();
        assert!(is_duplicate(&[old], &candidate, now));
    }

    #[test]
    fn test_oversized_payload_is_previewed() {
        let (_dir, store) = store_with(StoreConfig {
            payload_max_bytes: 64,
            payload_preview_chars: 16,
            ..Default::default()
        });
        let notifier = Notifier::new(&store);
        let n = notifier
            .emit(NewNotification::new("ocr_done", payload(json!({"text": "x".repeat(200)}))))
            .unwrap();
        assert_eq!(n.payload["_truncated"], true);
        assert!(n.payload["size_bytes"].as_u64().unwrap() > 200);
        assert_eq!(n.payload["preview"].as_str().unwrap().chars().count(), 16);
    }

    #[test]
    fn test_list_recent_filters_and_limits() {
        let (_dir, store) = store_with(StoreConfig::default());
        let notifier = Notifier::new(&store);
        for i in 0..6 {
            let event = if i % 2 == 0 { "even" } else { "odd" };
            notifier
                .emit(NewNotification::new(event, payload(json!({"i": i}))))
                .unwrap();
        }
        let recent = notifier.list_recent(2, None);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].payload["i"], 5);

        let evens = notifier.list_recent(2, Some("even"));
        let seen: Vec<i64> = evens.iter().map(|n| n.payload["i"].as_i64().unwrap()).collect();
        assert_eq!(seen, vec![2, 4]);
    }

    #[test]
    fn test_purge_all_clears_list_and_mirror() {
        let (_dir, store) = store_with(StoreConfig::default());
        let notifier = Notifier::new(&store);
        notifier.emit(NewNotification::new("x", Map::new())).unwrap();
        notifier.purge_all().unwrap();
        assert!(store.read(&NOTIFICATIONS).is_empty());
        assert!(!notifier.mirror_path().exists());
        notifier.purge_all().unwrap();
    }
}
