//! # Rendering
//!
//! Turns `CmdResult` parts into terminal text. The `format_*` functions build
//! plain strings so they can be tested; `print_*` add color and write stdout.

use chrono::{DateTime, Utc};
use colored::*;
use serde_json::Value;
use thesisdb::api::{CmdMessage, MessageLevel, ResourceStatus};
use thesisdb::attachments::StoredAttachment;
use thesisdb::notifications::{Notification, NotificationLevel};
use thesisdb::store::{BackupInfo, LockState};

pub const TIME_WIDTH: usize = 16;
const NAME_WIDTH: usize = 22;

pub fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

pub fn print_document(document: &Value) {
    match serde_json::to_string_pretty(document) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", document),
    }
}

pub fn format_lock(lock: &LockState) -> String {
    match lock {
        LockState::Free => "free".to_string(),
        LockState::Held { age } => format!("held {}s", age.as_secs()),
        LockState::Stale { age } => format!("stale {}s", age.as_secs()),
    }
}

pub fn format_status_line(status: &ResourceStatus) -> String {
    format!(
        "{:<name$} {:>7} records  {:>3} backups  lock {:<10} {}",
        status.kind.file_name(),
        status.records,
        status.backups,
        format_lock(&status.lock),
        status.source,
        name = NAME_WIDTH,
    )
}

pub fn print_statuses(statuses: &[ResourceStatus]) {
    for status in statuses {
        let line = format_status_line(status);
        if status.source.is_degraded() || matches!(status.lock, LockState::Stale { .. }) {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
}

pub fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = timeago::Formatter::new();
    formatter.convert(duration.to_std().unwrap_or_default())
}

pub fn print_backups(backups: &[BackupInfo]) {
    for backup in backups {
        let name = backup
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let age = backup.taken_at.map(format_time_ago).unwrap_or_else(|| "unknown".to_string());
        println!(
            "{}  {:>9} B  {}",
            name,
            backup.size,
            format!("{:>width$}", age, width = TIME_WIDTH).dimmed()
        );
    }
}

pub fn format_notification(n: &Notification) -> String {
    let mut line = format!("{} {:<7} {}", n.ts, n.level.as_str(), n.event);
    if let Some(actor) = &n.actor {
        line.push_str(&format!(" by {}", actor));
    }
    if n.payload.as_object().is_some_and(|p| !p.is_empty()) {
        line.push_str(&format!(" {}", n.payload));
    }
    line
}

pub fn print_notifications(notifications: &[Notification]) {
    for n in notifications.iter().filter(|n| !n.deduplicated) {
        let line = format_notification(n);
        let styled = match n.level {
            NotificationLevel::Debug => line.dimmed(),
            NotificationLevel::Info => line.normal(),
            NotificationLevel::Warn => line.yellow(),
            NotificationLevel::Error => line.red(),
            NotificationLevel::Success => line.green(),
        };
        println!("{}", styled);
    }
}

pub fn print_attachment(stored: &StoredAttachment) {
    println!("{}", stored.path.display());
    println!("{}", format!("sha256 {}", stored.sha256).dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use thesisdb::resource::ResourceKind;
    use thesisdb::store::ReadSource;

    #[test]
    fn test_format_lock() {
        assert_eq!(format_lock(&LockState::Free), "free");
        assert_eq!(format_lock(&LockState::Stale { age: Duration::from_secs(90) }), "stale 90s");
    }

    #[test]
    fn test_status_line_mentions_source() {
        let status = ResourceStatus {
            kind: ResourceKind::Thesis,
            records: 3,
            source: ReadSource::Default,
            backups: 2,
            lock: LockState::Free,
        };
        let line = format_status_line(&status);
        assert!(line.starts_with("thesis.json"));
        assert!(line.contains("3 records"));
        assert!(line.ends_with("empty default"));
    }

    #[test]
    fn test_format_notification() {
        let n: Notification = serde_json::from_value(json!({
            "ts": "2026-10-19T08:00:00.000Z",
            "event": "approved",
            "level": "success",
            "actor": "t1",
            "payload": {"student": "s1"}
        }))
        .unwrap();
        let line = format_notification(&n);
        assert!(line.contains("success approved by t1"));
        assert!(line.ends_with(r#"{"student":"s1"}"#));
    }
}
