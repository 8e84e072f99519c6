use crate::attachments::StoredAttachment;
use crate::notifications::Notification;
use crate::resource::ResourceKind;
use crate::store::{BackupInfo, LockState, ReadSource};
use serde_json::Value;

pub mod attach;
pub mod backups;
pub mod init;
pub mod notifications;
pub mod notify;
pub mod purge;
pub mod recover;
pub mod show;
pub mod status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Health of one resource as reported by `status`.
#[derive(Debug, Clone)]
pub struct ResourceStatus {
    pub kind: ResourceKind,
    pub records: usize,
    pub source: ReadSource,
    pub backups: usize,
    pub lock: LockState,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub statuses: Vec<ResourceStatus>,
    pub document: Option<Value>,
    pub backups: Vec<BackupInfo>,
    pub notifications: Vec<Notification>,
    pub attachment: Option<StoredAttachment>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_statuses(mut self, statuses: Vec<ResourceStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_document(mut self, document: Value) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_backups(mut self, backups: Vec<BackupInfo>) -> Self {
        self.backups = backups;
        self
    }

    pub fn with_notifications(mut self, notifications: Vec<Notification>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_attachment(mut self, attachment: StoredAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Warning added by read-style commands when the primary file was not used.
pub(crate) fn degraded_message(kind: ResourceKind, source: &ReadSource) -> Option<CmdMessage> {
    match source {
        ReadSource::Primary => None,
        other => Some(CmdMessage::warning(format!(
            "{} is unreadable, showing {} (run `thesisdb recover {}` to persist it)",
            kind.file_name(),
            other,
            kind
        ))),
    }
}
