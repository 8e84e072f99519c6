//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for UI
//! clients such as the CLI.
//!
//! The facade:
//! - **Dispatches** to the matching `commands::<cmd>::run`
//! - **Normalizes inputs**: resource names (`"students"`, `"thesis.json"`,
//!   `"defended"`) become [`ResourceKind`]s, raw payload strings become maps
//! - **Returns structured types** (`Result<CmdResult>`), never strings
//!
//! Record-level domain helpers (`ops::*`) take the store directly; reach
//! them through [`ThesisApi::store`].

use crate::commands::{self, CmdResult};
use crate::error::Result;
use crate::notifications::{NewNotification, NotificationLevel};
use crate::resource::ResourceKind;
use crate::store::JsonStore;
use std::path::Path;
use std::str::FromStr;

pub use crate::commands::{CmdMessage, MessageLevel, ResourceStatus};

pub struct ThesisApi {
    store: JsonStore,
}

/// Arguments of `notify` as they arrive from a UI.
#[derive(Debug, Clone, Default)]
pub struct NotifyRequest {
    pub event: String,
    pub payload: Option<String>,
    pub level: Option<String>,
    pub actor: Option<String>,
    pub topic: Option<String>,
}

impl ThesisApi {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub fn init(&self) -> Result<CmdResult> {
        commands::init::run(&self.store)
    }

    pub fn status(&self) -> Result<CmdResult> {
        commands::status::run(&self.store)
    }

    pub fn show(&self, resource: &str) -> Result<CmdResult> {
        commands::show::run(&self.store, ResourceKind::from_str(resource)?)
    }

    pub fn backups(&self, resource: &str) -> Result<CmdResult> {
        commands::backups::run(&self.store, ResourceKind::from_str(resource)?)
    }

    pub fn recover(&self, resource: &str) -> Result<CmdResult> {
        commands::recover::run(&self.store, ResourceKind::from_str(resource)?)
    }

    pub fn purge(&self, resource: &str) -> Result<CmdResult> {
        commands::purge::run(&self.store, ResourceKind::from_str(resource)?)
    }

    pub fn notify(&self, request: NotifyRequest) -> Result<CmdResult> {
        let payload = commands::notify::parse_payload(request.payload.as_deref())?;
        let mut new = NewNotification::new(request.event, payload).source("cli");
        if let Some(level) = request.level.as_deref() {
            new = new.level(level.parse().unwrap_or(NotificationLevel::Info));
        }
        if let Some(actor) = request.actor {
            new = new.actor(actor);
        }
        if let Some(topic) = request.topic {
            new = new.topic(topic);
        }
        commands::notify::run(&self.store, new)
    }

    pub fn notifications(&self, limit: usize, event: Option<&str>) -> Result<CmdResult> {
        commands::notifications::run(&self.store, limit, event)
    }

    pub fn attach(&self, src: &Path, name: Option<&str>, dedupe: bool) -> Result<CmdResult> {
        commands::attach::run(&self.store, src, name, dedupe)
    }
}
