use crate::commands::{CmdMessage, CmdResult};
use crate::error::{Result, StoreError};
use crate::notifications::{NewNotification, Notifier};
use crate::store::JsonStore;
use serde_json::{Map, Value};

/// Parse a `--payload` argument. It must be a JSON object; absent means `{}`.
pub fn parse_payload(raw: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Rejected("payload must be a JSON object".to_string())),
    }
}

pub fn run(store: &JsonStore, new: NewNotification) -> Result<CmdResult> {
    let notification = Notifier::new(store).emit(new)?;
    let mut result = CmdResult::default();
    if notification.deduplicated {
        result.add_message(CmdMessage::info(format!(
            "Skipped duplicate {} notification.",
            notification.event
        )));
    } else {
        result.add_message(CmdMessage::success(format!(
            "Recorded {} ({}).",
            notification.event, notification.id
        )));
    }
    Ok(result.with_notifications(vec![notification]))
}
