use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::resource::ResourceKind;
use crate::store::{JsonStore, ReadSource};
use serde_json::Value;

pub fn run(store: &JsonStore, kind: ResourceKind) -> Result<CmdResult> {
    let source = store.recover::<Vec<Value>>(&kind.untyped())?;
    let mut result = CmdResult::default();
    let message = match source {
        ReadSource::Primary => CmdMessage::info(format!("{} is healthy, nothing to do.", kind.file_name())),
        other => CmdMessage::success(format!("Restored {} from {}.", kind.file_name(), other)),
    };
    result.add_message(message);
    Ok(result)
}
