use crate::commands::{degraded_message, CmdResult, ResourceStatus};
use crate::error::Result;
use crate::resource::ResourceKind;
use crate::store::JsonStore;
use serde_json::Value;

/// Record count, read source, backup count and lock state of every resource.
pub fn run(store: &JsonStore) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let mut statuses = Vec::with_capacity(ResourceKind::ALL.len());

    for kind in ResourceKind::ALL {
        let resource = kind.untyped();
        let loaded = store.read_with_source::<Vec<Value>>(&resource);
        if let Some(message) = degraded_message(kind, &loaded.source) {
            result.add_message(message);
        }
        statuses.push(ResourceStatus {
            kind,
            records: loaded.content.len(),
            source: loaded.source,
            backups: store.backups(&resource)?.len(),
            lock: store.lock_state(&resource),
        });
    }

    Ok(result.with_statuses(statuses))
}
