use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::notifications::Notifier;
use crate::resource::ResourceKind;
use crate::store::JsonStore;

/// Reset a resource to its empty default. Notifications also lose their
/// JSON-lines mirror. The previous content stays available as a backup.
pub fn run(store: &JsonStore, kind: ResourceKind) -> Result<CmdResult> {
    match kind {
        ResourceKind::Notifications => Notifier::new(store).purge_all()?,
        other => store.purge(&other.untyped())?,
    }
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Purged {}; the previous content is kept in backups.",
        kind.file_name()
    )));
    Ok(result)
}
