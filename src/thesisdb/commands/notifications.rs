use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::notifications::Notifier;
use crate::store::JsonStore;

pub fn run(store: &JsonStore, limit: usize, event: Option<&str>) -> Result<CmdResult> {
    let recent = Notifier::new(store).list_recent(limit, event);
    let mut result = CmdResult::default();
    if recent.is_empty() {
        result.add_message(CmdMessage::info("No notifications."));
    }
    Ok(result.with_notifications(recent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NewNotification;
    use crate::test_utils::TestEnv;
    use serde_json::Map;

    #[test]
    fn test_lists_recent() {
        let env = TestEnv::new();
        let notifier = Notifier::new(&env.store);
        for event in ["a", "b", "a"] {
            notifier.emit(NewNotification::new(event, Map::new())).unwrap();
        }
        let result = run(&env.store, 10, Some("a")).unwrap();
        assert_eq!(result.notifications.len(), 2);
        assert!(result.messages.is_empty());

        let empty = run(&env.store, 10, Some("z")).unwrap();
        assert_eq!(empty.messages.len(), 1);
    }
}
