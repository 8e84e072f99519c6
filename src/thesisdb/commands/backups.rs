use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::resource::ResourceKind;
use crate::store::JsonStore;

pub fn run(store: &JsonStore, kind: ResourceKind) -> Result<CmdResult> {
    let backups = store.backups(&kind.untyped())?;
    let mut result = CmdResult::default();
    if backups.is_empty() {
        result.add_message(CmdMessage::info(format!("No backups of {} yet.", kind.file_name())));
    }
    Ok(result.with_backups(backups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use serde_json::{json, Value};

    #[test]
    fn test_backups_newest_first() {
        let env = TestEnv::new();
        let thesis = ResourceKind::Thesis.untyped();
        for i in 0..3 {
            env.store.write(&thesis, &vec![json!({"n": i})]).unwrap();
        }
        let result = run(&env.store, ResourceKind::Thesis).unwrap();
        assert_eq!(result.backups.len(), 3);
        assert!(result.backups[0].taken_at >= result.backups[1].taken_at);

        let newest: Vec<Value> =
            serde_json::from_slice(&std::fs::read(&result.backups[0].path).unwrap()).unwrap();
        assert_eq!(newest, vec![json!({"n": 1})]);
    }

    #[test]
    fn test_no_backups_message() {
        let env = TestEnv::new();
        let result = run(&env.store, ResourceKind::Defended).unwrap();
        assert!(result.backups.is_empty());
        assert_eq!(result.messages.len(), 1);
    }
}
