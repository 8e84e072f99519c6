use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::resource::ResourceKind;
use crate::store::JsonStore;

/// Report on a freshly opened store. Opening already created anything missing.
pub fn run(store: &JsonStore) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Initialized thesisdb store at {}",
        store.root().display()
    )));
    let names: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.file_name()).collect();
    result.add_message(CmdMessage::info(format!("Resources: {}", names.join(", "))));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_init_reports_root() {
        let env = TestEnv::new();
        let result = run(&env.store).unwrap();
        assert!(result.messages[0]
            .content
            .contains(&env.root.display().to_string()));
        assert!(result.messages[1].content.contains("defended_thesis.json"));
    }
}
