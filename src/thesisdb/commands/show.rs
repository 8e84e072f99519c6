use crate::commands::{degraded_message, CmdResult};
use crate::error::Result;
use crate::resource::ResourceKind;
use crate::store::JsonStore;
use serde_json::Value;

pub fn run(store: &JsonStore, kind: ResourceKind) -> Result<CmdResult> {
    let loaded = store.read_with_source::<Vec<Value>>(&kind.untyped());
    let mut result = CmdResult::default();
    if let Some(message) = degraded_message(kind, &loaded.source) {
        result.add_message(message);
    }
    Ok(result.with_document(Value::Array(loaded.content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_show_returns_document() {
        let env = TestEnv::new();
        fs::write(env.root.join("teachers.json"), r#"[{"teacher_code": "t1"}]"#).unwrap();
        let result = run(&env.store, ResourceKind::Teachers).unwrap();
        assert_eq!(result.document, Some(json!([{"teacher_code": "t1"}])));
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_show_warns_on_fallback() {
        let env = TestEnv::new();
        fs::write(env.root.join("teachers.json"), "not json").unwrap();
        let result = run(&env.store, ResourceKind::Teachers).unwrap();
        assert_eq!(result.document, Some(json!([])));
        assert!(result.messages[0].content.contains("recover teachers"));
        // Showing never repairs.
        assert_eq!(fs::read_to_string(env.root.join("teachers.json")).unwrap(), "not json");
    }
}
