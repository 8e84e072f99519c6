use crate::attachments::AttachmentStore;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::JsonStore;
use std::path::Path;

/// Store `src` under `<data-dir>/files`, named `name` or the source file name.
pub fn run(store: &JsonStore, src: &Path, name: Option<&str>, dedupe: bool) -> Result<CmdResult> {
    let name = name
        .map(str::to_string)
        .or_else(|| src.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default();
    let stored = AttachmentStore::in_data_dir(store.root()).store(src, &name, dedupe)?;

    let mut result = CmdResult::default();
    let message = if stored.reused {
        CmdMessage::info(format!("Identical file already stored at {}", stored.path.display()))
    } else {
        CmdMessage::success(format!("Stored {} ({} bytes)", stored.path.display(), stored.size))
    };
    result.add_message(message);
    Ok(result.with_attachment(stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use std::fs;

    #[test]
    fn test_attach_uses_source_name() {
        let env = TestEnv::new();
        let src = env.root.join("final draft.pdf");
        fs::write(&src, b"%PDF-1.4 %%EOF").unwrap();

        let result = run(&env.store, &src, None, true).unwrap();
        let stored = result.attachment.unwrap();
        assert_eq!(stored.path, env.root.join("files").join("final_draft.pdf"));

        let again = run(&env.store, &src, Some("copy.pdf"), true).unwrap();
        assert!(again.attachment.unwrap().reused);
    }
}
