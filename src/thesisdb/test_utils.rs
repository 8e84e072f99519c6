use crate::audit::MemoryAuditSink;
use crate::config::StoreConfig;
use crate::store::JsonStore;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestEnv {
    // Held so the directory lives as long as the store.
    pub _temp_dir: TempDir,
    pub store: JsonStore,
    pub audit: Arc<MemoryAuditSink>,
    pub root: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let audit = Arc::new(MemoryAuditSink::new());
        let store = JsonStore::open(&root, config, audit.clone()).expect("failed to open store");
        Self {
            _temp_dir: temp_dir,
            store,
            audit,
            root,
        }
    }
}
