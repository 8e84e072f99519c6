use super::atomic::write_atomic;
use super::backup::{BackupInfo, BackupRotator, BACKUP_DIR_NAME};
use super::lock::{self, LockGuard, LockOptions, LockState};
use super::reader::{parse_file, read_resilient, Loaded, ReadSource};
use crate::audit::{AuditLevel, AuditSink, FileAuditSink};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::resource::{Resource, ResourceKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File-backed resource store rooted at a data directory.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and all
/// coordination happens through lock markers on disk.
pub struct JsonStore {
    root: PathBuf,
    config: StoreConfig,
    lock_opts: LockOptions,
    backups: BackupRotator,
    audit: Arc<dyn AuditSink>,
}

impl JsonStore {
    /// Open `root`, creating it, the backup directory and every catalog
    /// resource that does not exist yet.
    pub fn open(root: impl Into<PathBuf>, config: StoreConfig, audit: Arc<dyn AuditSink>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let bak = root.join(BACKUP_DIR_NAME);
        fs::create_dir_all(&bak)?;

        let store = Self {
            lock_opts: LockOptions {
                timeout: config.lock_timeout(),
                stale_after: config.stale_after(),
                poll_interval: config.poll_interval(),
            },
            backups: BackupRotator::new(bak, config.backup_retention),
            root,
            config,
            audit,
        };
        for kind in ResourceKind::ALL {
            store.ensure_exists(&kind.untyped())?;
        }
        Ok(store)
    }

    /// Open with configuration from env and `<root>/thesisdb.toml`, auditing
    /// to files in `root`.
    pub fn open_default(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = StoreConfig::load(&root)?;
        fs::create_dir_all(&root)?;
        let audit = FileAuditSink::new(&root, config.audit_rotate_bytes, config.audit_retention);
        Self::open(root, config, Arc::new(audit))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    pub fn path_of<C>(&self, resource: &Resource<C>) -> PathBuf {
        self.root.join(resource.file_name())
    }

    /// Current content, falling back to backups or the empty default.
    pub fn read<C>(&self, resource: &Resource<C>) -> C
    where
        C: DeserializeOwned + Default,
    {
        self.read_with_source(resource).content
    }

    pub fn read_with_source<C>(&self, resource: &Resource<C>) -> Loaded<C>
    where
        C: DeserializeOwned + Default,
    {
        read_resilient(&self.path_of(resource), &self.backups, self.audit.as_ref())
    }

    /// Read-modify-write `resource` under its lock.
    ///
    /// The transform may mutate the content in place or replace it wholesale
    /// (`*content = new`); either way the content it leaves behind is written.
    /// Its return value is handed back to the caller. When the transform
    /// fails nothing is written and its error is returned as-is.
    pub fn update<C, R, E, F>(&self, resource: &Resource<C>, transform: F) -> std::result::Result<R, E>
    where
        C: Serialize + DeserializeOwned + Default,
        E: From<StoreError>,
        F: FnOnce(&mut C) -> std::result::Result<R, E>,
    {
        let path = self.path_of(resource);
        let guard = self.lock(&path)?;
        let Loaded { mut content, source } = read_resilient::<C>(&path, &self.backups, self.audit.as_ref());
        if source.is_degraded() && parse_file::<Value>(&path).is_ok() {
            // Writing the fallback would drop records that are only mistyped.
            self.audit.log(
                "UPDATE_REFUSED",
                "system",
                &format!("{}: content does not match its record shape", resource.file_name()),
                AuditLevel::Error,
            );
            return Err(StoreError::ShapeMismatch(resource.file_name().to_string()).into());
        }

        let output = transform(&mut content)?;

        self.persist(&path, &content)?;
        guard.release();
        Ok(output)
    }

    /// Replace the whole content of `resource` under its lock.
    pub fn write<C>(&self, resource: &Resource<C>, content: &C) -> Result<()>
    where
        C: Serialize,
    {
        let path = self.path_of(resource);
        let guard = self.lock(&path)?;
        self.persist(&path, content)?;
        guard.release();
        Ok(())
    }

    /// Reset `resource` to its empty default. The previous content is kept as
    /// a backup like any other write.
    pub fn purge<C>(&self, resource: &Resource<C>) -> Result<()>
    where
        C: Serialize + Default,
    {
        self.write(resource, &C::default())?;
        info!(resource = resource.file_name(), "resource purged");
        Ok(())
    }

    /// Persist whatever a resilient read currently returns, replacing a
    /// damaged primary with the backup or empty default it fell back to.
    /// A healthy primary is left untouched.
    pub fn recover<C>(&self, resource: &Resource<C>) -> Result<ReadSource>
    where
        C: Serialize + DeserializeOwned + Default,
    {
        let path = self.path_of(resource);
        let guard = self.lock(&path)?;
        let Loaded { content, source } = read_resilient::<C>(&path, &self.backups, self.audit.as_ref());
        if source.is_degraded() {
            self.persist(&path, &content)?;
            self.audit.log(
                "RESOURCE_RECOVERED",
                "system",
                &format!("{} restored from {}", resource.file_name(), source),
                AuditLevel::Warn,
            );
        }
        guard.release();
        Ok(source)
    }

    /// Snapshots of `resource`, newest first.
    pub fn backups<C>(&self, resource: &Resource<C>) -> Result<Vec<BackupInfo>> {
        Ok(self.backups.list(resource.stem())?)
    }

    pub fn lock_state<C>(&self, resource: &Resource<C>) -> LockState {
        lock::lock_state(&self.path_of(resource), self.lock_opts.stale_after)
    }

    fn lock(&self, path: &Path) -> Result<LockGuard> {
        lock::acquire(path, &self.lock_opts)
    }

    fn ensure_exists(&self, resource: &Resource<Vec<Value>>) -> Result<()> {
        let path = self.path_of(resource);
        if path.exists() {
            return Ok(());
        }
        let guard = self.lock(&path)?;
        // Another process may have created it while we waited.
        if !path.exists() {
            write_atomic(&path, &to_json_bytes(&Vec::<Value>::new())?)?;
            debug!(resource = resource.file_name(), "created empty resource");
        }
        guard.release();
        Ok(())
    }

    /// Back up the current file, then atomically replace it. Caller holds the lock.
    fn persist<C: Serialize>(&self, path: &Path, content: &C) -> Result<()> {
        let bytes = to_json_bytes(content)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Err(e) = self.backups.rotate(path) {
            warn!(file = %name, error = %e, "backup failed, writing anyway");
            self.audit.log(
                "BACKUP_FAILED",
                "system",
                &format!("{}: {}", name, e),
                AuditLevel::Warn,
            );
        }

        if let Err(e) = write_atomic(path, &bytes) {
            self.audit.log(
                "WRITE_FAILED",
                "system",
                &format!("{}: {}", name, e),
                AuditLevel::Error,
            );
            return Err(StoreError::Io(e));
        }
        debug!(file = %name, bytes = bytes.len(), "resource written");
        Ok(())
    }
}

/// Two-space pretty JSON with non-ASCII characters kept as-is.
fn to_json_bytes<C: Serialize + ?Sized>(content: &C) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(content)?)
}
