//! # Configuration
//!
//! Store tuning is managed by [`confique`], which handles layered loading from
//! environment variables, a TOML file and compiled defaults.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `THESISDB_LOCK_TIMEOUT`, `THESISDB_STALE_LOCK`, ...
//! 2. **Data-dir Config**: `<data-dir>/thesisdb.toml`
//! 3. **Compiled Defaults**: `#[config(default = ...)]`
//!
//! ## Available Settings
//!
//! | Key | Env | Default | Description |
//! |-----|-----|---------|-------------|
//! | `lock_timeout_secs` | `THESISDB_LOCK_TIMEOUT` | `10.0` | Max wait for a resource lock |
//! | `stale_lock_secs` | `THESISDB_STALE_LOCK` | `60.0` | Age after which a lock marker is seized |
//! | `lock_poll_ms` | `THESISDB_LOCK_POLL_MS` | `50` | Sleep between acquisition attempts |
//! | `backup_retention` | `THESISDB_BACKUP_RETENTION` | `10` | Snapshots kept per resource (0 = keep all) |
//! | `notification_window` | `THESISDB_NOTIF_MAX` | `2000` | Entries kept in `notifications.json` |
//! | `audit_rotate_bytes` | `THESISDB_AUDIT_ROTATE` | `10485760` | Audit file size that triggers rotation |
//! | `audit_retention` | `THESISDB_AUDIT_RETENTION` | `7` | Rotated audit files kept |
//! | `payload_max_bytes` | `THESISDB_NOTIF_PAYLOAD_MAX` | `100000` | Largest notification payload stored verbatim |
//! | `payload_preview_chars` | `THESISDB_NOTIF_PAYLOAD_PREVIEW` | `4096` | Preview length for oversized payloads |

use crate::error::Result;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "thesisdb.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Seconds to wait for a resource lock before giving up
    #[config(env = "THESISDB_LOCK_TIMEOUT", default = 10.0)]
    pub lock_timeout_secs: f64,

    /// Seconds after which an existing lock marker is presumed abandoned
    #[config(env = "THESISDB_STALE_LOCK", default = 60.0)]
    pub stale_lock_secs: f64,

    /// Milliseconds to sleep between lock attempts
    #[config(env = "THESISDB_LOCK_POLL_MS", default = 50)]
    pub lock_poll_ms: u64,

    /// Backup snapshots kept per resource. 0 disables pruning.
    #[config(env = "THESISDB_BACKUP_RETENTION", default = 10)]
    pub backup_retention: usize,

    /// Maximum number of entries kept in the notification list
    #[config(env = "THESISDB_NOTIF_MAX", default = 2000)]
    pub notification_window: usize,

    #[config(env = "THESISDB_AUDIT_ROTATE", default = 10485760)]
    pub audit_rotate_bytes: u64,

    #[config(env = "THESISDB_AUDIT_RETENTION", default = 7)]
    pub audit_retention: usize,

    #[config(env = "THESISDB_NOTIF_PAYLOAD_MAX", default = 100000)]
    pub payload_max_bytes: usize,

    #[config(env = "THESISDB_NOTIF_PAYLOAD_PREVIEW", default = 4096)]
    pub payload_preview_chars: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: 10.0,
            stale_lock_secs: 60.0,
            lock_poll_ms: 50,
            backup_retention: 10,
            notification_window: 2000,
            audit_rotate_bytes: 10 * 1024 * 1024,
            audit_retention: 7,
            payload_max_bytes: 100_000,
            payload_preview_chars: 4096,
        }
    }
}

impl StoreConfig {
    /// Load config for a data directory: env, then `thesisdb.toml`, then defaults.
    /// A missing TOML file is not an error.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config = StoreConfig::builder()
            .env()
            .file(data_dir.as_ref().join(CONFIG_FILENAME))
            .load()?;
        Ok(config)
    }

    pub fn lock_timeout(&self) -> Duration {
        secs(self.lock_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        secs(self.stale_lock_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms.max(1))
    }

    /// Notification window, never below one entry.
    pub fn notification_window(&self) -> usize {
        self.notification_window.max(1)
    }
}

/// Seconds from config, clamped to `[0, one year]`; NaN reads as zero.
fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0).min(365.0 * 24.0 * 3600.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.lock_timeout(), Duration::from_secs(10));
        assert_eq!(config.stale_after(), Duration::from_secs(60));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.backup_retention, 10);
        assert_eq!(config.notification_window(), 2000);
    }

    #[test]
    fn test_notification_window_has_floor() {
        let config = StoreConfig {
            notification_window: 0,
            ..Default::default()
        };
        assert_eq!(config.notification_window(), 1);
    }

    #[test]
    fn test_negative_durations_clamp_to_zero() {
        let config = StoreConfig {
            lock_timeout_secs: -3.0,
            ..Default::default()
        };
        assert_eq!(config.lock_timeout(), Duration::ZERO);
    }

    #[test]
    fn test_load_reads_toml_overrides() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            "backup_retention = 3\nlock_poll_ms = 5\n",
        )
        .unwrap();

        let config = StoreConfig::load(dir.path()).unwrap();
        assert_eq!(config.backup_retention, 3);
        assert_eq!(config.lock_poll_ms, 5);
    }
}
