//! Atomic whole-file replacement.
//!
//! Content goes to a uniquely named temp file next to the target, is fsynced,
//! then renamed over the target. Readers see the old bytes or the new bytes,
//! never a mix. The parent directory is fsynced afterwards so the rename itself
//! is durable.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn temp_path_for(target: &Path) -> io::Result<PathBuf> {
    let parent = target.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "atomic write target has no parent")
    })?;
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    Ok(parent.join(format!(".{}.tmp.{}", name, Uuid::new_v4().simple())))
}

/// Replace `path` with `bytes` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_path_for(path)?;
    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Some(parent) = path.parent() {
        fsync_dir(parent);
    }
    Ok(())
}

/// Copy `src` onto `dst` with the same temp-then-rename protocol.
pub fn atomic_copy(src: &Path, dst: &Path) -> io::Result<u64> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path_for(dst)?;
    let result = (|| {
        let mut input = File::open(src)?;
        let mut output = File::create(&tmp)?;
        let copied = io::copy(&mut input, &mut output)?;
        output.flush()?;
        output.sync_all()?;
        drop(output);
        fs::rename(&tmp, dst)?;
        Ok(copied)
    })();

    match result {
        Ok(copied) => {
            if let Some(parent) = dst.parent() {
                fsync_dir(parent);
            }
            Ok(copied)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Best-effort fsync of a directory entry table.
pub fn fsync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Ok(handle) = File::open(dir) {
            let _ = handle.sync_all();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}
