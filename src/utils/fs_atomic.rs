//! Atomic file writes for the file-backed stores

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unix mode for files holding secret material
pub const PRIVATE_FILE_MODE: u32 = 0o600;
/// Unix mode for directories holding secret material
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Write `bytes` to a temp file next to `path`, then rename over it
pub fn write_atomic(path: &Path, bytes: &[u8], private: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, bytes)?;
    if private {
        set_permissions(&temp_path, PRIVATE_FILE_MODE)?;
    }
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

/// Create a directory (and parents) restricted to the current user
pub fn ensure_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)?;
    set_permissions(path, PRIVATE_DIR_MODE)
}

fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("tmp");
    path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
}
