use std::fs::{self, File};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Ensure the parent directory of `path` exists and has restrictive permissions on Unix.
pub fn ensure_parent_secure(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            let perm = fs::Permissions::from_mode(0o700);
            let _ = fs::set_permissions(parent, perm);
        }
    }
    Ok(())
}

/// Atomically replace `path` with `bytes` (0600 on Unix). A crash leaves either the
/// old or the new file, never a truncated one.
pub fn atomic_write_secure(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp_path = tmp_path_for(path);
    {
        let mut tmp = File::create(&tmp_path)?;
        #[cfg(unix)]
        {
            let _ = fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600));
        }
        tmp.write_all(bytes)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.tmp", path.display()))
}

#[cfg(unix)]
fn set_perm_0600(path: &Path) {
    if let Ok(meta) = fs::metadata(path) {
        let mut perm = meta.permissions();
        perm.set_mode(0o600);
        let _ = fs::set_permissions(path, perm);
    }
}

pub fn backup_path(path: &Path, n: usize) -> PathBuf {
    PathBuf::from(format!("{}.{n}", path.display()))
}

/// Rotate backups and write atomically, keeping up to `n` backups named
/// `<file>.1` (newest) .. `<file>.n`.
pub fn write_with_backups_n(path: &Path, bytes: &[u8], n: usize) -> io::Result<()> {
    ensure_parent_secure(path)?;

    if n > 0 && path.exists() {
        let oldest = backup_path(path, n);
        let _ = fs::remove_file(&oldest);

        for i in (1..n).rev() {
            let src = backup_path(path, i);
            if src.exists() {
                let dst = backup_path(path, i + 1);
                fs::rename(&src, &dst)?;
                #[cfg(unix)]
                set_perm_0600(&dst);
            }
        }

        // Copy rather than move: the live file stays in place until the rename below.
        let first = backup_path(path, 1);
        fs::copy(path, &first)?;
        #[cfg(unix)]
        set_perm_0600(&first);
    }

    atomic_write_secure(path, bytes)
}
