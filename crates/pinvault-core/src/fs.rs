//! Filesystem helpers for replacing files atomically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A not-yet-existing path next to `destination`, for staging a replacement.
pub fn temp_sibling(destination: &Path) -> io::Result<PathBuf> {
    let parent = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let filename = destination
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid destination name"))?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
        .as_nanos();
    Ok(parent.join(format!(".{}.{}.{}.tmp", filename, std::process::id(), nanos)))
}

/// Move `staged` over `destination`.
///
/// On platforms where rename fails when the destination exists, the
/// destination is removed and the rename retried. The staged file is removed
/// if the move ultimately fails.
pub fn replace_with(staged: &Path, destination: &Path) -> io::Result<()> {
    if let Err(initial_err) = fs::rename(staged, destination) {
        let _ = fs::remove_file(destination);
        fs::rename(staged, destination).map_err(|retry_err| {
            let _ = fs::remove_file(staged);
            io::Error::new(
                retry_err.kind(),
                format!(
                    "Atomic rename failed (initial: {}, retry: {})",
                    initial_err, retry_err
                ),
            )
        })?;
    }
    Ok(())
}

/// Write `contents` to `destination` through a staged sibling file.
pub fn write_atomic(destination: &Path, contents: &[u8]) -> io::Result<()> {
    let staged = temp_sibling(destination)?;
    fs::write(&staged, contents)?;
    replace_with(&staged, destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_temp_sibling_stays_in_parent() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("vault.db");
        let staged = temp_sibling(&dest).unwrap();
        assert_eq!(staged.parent(), Some(dir.path()));
        assert!(!staged.exists());
    }

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("config.toml");

        write_atomic(&dest, b"old").unwrap();
        write_atomic(&dest, b"new").unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_replace_with_missing_stage_fails() {
        let dir = tempdir().unwrap();
        let staged = dir.path().join("missing.tmp");
        let dest = dir.path().join("dest");
        assert!(replace_with(&staged, &dest).is_err());
    }
}
