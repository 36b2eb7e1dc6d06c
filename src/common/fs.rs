use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Error unless the file already exists.
pub fn require_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File does not exist: {}", path.display());
    }
    if !path.is_file() {
        bail!("Path exists but is not a file: {}", path.display());
    }
    Ok(())
}

/// Write-then-rename wrapper for atomic outputs.
pub struct PendingWrite {
    target: PathBuf,
    tmp: NamedTempFile,
}

impl PendingWrite {
    /// Open `target` for writing. Refuses to clobber an existing file unless `force`.
    pub fn open(target: &Path, force: bool) -> Result<Self> {
        let parent = target.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        ensure_dir_exists(parent)?;
        if !force && target.exists() {
            bail!("Refusing to overwrite existing file: {} (use --force)", target.display());
        }
        let tmp = NamedTempFile::new_in(parent).context("create temp file")?;
        Ok(Self { target: target.to_path_buf(), tmp })
    }

    /// Flush, fsync and move the temp file into place.
    pub fn finalize(self) -> Result<PathBuf> {
        let Self { target, tmp } = self;
        tmp.as_file().sync_all().ok(); // best-effort fsync file
        tmp.persist(&target)
            .with_context(|| format!("rename to {}", target.display()))?;
        if let Some(dir) = target.parent() {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(target)
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.tmp.write(buf) }

    fn flush(&mut self) -> std::io::Result<()> { self.tmp.flush() }
}

/// Write `bytes` to `target` atomically.
pub fn write_atomic(target: &Path, bytes: &[u8], force: bool) -> Result<PathBuf> {
    let mut sink = PendingWrite::open(target, force)?;
    sink.write_all(bytes)
        .with_context(|| format!("write {}", target.display()))?;
    sink.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("dashboard.html");

        write_atomic(&target, b"first", false).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"first");

        assert!(write_atomic(&target, b"second", false).is_err());
        assert_eq!(fs::read(&target).unwrap(), b"first");

        write_atomic(&target, b"second", true).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
    }

    #[test]
    fn require_file_exists_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(require_file_exists(dir.path()).is_err());
        assert!(require_file_exists(&dir.path().join("missing.parquet")).is_err());
    }
}
