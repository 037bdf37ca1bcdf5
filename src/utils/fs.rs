// src/utils/fs.rs
//! Write-then-rename persistence for every artifact under the data directory.
//!
//! Bytes are written to a hidden temp file beside the target, fsynced, and only
//! then renamed over the final path. A reader never observes a torn file: after
//! a crash the final path holds either the previous content or nothing.

use crate::error::{BootstrapError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unix mode for private keys and kubeconfigs.
pub const PRIVATE_MODE: u32 = 0o600;
/// Unix mode for certificates and public keys.
pub const PUBLIC_MODE: u32 = 0o644;

/// A fully written temp file waiting to be renamed onto `final_path`.
///
/// Dropping it without calling [`StagedFile::commit`] removes the temp file and
/// leaves the final path untouched.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub fn write(final_path: &Path, contents: &[u8], mode: u32) -> Result<Self> {
        ensure_parent_exists(final_path)?;

        let file_name = final_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                BootstrapError::io(
                    final_path,
                    io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;
        let temp_path = final_path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let mut file = options
            .open(&temp_path)
            .map_err(|e| BootstrapError::io(&temp_path, e))?;
        let staged = Self {
            temp_path,
            final_path: final_path.to_path_buf(),
            committed: false,
        };

        file.write_all(contents)
            .map_err(|e| BootstrapError::io(&staged.temp_path, e))?;
        file.sync_all()
            .map_err(|e| BootstrapError::io(&staged.temp_path, e))?;

        Ok(staged)
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Renames the temp file onto the final path and syncs the directory entry.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.temp_path, &self.final_path)
            .map_err(|e| BootstrapError::io(&self.final_path, e))?;
        self.committed = true;

        if let Some(parent) = self.final_path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    StagedFile::write(path, contents, mode)?.commit()
}

pub fn ensure_parent_exists(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| BootstrapError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Reads `path`, returning `None` when it does not exist.
pub fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BootstrapError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_creates_parents_and_content() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("certs/etcd/etcd-serving.crt");

        write_atomic(&path, b"pem", PUBLIC_MODE)?;

        assert_eq!(fs::read(&path).unwrap(), b"pem");
        Ok(())
    }

    #[test]
    fn uncommitted_stage_never_reaches_final_path() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tls.key");

        let staged = StagedFile::write(&path, b"secret", PRIVATE_MODE)?;
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        assert!(!path.exists());

        drop(staged);
        assert!(!temp_path.exists());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn commit_replaces_existing_file() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kubeconfig");
        fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new", PRIVATE_MODE)?;

        assert_eq!(fs::read(&path).unwrap(), b"new");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn private_files_are_owner_only() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ca-bundle.key");
        write_atomic(&path, b"key", PRIVATE_MODE)?;

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, PRIVATE_MODE);
        Ok(())
    }

    #[test]
    fn read_if_exists_reports_missing_as_none() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_if_exists(&temp_dir.path().join("absent"))?.is_none());
        Ok(())
    }
}
