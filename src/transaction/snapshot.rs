use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SNAPSHOT_SUFFIX: &str = ".fgdb-txn-snapshot";

/// Sibling path holding the snapshot of `db_path`.
#[must_use]
pub fn snapshot_path(db_path: &Path) -> PathBuf {
    let name = db_path
        .file_name()
        .map_or_else(|| "db".to_string(), |n| n.to_string_lossy().into_owned());
    let snapshot = format!("{name}{SNAPSHOT_SUFFIX}");
    match db_path.parent() {
        Some(parent) => parent.join(snapshot),
        None => PathBuf::from(snapshot),
    }
}

/// Removes a file or directory tree. A missing path is not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Copies a file or directory tree, replacing files that already exist.
pub fn copy_path(source: &Path, target: &Path) -> io::Result<()> {
    if source.is_dir() {
        fs::create_dir_all(target)?;
        for entry in fs::read_dir(source)? {
            let entry = entry?;
            copy_path(&entry.path(), &target.join(entry.file_name()))?;
        }
        return Ok(());
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, target)?;
    Ok(())
}

/// Copy of a database directory taken when a transaction begins.
#[derive(Debug)]
pub struct DirectorySnapshot {
    path: PathBuf,
}

impl DirectorySnapshot {
    /// Copies `db_path` to its snapshot path, replacing a stale snapshot.
    pub fn create(db_path: &Path) -> io::Result<Self> {
        if !db_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("database path does not exist: {}", db_path.display()),
            ));
        }
        let path = snapshot_path(db_path);
        remove_path(&path)?;
        copy_path(db_path, &path)?;
        debug!("snapshot of {} created at {}", db_path.display(), path.display());
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces `db_path` with the snapshot contents. The snapshot is kept.
    pub fn restore(&self, db_path: &Path) -> io::Result<()> {
        if !self.path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("snapshot path does not exist: {}", self.path.display()),
            ));
        }
        remove_path(db_path)?;
        copy_path(&self.path, db_path)?;
        debug!("restored {} from {}", db_path.display(), self.path.display());
        Ok(())
    }

    /// Deletes the snapshot copy.
    pub fn discard(&self) -> io::Result<()> {
        remove_path(&self.path)
    }
}
