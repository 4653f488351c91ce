//! Filesystem abstraction used by the syntax registry
//!
//! The registry never touches `std::fs` directly. All reads, writes, moves and
//! directory listings go through the [`FileSystem`] trait so hosts can supply
//! their own backend and tests can inject failures:
//! - `StdFileSystem`: Native filesystem using `std::fs`
//! - Custom implementations for sandboxed or remote settings storage
//!
//! The trait is synchronous. Hosts that must not block their UI thread should
//! dispatch registry calls with `spawn_blocking` or similar patterns.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ============================================================================
// Directory Entry Types
// ============================================================================

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
}

/// A directory entry returned by `read_dir`
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Full path to the entry
    pub path: PathBuf,
    /// File/directory name (last component of path)
    pub name: String,
    /// Type of entry
    pub entry_type: EntryType,
}

impl DirEntry {
    /// Create a new directory entry
    pub fn new(path: PathBuf, name: String, entry_type: EntryType) -> Self {
        Self {
            path,
            name,
            entry_type,
        }
    }

    /// Returns true if this is a regular file or a symlink (resolved on read)
    pub fn is_file(&self) -> bool {
        matches!(self.entry_type, EntryType::File | EntryType::Symlink)
    }

    /// Extension of the entry name, if any
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }

    /// File stem of the entry name
    pub fn stem(&self) -> Option<&str> {
        Path::new(&self.name).file_stem().and_then(|s| s.to_str())
    }
}

// ============================================================================
// FileSystem Trait
// ============================================================================

/// Filesystem operations needed by the registry
pub trait FileSystem: Send + Sync {
    /// Read entire file into memory
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write data to file atomically (temp file + rename)
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Rename/move a file
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// List entries in a directory (non-recursive)
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Create a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Check if path exists
    fn exists(&self, path: &Path) -> bool;

    /// Get a temporary file path for atomic writes
    fn temp_path_for(&self, path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| std::ffi::OsString::from("fresh-save"));
        name.push(".tmp");
        path.with_file_name(name)
    }
}

// ============================================================================
// StdFileSystem Implementation
// ============================================================================

/// Standard filesystem implementation using `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let temp_path = self.temp_path_for(path);
        {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        if let Err(e) = self.rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type()?;

            let entry_type = if file_type.is_dir() {
                EntryType::Directory
            } else if file_type.is_symlink() {
                EntryType::Symlink
            } else {
                EntryType::File
            };

            entries.push(DirEntry::new(entry.path(), name, entry_type));
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_filesystem_read_write() {
        let fs = StdFileSystem;
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("Ruby.yml");

        fs.write_file(&path, b"kind: code\n").unwrap();
        assert_eq!(fs.read_file(&path).unwrap(), b"kind: code\n");
        assert!(fs.exists(&path));
        assert!(!fs.exists(&fs.temp_path_for(&path)));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let fs = StdFileSystem;
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("atomic_test.yml");

        fs.write_file(&path, b"initial").unwrap();
        fs.write_file(&path, b"updated").unwrap();
        assert_eq!(fs.read_file(&path).unwrap(), b"updated");
    }

    #[test]
    fn test_rename_and_remove() {
        let fs = StdFileSystem;
        let temp_dir = tempfile::tempdir().unwrap();
        let from = temp_dir.path().join("Foo.yml");
        let to = temp_dir.path().join("Bar.yml");

        fs.write_file(&from, b"x").unwrap();
        fs.rename(&from, &to).unwrap();
        assert!(!fs.exists(&from));
        assert!(fs.exists(&to));

        fs.remove_file(&to).unwrap();
        assert!(!fs.exists(&to));
        assert!(fs.remove_file(&to).is_err());
    }

    #[test]
    fn test_read_dir() {
        let fs = StdFileSystem;
        let temp_dir = tempfile::tempdir().unwrap();

        fs.create_dir_all(&temp_dir.path().join("nested/deeper"))
            .unwrap();
        fs.write_file(&temp_dir.path().join("Go.yml"), b"a").unwrap();
        fs.write_file(&temp_dir.path().join("Rust.yaml"), b"b")
            .unwrap();

        let entries = fs.read_dir(temp_dir.path()).unwrap();
        assert_eq!(entries.len(), 3);

        let go = entries.iter().find(|e| e.name == "Go.yml").unwrap();
        assert!(go.is_file());
        assert_eq!(go.stem(), Some("Go"));
        assert_eq!(go.extension(), Some("yml"));

        let nested = entries.iter().find(|e| e.name == "nested").unwrap();
        assert_eq!(nested.entry_type, EntryType::Directory);
        assert!(!nested.is_file());
    }

    #[test]
    fn test_dir_entry_types() {
        let file = DirEntry::new(PathBuf::from("/a.yml"), "a.yml".to_string(), EntryType::File);
        assert!(file.is_file());

        let dir = DirEntry::new(PathBuf::from("/dir"), "dir".to_string(), EntryType::Directory);
        assert!(!dir.is_file());
        assert_eq!(dir.extension(), None);
    }
}
