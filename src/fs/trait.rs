use anyhow::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// One child of a listed directory
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub file_type: FileType,
}

impl DirEntry {
    /// `ls -F` style name: directories end in `/`, symlinks in `@`
    pub fn display_name(&self) -> String {
        match self.file_type {
            FileType::File => self.name.clone(),
            FileType::Directory => format!("{}/", self.name),
            FileType::Symlink => format!("{}@", self.name),
        }
    }
}

/// The file system queries archive location needs, swappable for a mock in tests
pub trait FileSystem: Send + Sync {
    /// Follows symlinks, so a dangling link does not exist
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Looks at the link itself without following it
    fn is_symlink(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Children of `path`, sorted by name
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Fails when the final target does not exist
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}
