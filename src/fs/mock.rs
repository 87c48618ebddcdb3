use super::{DirEntry, FileSystem, FileType};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const MAX_LINK_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub content: Option<String>,
    pub file_type: FileType,
    pub link_target: Option<PathBuf>,
}

pub struct MockFileSystem {
    files: RwLock<HashMap<PathBuf, MockEntry>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            root,
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.normalize_path(path.as_ref());
        self.insert(
            path,
            MockEntry {
                content: Some(content.to_string()),
                file_type: FileType::File,
                link_target: None,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        self.insert(
            path,
            MockEntry {
                content: None,
                file_type: FileType::Directory,
                link_target: None,
            },
        );
    }

    /// Adds a symlink at `link`; the target does not have to exist.
    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        let link = self.normalize_path(link.as_ref());
        let target = self.normalize_path(target.as_ref());
        self.insert(
            link,
            MockEntry {
                content: None,
                file_type: FileType::Symlink,
                link_target: Some(target),
            },
        );
    }

    fn insert(&self, path: PathBuf, entry: MockEntry) {
        let mut files = self.files.write().unwrap();
        if let Some(parent) = path.parent() {
            Self::ensure_parents(&mut files, parent);
        }
        files.insert(path, entry);
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn ensure_parents(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            files.entry(current.clone()).or_insert(MockEntry {
                content: None,
                file_type: FileType::Directory,
                link_target: None,
            });
        }
    }

    /// Follows symlinks until a non-link entry; None when the chain is broken
    fn resolve(&self, path: &Path) -> Option<(PathBuf, MockEntry)> {
        let files = self.files.read().unwrap();
        let mut current = self.normalize_path(path);
        for _ in 0..MAX_LINK_DEPTH {
            let entry = files.get(&current)?;
            match (&entry.file_type, &entry.link_target) {
                (FileType::Symlink, Some(target)) => current = target.clone(),
                _ => return Some((current, entry.clone())),
            }
        }
        None
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve(path)
            .map(|(_, e)| e.file_type == FileType::Directory)
            .unwrap_or(false)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.file_type == FileType::Symlink)
            .unwrap_or(false)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let (_, entry) = self
            .resolve(path)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))?;

        entry
            .content
            .ok_or_else(|| anyhow!("Not a file: {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();

        if !files.contains_key(&path) {
            return Err(anyhow!("Directory not found: {:?}", path));
        }

        let mut entries: Vec<DirEntry> = files
            .iter()
            .filter(|(file_path, _)| file_path.parent() == Some(path.as_path()))
            .map(|(file_path, entry)| DirEntry {
                name: file_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("")
                    .to_string(),
                file_type: entry.file_type,
            })
            .collect();

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.resolve(path)
            .map(|(resolved, _)| resolved)
            .ok_or_else(|| anyhow!("Path not found: {:?}", path))
    }
}
