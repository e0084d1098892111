// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Paths are normalised by dropping `.` components, so `./src/a.css` and
/// `src/a.css` name the same entry; the root is `.`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    readonly: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
            readonly: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        let mut files = self.lock_files();
        files.insert(path.clone(), MockEntry::File(content.into()));
        let parent = parent_of(&path);
        ensure_dir_entry(&mut files, &parent);
        link_child(&mut files, &parent, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut files = self.lock_files();
        ensure_dir_entry(&mut files, &path);
    }

    /// Make writes under `path` fail.
    pub fn mark_readonly(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.add_dir(&path);
        self.readonly
            .lock()
            .expect("mock readonly set poisoned")
            .insert(path);
    }

    /// Contents of a file as UTF-8, or `None` if missing.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let files = self.lock_files();
        match files.get(&normalize(path.as_ref())) {
            Some(MockEntry::File(bytes)) => String::from_utf8(bytes.clone()).ok(),
            _ => None,
        }
    }

    fn lock_files(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().expect("mock filesystem poisoned")
    }

    fn is_readonly(&self, path: &Path) -> bool {
        let readonly = self.readonly.lock().expect("mock readonly set poisoned");
        path.ancestors().any(|a| readonly.contains(a))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if files.contains_key(path) {
        return;
    }
    files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if path == Path::new(".") {
        return;
    }
    let parent = parent_of(path);
    ensure_dir_entry(files, &parent);
    link_child(files, &parent, path);
}

fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.lock_files();
        match files.get(&normalize(path)) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let content = self.read(path)?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let path = normalize(path);
        if self.is_readonly(&path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        self.add_file(&path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut files = self.lock_files();
        match files.get(&path) {
            Some(MockEntry::File(_)) => {}
            _ => return Err(anyhow!("File not found: {:?}", path)),
        }
        files.remove(&path);
        let parent = parent_of(&path);
        if let (Some(MockEntry::Dir(children)), Some(name)) = (
            files.get_mut(&parent),
            path.file_name().and_then(|n| n.to_str()),
        ) {
            children.retain(|c| c != name);
        }
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        if !self.is_dir(&path) && self.is_readonly(&path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        self.add_dir(&path);
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock_files().get(&normalize(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock_files().get(&normalize(path)), Some(MockEntry::Dir(_)))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(normalize(path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock_files();
        match files.get(&normalize(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
