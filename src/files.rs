// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File system access.
//!
//! The document store never touches the file system directly. Instead, it
//! goes through a [`FileStore`] so that the real file system can be swapped
//! out for an in-memory one during testing.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

/// Layer of indirection for file system primitives.
pub trait FileStore {
    /// Read entire file as UTF-8 text.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Create or truncate file, and write contents to it.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Create a single directory. Parent must exist.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Create directory along with any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// List names of sub-directories in sorted order.
    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// File system access through the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileStore;

impl FileStore for OsFileStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        mkdirp::mkdirp(path).map(|_| ())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        Ok(names)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(String),
}

/// In-memory file system.
///
/// Keeps a count of every write, creation, rename, and removal so callers can
/// assert that an operation left the file system untouched.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
    mutations: AtomicUsize,
}

impl MemoryFileStore {
    /// Construct new in-memory file system with only a root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let store = Self::default();
        store.nodes().insert(root.into(), Node::Dir);
        store
    }

    /// Number of mutations performed so far.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn nodes(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
}

fn require_parent_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<()> {
    match path.parent().and_then(|parent| nodes.get(parent)) {
        Some(Node::Dir) => Ok(()),
        _ => Err(not_found(path)),
    }
}

impl FileStore for MemoryFileStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        match self.nodes().get(path) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            Some(Node::Dir) => Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            ))),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut nodes = self.nodes();
        require_parent_dir(&nodes, path)?;
        if let Some(Node::Dir) = nodes.get(path) {
            return Err(io::Error::other(format!("{} is a directory", path.display())));
        }
        nodes.insert(path.to_path_buf(), Node::File(contents.to_string()));
        self.touch();

        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes().contains_key(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes();
        require_parent_dir(&nodes, path)?;
        if nodes.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        nodes.insert(path.to_path_buf(), Node::Dir);
        self.touch();

        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes();
        for ancestor in path.ancestors() {
            match nodes.get(ancestor) {
                Some(Node::Dir) => continue,
                Some(Node::File(_)) => {
                    return Err(io::Error::other(format!(
                        "{} is a file",
                        ancestor.display()
                    )))
                }
                None => {
                    nodes.insert(ancestor.to_path_buf(), Node::Dir);
                    self.touch();
                }
            }
        }

        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut nodes = self.nodes();
        if !nodes.contains_key(from) {
            return Err(not_found(from));
        }
        require_parent_dir(&nodes, to)?;

        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|key| key.starts_with(from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                // INVARIANT: Every moved key starts with `from`.
                let suffix = old.strip_prefix(from).map_err(io::Error::other)?;
                nodes.insert(to.join(suffix), node);
            }
        }
        self.touch();

        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes();
        if !nodes.contains_key(path) {
            return Err(not_found(path));
        }
        nodes.retain(|key, _| !key.starts_with(path));
        self.touch();

        Ok(())
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>> {
        let nodes = self.nodes();
        match nodes.get(path) {
            Some(Node::Dir) => {}
            _ => return Err(not_found(path)),
        }

        // BTreeMap keeps children sorted already.
        Ok(nodes
            .iter()
            .filter(|(key, node)| **node == Node::Dir && key.parent() == Some(path))
            .filter_map(|(key, _)| key.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }
}
