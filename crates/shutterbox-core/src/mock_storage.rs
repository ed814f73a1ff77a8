//! In-memory storage for host tests and scenario runs.
//!
//! Mirrors FAT-on-SD behaviour closely enough to test the capture sequence:
//! a file appears in its directory as soon as it is opened, but its contents
//! only become durable once flushed. Every call is recorded in a journal and
//! each operation can be made to fail on demand.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::StorageError;
use crate::storage::{basename, dirname, join_path, OpenMode, Storage};

/// One recorded storage call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    CountEntries(String),
    EnsureDir(String),
    Open(String),
    Write { path: String, len: usize },
    Flush(String),
    Close(String),
}

#[derive(Clone)]
enum MockEntry {
    File { content: Vec<u8>, durable: bool },
    Directory { children: Vec<String> },
}

/// Handle returned by [`MemoryStorage::open`]
#[derive(Debug)]
pub struct MemoryHandle {
    path: String,
    pending: Vec<u8>,
}

/// In-memory [`Storage`] with an operation journal and fault injection
#[derive(Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, MockEntry>,
    journal: Vec<StorageOp>,
    open_handles: usize,
    fail_count: bool,
    fail_open: bool,
    fail_write: bool,
    fail_flush: bool,
}

impl MemoryStorage {
    /// Storage with only a root directory
    pub fn empty() -> Self {
        let mut storage = Self::default();
        storage.entries.insert(
            "/".to_string(),
            MockEntry::Directory {
                children: Vec::new(),
            },
        );
        storage
    }

    /// Storage with an empty capture directory
    pub fn with_dir(dir: &str) -> Self {
        let mut storage = Self::empty();
        storage.add_directory(dir);
        storage
    }

    /// Add a directory; parents must exist
    pub fn add_directory(&mut self, path: &str) {
        self.entries.insert(
            path.to_string(),
            MockEntry::Directory {
                children: Vec::new(),
            },
        );
        self.link_to_parent(path);
    }

    /// Add a durable file; parent must exist
    pub fn add_file(&mut self, path: &str, content: &[u8]) {
        self.entries.insert(
            path.to_string(),
            MockEntry::File {
                content: content.to_vec(),
                durable: true,
            },
        );
        self.link_to_parent(path);
    }

    fn link_to_parent(&mut self, path: &str) {
        if path == "/" {
            return;
        }
        let parent = dirname(path);
        if let Some(MockEntry::Directory { children }) = self.entries.get_mut(parent) {
            let name = basename(path).to_string();
            if !children.contains(&name) {
                children.push(name);
            }
        }
    }

    pub fn set_count_failure(&mut self, fail: bool) {
        self.fail_count = fail;
    }

    pub fn set_open_failure(&mut self, fail: bool) {
        self.fail_open = fail;
    }

    pub fn set_write_failure(&mut self, fail: bool) {
        self.fail_write = fail;
    }

    pub fn set_flush_failure(&mut self, fail: bool) {
        self.fail_flush = fail;
    }

    /// All calls made so far, in order
    pub fn journal(&self) -> &[StorageOp] {
        &self.journal
    }

    /// Calls that touched `path`, in order
    pub fn ops_for(&self, path: &str) -> Vec<StorageOp> {
        self.journal
            .iter()
            .filter(|op| match op {
                StorageOp::Open(p) | StorageOp::Flush(p) | StorageOp::Close(p) => p == path,
                StorageOp::Write { path: p, .. } => p == path,
                _ => false,
            })
            .cloned()
            .collect()
    }

    /// Handles opened but not yet closed
    pub fn open_handles(&self) -> usize {
        self.open_handles
    }

    /// Durable contents of a file
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        match self.entries.get(path) {
            Some(MockEntry::File { content, durable: true }) => Some(content.as_slice()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Names in a directory
    pub fn list(&self, dir: &str) -> Vec<String> {
        match self.entries.get(dir) {
            Some(MockEntry::Directory { children }) => children.clone(),
            _ => Vec::new(),
        }
    }
}

impl Storage for MemoryStorage {
    type Handle = MemoryHandle;

    fn count_entries(&mut self, dir: &str) -> Result<usize, StorageError> {
        self.journal.push(StorageOp::CountEntries(dir.to_string()));
        if self.fail_count {
            return Err(StorageError::Io("injected count failure".to_string()));
        }
        match self.entries.get(dir) {
            Some(MockEntry::Directory { children }) => Ok(children.len()),
            Some(MockEntry::File { .. }) => Err(StorageError::Io("Not a directory".to_string())),
            None => Err(StorageError::NotFound),
        }
    }

    fn ensure_dir(&mut self, dir: &str) -> Result<(), StorageError> {
        self.journal.push(StorageOp::EnsureDir(dir.to_string()));
        let mut current = String::from("/");
        for part in dir.split('/').filter(|p| !p.is_empty()) {
            current = join_path(&current, part);
            match self.entries.get(&current) {
                Some(MockEntry::Directory { .. }) => {}
                Some(MockEntry::File { .. }) => {
                    return Err(StorageError::Io("Not a directory".to_string()))
                }
                None => self.add_directory(&current),
            }
        }
        Ok(())
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<MemoryHandle, StorageError> {
        self.journal.push(StorageOp::Open(path.to_string()));
        if self.fail_open {
            return Err(StorageError::Open("injected open failure".to_string()));
        }
        match self.entries.get(dirname(path)) {
            Some(MockEntry::Directory { .. }) => {}
            _ => return Err(StorageError::NotFound),
        }
        if mode == OpenMode::CreateNew && self.entries.contains_key(path) {
            return Err(StorageError::AlreadyExists);
        }

        self.entries.insert(
            path.to_string(),
            MockEntry::File {
                content: Vec::new(),
                durable: false,
            },
        );
        self.link_to_parent(path);
        self.open_handles += 1;

        Ok(MemoryHandle {
            path: path.to_string(),
            pending: Vec::new(),
        })
    }

    fn write(&mut self, handle: &mut MemoryHandle, data: &[u8]) -> Result<(), StorageError> {
        self.journal.push(StorageOp::Write {
            path: handle.path.clone(),
            len: data.len(),
        });
        if self.fail_write {
            return Err(StorageError::Write("injected write failure".to_string()));
        }
        handle.pending.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self, handle: &mut MemoryHandle) -> Result<(), StorageError> {
        self.journal.push(StorageOp::Flush(handle.path.clone()));
        if self.fail_flush {
            return Err(StorageError::Flush("injected flush failure".to_string()));
        }
        if let Some(MockEntry::File { content, durable }) = self.entries.get_mut(&handle.path) {
            content.extend_from_slice(&handle.pending);
            *durable = true;
        }
        handle.pending.clear();
        Ok(())
    }

    fn close(&mut self, handle: MemoryHandle) {
        self.journal.push(StorageOp::Close(handle.path));
        self.open_handles = self.open_handles.saturating_sub(1);
    }
}
