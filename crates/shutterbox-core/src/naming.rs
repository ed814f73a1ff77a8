//! Capture file naming.
//!
//! The sequence index comes from the number of entries already in the capture
//! directory. If that query fails the monotonic clock supplies the index
//! instead. Either way the index is raised above every index issued earlier in
//! the session, so no path repeats until restart.

use alloc::format;
use alloc::string::String;

use crate::config::CaptureConfig;
use crate::platform::MonotonicClock;
use crate::storage::{join_path, Storage};

/// Where a sequence index came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Entry count of the capture directory plus one
    DirectoryCount,
    /// Milliseconds on the monotonic clock
    Clock,
}

/// Identity of one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    pub index: u64,
    pub path: String,
    pub source: IndexSource,
}

/// Derives a fresh [`CaptureRecord`] per capture
#[derive(Debug, Clone)]
pub struct FileNamer {
    dir: String,
    prefix: String,
    extension: String,
    width: usize,
    last_index: Option<u64>,
}

impl FileNamer {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            dir: config.capture_dir.clone(),
            prefix: config.file_prefix.clone(),
            extension: config.file_extension.clone(),
            width: config.index_width,
            last_index: None,
        }
    }

    /// Reserve the next record. The index is never handed out again this
    /// session, whether or not the capture succeeds.
    pub fn next_record<S, C>(&mut self, storage: &mut S, clock: &C) -> CaptureRecord
    where
        S: Storage,
        C: MonotonicClock,
    {
        let (candidate, source) = match storage.count_entries(&self.dir) {
            Ok(count) => (count as u64 + 1, IndexSource::DirectoryCount),
            Err(e) => {
                log::warn!(
                    "Counting {} failed ({}), using clock-derived index",
                    self.dir,
                    e
                );
                (clock.now_ms(), IndexSource::Clock)
            }
        };

        let index = match self.last_index {
            Some(last) if candidate <= last => last + 1,
            _ => candidate,
        };
        self.last_index = Some(index);

        CaptureRecord {
            index,
            path: self.path_for(index),
            source,
        }
    }

    /// Target path for an index, e.g. `/photos/IMG_00042.jpg`
    pub fn path_for(&self, index: u64) -> String {
        let name = format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            self.extension,
            width = self.width
        );
        join_path(&self.dir, &name)
    }

    pub fn last_index(&self) -> Option<u64> {
        self.last_index
    }
}
