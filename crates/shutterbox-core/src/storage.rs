//! Storage abstraction for captured frames.
//! Backed by the SD card on the device and by [`MemoryStorage`] on the host.
//!
//! [`MemoryStorage`]: crate::mock_storage::MemoryStorage

use alloc::format;
use alloc::string::String;

use crate::error::StorageError;

/// How [`Storage::open`] treats an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Exclusive create; fails with [`StorageError::AlreadyExists`]
    CreateNew,
    /// Create or truncate
    Truncate,
}

/// Byte sink for captured frames
///
/// Implementations:
/// - `SdCardStorage` on the device (FAT on SD/MMC)
/// - `MemoryStorage` for host tests
pub trait Storage {
    /// Open file handle
    type Handle;

    /// Number of entries in a directory
    fn count_entries(&mut self, dir: &str) -> Result<usize, StorageError>;

    /// Create a directory and any missing parents; existing is fine
    fn ensure_dir(&mut self, dir: &str) -> Result<(), StorageError>;

    /// Open a file for writing
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::Handle, StorageError>;

    /// Write the whole buffer
    fn write(&mut self, handle: &mut Self::Handle, data: &[u8]) -> Result<(), StorageError>;

    /// Force written data onto the medium
    fn flush(&mut self, handle: &mut Self::Handle) -> Result<(), StorageError>;

    /// Close the handle; data not flushed before this call may be lost on
    /// power failure
    fn close(&mut self, handle: Self::Handle);
}

pub fn join_path(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Parent directory of an absolute path
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

/// Final path component
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}
