//! Error types for the capture pipeline
//!
//! - [`StorageError`] - Failures reported by the storage capability
//! - [`ConfigError`] - Invalid values rejected while building configuration
//! - [`InitFault`] - Fatal bring-up failures; the device halts on any of them
//!
//! Per-capture sensor failures carry no payload and are reported through
//! [`CaptureStatus`](crate::sequencer::CaptureStatus) instead.

use alloc::string::String;

use crate::config::{DEBOUNCE_WINDOW_MAX_MS, DEBOUNCE_WINDOW_MIN_MS, JPEG_QUALITY_MAX};

/// Errors reported by a [`Storage`](crate::storage::Storage) implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Directory or file does not exist
    NotFound,
    /// Exclusive open refused because the target already exists
    AlreadyExists,
    /// Open for write failed
    Open(String),
    /// Payload write failed or was short
    Write(String),
    /// Durable flush failed; treated the same as a write failure
    Flush(String),
    /// Any other I/O failure
    Io(String),
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageError::NotFound => write!(f, "Not found"),
            StorageError::AlreadyExists => write!(f, "Already exists"),
            StorageError::Open(msg) => write!(f, "Open failed: {}", msg),
            StorageError::Write(msg) => write!(f, "Write failed: {}", msg),
            StorageError::Flush(msg) => write!(f, "Flush failed: {}", msg),
            StorageError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl core::error::Error for StorageError {}

/// Errors that can occur when building configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Debounce window outside the supported range
    DebounceWindowOutOfRange(u32),
    /// Poll interval must be non-zero
    ZeroPollInterval,
    /// Release timeout must be non-zero
    ZeroReleaseTimeout,
    /// Capture directory must be an absolute path
    RelativeCaptureDir(String),
    /// Filename prefix or extension contains a path separator
    InvalidFileName(String),
    /// JPEG quality above the encoder maximum
    JpegQualityOutOfRange(u8),
    /// At least one frame buffer is required
    ZeroFrameBuffers,
    /// Tuning level outside -2..=2
    TuningOutOfRange(i8),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::DebounceWindowOutOfRange(ms) => write!(
                f,
                "Debounce window {ms}ms outside {DEBOUNCE_WINDOW_MIN_MS}..={DEBOUNCE_WINDOW_MAX_MS}ms"
            ),
            ConfigError::ZeroPollInterval => write!(f, "Poll interval must be non-zero"),
            ConfigError::ZeroReleaseTimeout => write!(f, "Release timeout must be non-zero"),
            ConfigError::RelativeCaptureDir(dir) => {
                write!(f, "Capture directory must be absolute: {dir}")
            }
            ConfigError::InvalidFileName(part) => {
                write!(f, "Filename part must not contain '/': {part}")
            }
            ConfigError::JpegQualityOutOfRange(q) => {
                write!(f, "JPEG quality {q} above maximum {JPEG_QUALITY_MAX}")
            }
            ConfigError::ZeroFrameBuffers => write!(f, "At least one frame buffer is required"),
            ConfigError::TuningOutOfRange(level) => {
                write!(f, "Tuning level {level} outside -2..=2")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

/// Fatal startup failures
///
/// No capture can succeed without a mounted card, a capture directory and a
/// working sensor, so any of these ends in [`startup::halt`](crate::startup::halt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitFault {
    /// Configuration rejected before any hardware was touched
    Config(ConfigError),
    /// Storage mount failed (driver error code)
    StorageMount(i32),
    /// Capture directory could not be created
    CaptureDir(StorageError),
    /// Sensor driver init failed (driver error code)
    SensorInit(i32),
    /// Sensor initialised but its tuning interface is missing
    SensorTuning,
    /// GPIO or other peripheral setup failed (driver error code)
    Peripheral(i32),
}

impl core::fmt::Display for InitFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InitFault::Config(e) => write!(f, "Invalid configuration: {e}"),
            InitFault::StorageMount(code) => write!(f, "Storage mount failed: 0x{code:x}"),
            InitFault::CaptureDir(e) => write!(f, "Capture directory unavailable: {e}"),
            InitFault::SensorInit(code) => write!(f, "Sensor init failed: 0x{code:x}"),
            InitFault::SensorTuning => write!(f, "Sensor tuning interface unavailable"),
            InitFault::Peripheral(code) => write!(f, "Peripheral setup failed: 0x{code:x}"),
        }
    }
}

impl core::error::Error for InitFault {}

impl From<ConfigError> for InitFault {
    fn from(e: ConfigError) -> Self {
        InitFault::Config(e)
    }
}
