//! Capture sequencer: one activation in, one durably stored frame out.
//!
//! Sequence per capture:
//! 1. indicator busy
//! 2. acquire a frame (none: `SensorFault`)
//! 3. reserve a [`CaptureRecord`]
//! 4. exclusive open, write, flush, close. Close runs on every path once
//!    open succeeded, and flush always comes before close. A name that is
//!    already taken moves on to the next index, up to
//!    [`MAX_NAME_ATTEMPTS`] names.
//! 5. release the frame, on every path
//! 6. indicator idle
//!
//! Failed captures are reported, never retried.

use crate::config::CaptureConfig;
use crate::error::StorageError;
use crate::indicator::Indicator;
use crate::naming::{CaptureRecord, FileNamer};
use crate::platform::MonotonicClock;
use crate::sensor::{FrameBuffer, FrameSource};
use crate::storage::{OpenMode, Storage};

/// Names tried per capture before a taken name is reported as a fault
pub const MAX_NAME_ATTEMPTS: u32 = 32;

/// Result of one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Frame stored at `record.path`
    Success(CaptureRecord),
    /// Sensor returned no frame; nothing was written
    SensorFault,
    /// Open, write or flush failed; the frame was still released
    StorageFault(StorageError),
}

impl CaptureStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureStatus::Success(_))
    }

    /// Stored path on success
    pub fn path(&self) -> Option<&str> {
        match self {
            CaptureStatus::Success(record) => Some(&record.path),
            _ => None,
        }
    }
}

/// Owns the sensor, storage, indicator and clock capabilities for the
/// lifetime of the process
pub struct CaptureSequencer<F, S, I, C> {
    sensor: F,
    storage: S,
    indicator: I,
    clock: C,
    namer: FileNamer,
}

impl<F, S, I, C> CaptureSequencer<F, S, I, C>
where
    F: FrameSource,
    S: Storage,
    I: Indicator,
    C: MonotonicClock,
{
    pub fn new(config: &CaptureConfig, sensor: F, storage: S, mut indicator: I, clock: C) -> Self {
        indicator.set_idle();
        Self {
            sensor,
            storage,
            indicator,
            clock,
            namer: FileNamer::new(config),
        }
    }

    /// Capture one frame and persist it
    pub fn capture_and_store(&mut self) -> CaptureStatus {
        let started = self.clock.now_ms();
        self.indicator.set_busy();

        let Some(frame) = self.sensor.acquire_frame() else {
            log::error!("Capture failed: sensor returned no frame");
            self.indicator.set_idle();
            return CaptureStatus::SensorFault;
        };

        let mut record = self.namer.next_record(&mut self.storage, &self.clock);
        let mut attempts = 1;
        let written = loop {
            match persist(&mut self.storage, &record.path, frame.data()) {
                Err(StorageError::AlreadyExists) if attempts < MAX_NAME_ATTEMPTS => {
                    log::warn!("{} already exists, trying next index", record.path);
                    record = self.namer.next_record(&mut self.storage, &self.clock);
                    attempts += 1;
                }
                result => break result,
            }
        };
        let len = frame.len();
        self.sensor.release_frame(frame);

        let status = match written {
            Ok(()) => {
                log::info!(
                    "Saved {} ({} bytes) in {}ms",
                    record.path,
                    len,
                    self.clock.now_ms().saturating_sub(started)
                );
                CaptureStatus::Success(record)
            }
            Err(e) => {
                log::error!("Capture failed: {} ({})", record.path, e);
                CaptureStatus::StorageFault(e)
            }
        };

        self.indicator.set_idle();
        status
    }

    pub fn sensor(&self) -> &F {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut F {
        &mut self.sensor
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn namer(&self) -> &FileNamer {
        &self.namer
    }
}

/// Open, write, flush, close. Close is reached on every path after a
/// successful open.
fn persist<S: Storage>(storage: &mut S, path: &str, data: &[u8]) -> Result<(), StorageError> {
    let mut handle = storage.open(path, OpenMode::CreateNew)?;
    let result = storage
        .write(&mut handle, data)
        .and_then(|()| storage.flush(&mut handle));
    storage.close(handle);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::ActiveLowLed;
    use crate::mock_storage::{MemoryStorage, StorageOp};
    use crate::sim::{FakeSensor, SimClock, SimOutputPin};
    use alloc::collections::BTreeSet;
    use alloc::format;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    type TestSequencer =
        CaptureSequencer<FakeSensor, MemoryStorage, ActiveLowLed<SimOutputPin>, SimClock>;

    fn sequencer(storage: MemoryStorage) -> (TestSequencer, SimOutputPin) {
        let pin = SimOutputPin::new();
        let seq = CaptureSequencer::new(
            &CaptureConfig::default(),
            FakeSensor::new(256),
            storage,
            ActiveLowLed::new(pin.clone()),
            SimClock::new(),
        );
        (seq, pin)
    }

    #[test]
    fn test_success_writes_flushes_then_closes() {
        let (mut seq, pin) = sequencer(MemoryStorage::with_dir("/photos"));

        let status = seq.capture_and_store();
        assert_eq!(status.path(), Some("/photos/IMG_00001.jpg"));

        let ops = seq.storage().ops_for("/photos/IMG_00001.jpg");
        assert_eq!(
            ops,
            [
                StorageOp::Open("/photos/IMG_00001.jpg".to_string()),
                StorageOp::Write {
                    path: "/photos/IMG_00001.jpg".to_string(),
                    len: 256
                },
                StorageOp::Flush("/photos/IMG_00001.jpg".to_string()),
                StorageOp::Close("/photos/IMG_00001.jpg".to_string()),
            ]
        );
        assert_eq!(seq.storage().file("/photos/IMG_00001.jpg").map(|d| d.len()), Some(256));
        assert_eq!(seq.sensor().released(), 1);
        assert_eq!(seq.sensor().outstanding(), 0);
        // idle (high) -> busy (low) -> idle (high)
        assert_eq!(pin.history(), [true, true, false, true]);
    }

    #[test]
    fn test_sensor_fault_touches_no_storage() {
        let (mut seq, pin) = sequencer(MemoryStorage::with_dir("/photos"));
        seq.sensor_mut().set_always_fail(true);

        assert_eq!(seq.capture_and_store(), CaptureStatus::SensorFault);
        assert!(seq.storage().journal().is_empty());
        assert!(seq.storage().list("/photos").is_empty());
        assert_eq!(pin.level(), Some(true));
        assert!(!seq.indicator().is_lit());
    }

    #[test]
    fn test_open_failure_releases_frame() {
        let mut storage = MemoryStorage::with_dir("/photos");
        storage.set_open_failure(true);
        let (mut seq, pin) = sequencer(storage);

        let status = seq.capture_and_store();
        assert!(matches!(status, CaptureStatus::StorageFault(StorageError::Open(_))));
        assert_eq!(seq.sensor().acquired(), 1);
        assert_eq!(seq.sensor().released(), 1);
        assert_eq!(seq.storage().open_handles(), 0);
        assert_eq!(pin.level(), Some(true));
    }

    #[test]
    fn test_write_failure_closes_without_flush_and_releases() {
        let mut storage = MemoryStorage::with_dir("/photos");
        storage.set_write_failure(true);
        let (mut seq, _pin) = sequencer(storage);

        let status = seq.capture_and_store();
        assert!(matches!(status, CaptureStatus::StorageFault(StorageError::Write(_))));
        let ops = seq.storage().ops_for("/photos/IMG_00001.jpg");
        assert!(matches!(ops.last(), Some(StorageOp::Close(_))));
        assert!(!ops.iter().any(|op| matches!(op, StorageOp::Flush(_))));
        assert_eq!(seq.sensor().released(), 1);
        assert_eq!(seq.storage().open_handles(), 0);
    }

    #[test]
    fn test_flush_failure_still_closes_and_releases() {
        let mut storage = MemoryStorage::with_dir("/photos");
        storage.set_flush_failure(true);
        let (mut seq, pin) = sequencer(storage);

        let status = seq.capture_and_store();
        assert!(matches!(status, CaptureStatus::StorageFault(StorageError::Flush(_))));
        let ops = seq.storage().ops_for("/photos/IMG_00001.jpg");
        let flush = ops.iter().position(|op| matches!(op, StorageOp::Flush(_)));
        let close = ops.iter().position(|op| matches!(op, StorageOp::Close(_)));
        assert!(flush.is_some() && close.is_some());
        assert!(flush < close);
        assert_eq!(seq.storage().file("/photos/IMG_00001.jpg"), None);
        assert_eq!(seq.sensor().released(), 1);
        assert_eq!(pin.level(), Some(true));
    }

    #[test]
    fn test_release_exactly_once_across_paths() {
        let (mut seq, _pin) = sequencer(MemoryStorage::with_dir("/photos"));
        seq.capture_and_store();
        seq.storage_mut().set_open_failure(true);
        seq.capture_and_store();
        seq.storage_mut().set_open_failure(false);
        seq.storage_mut().set_write_failure(true);
        seq.capture_and_store();
        seq.storage_mut().set_write_failure(false);
        seq.storage_mut().set_flush_failure(true);
        seq.capture_and_store();
        seq.storage_mut().set_flush_failure(false);
        seq.capture_and_store();

        let sensor = seq.sensor();
        assert_eq!(sensor.acquired(), 5);
        assert_eq!(sensor.released(), 5);
        assert_eq!(sensor.unknown_releases(), 0);
        assert_eq!(sensor.max_outstanding(), 1);
    }

    #[test]
    fn test_consecutive_captures_have_distinct_paths() {
        let (mut seq, _pin) = sequencer(MemoryStorage::with_dir("/photos"));
        let mut paths = BTreeSet::new();
        let mut indices = Vec::new();
        for _ in 0..20 {
            match seq.capture_and_store() {
                CaptureStatus::Success(record) => {
                    indices.push(record.index);
                    assert!(paths.insert(record.path));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(paths.len(), 20);
        assert_eq!(indices.first(), Some(&1));
        assert_eq!(indices.last(), Some(&20));
    }

    #[test]
    fn test_existing_files_continue_sequence() {
        let mut storage = MemoryStorage::with_dir("/photos");
        storage.add_file("/photos/IMG_00001.jpg", b"x");
        storage.add_file("/photos/IMG_00002.jpg", b"y");
        let (mut seq, _pin) = sequencer(storage);

        assert_eq!(seq.capture_and_store().path(), Some("/photos/IMG_00003.jpg"));
    }

    #[test]
    fn test_taken_name_moves_to_next_index() {
        // IMG_00001 deleted, so the entry count points at a surviving file
        let mut storage = MemoryStorage::with_dir("/photos");
        storage.add_file("/photos/IMG_00002.jpg", b"x");
        storage.add_file("/photos/IMG_00003.jpg", b"y");
        let (mut seq, _pin) = sequencer(storage);

        let status = seq.capture_and_store();
        assert_eq!(status.path(), Some("/photos/IMG_00004.jpg"));
        assert_eq!(seq.storage().file("/photos/IMG_00003.jpg"), Some(&b"y"[..]));
        assert_eq!(seq.storage().file("/photos/IMG_00004.jpg").map(|d| d.len()), Some(256));
        assert_eq!(seq.sensor().released(), 1);
        assert_eq!(seq.storage().open_handles(), 0);
    }

    #[test]
    fn test_taken_names_give_up_after_attempt_limit() {
        // 32 entries, all at or above the count-derived index 33
        let mut storage = MemoryStorage::with_dir("/photos");
        for index in 33..33 + MAX_NAME_ATTEMPTS {
            storage.add_file(&format!("/photos/IMG_{index:05}.jpg"), b"old");
        }
        let (mut seq, _pin) = sequencer(storage);

        let status = seq.capture_and_store();
        assert_eq!(status, CaptureStatus::StorageFault(StorageError::AlreadyExists));
        assert_eq!(seq.namer().last_index(), Some(32 + u64::from(MAX_NAME_ATTEMPTS)));
        assert_eq!(seq.storage_mut().count_entries("/photos"), Ok(32));
        assert_eq!(seq.sensor().released(), 1);
    }

    #[test]
    fn test_other_open_errors_are_not_retried() {
        let mut storage = MemoryStorage::with_dir("/photos");
        storage.set_open_failure(true);
        let (mut seq, _pin) = sequencer(storage);

        assert!(matches!(
            seq.capture_and_store(),
            CaptureStatus::StorageFault(StorageError::Open(_))
        ));
        assert_eq!(seq.namer().last_index(), Some(1));
    }

    #[test]
    fn test_count_failure_falls_back_to_clock_index() {
        let mut storage = MemoryStorage::with_dir("/photos");
        storage.set_count_failure(true);
        let pin = SimOutputPin::new();
        let clock = SimClock::new();
        clock.set(123_456);
        let mut seq = CaptureSequencer::new(
            &CaptureConfig::default(),
            FakeSensor::new(64),
            storage,
            ActiveLowLed::new(pin),
            clock,
        );

        let first = seq.capture_and_store();
        let second = seq.capture_and_store();
        assert_eq!(first.path(), Some("/photos/IMG_123456.jpg"));
        assert_eq!(second.path(), Some("/photos/IMG_123457.jpg"));
    }
}
