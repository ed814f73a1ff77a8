//! Bring-up checks and the terminal init-failure state.

use embedded_hal::delay::DelayNs;

use crate::config::CaptureConfig;
use crate::error::InitFault;
use crate::indicator::Indicator;
use crate::platform::Watchdog;
use crate::storage::Storage;

/// Blink half-period while halted
pub const HALT_BLINK_MS: u32 = 200;

/// Make sure the capture directory exists on the mounted card
pub fn prepare_storage<S: Storage>(
    storage: &mut S,
    config: &CaptureConfig,
) -> Result<usize, InitFault> {
    storage
        .ensure_dir(&config.capture_dir)
        .map_err(InitFault::CaptureDir)?;
    let existing = storage
        .count_entries(&config.capture_dir)
        .map_err(InitFault::CaptureDir)?;
    log::info!(
        "Capture directory {} ready ({} existing entries)",
        config.capture_dir,
        existing
    );
    Ok(existing)
}

/// One blink half-period: flip the LED, sleep, feed the watchdog
pub fn halt_blink_step<I, D, W>(indicator: &mut I, delay: &mut D, watchdog: &mut W)
where
    I: Indicator,
    D: DelayNs,
    W: Watchdog,
{
    indicator.toggle();
    delay.delay_ms(HALT_BLINK_MS);
    watchdog.feed();
}

/// Blink forever. Requires a physical reset to leave.
pub fn halt<I, D, W>(fault: &InitFault, mut indicator: I, mut delay: D, mut watchdog: W) -> !
where
    I: Indicator,
    D: DelayNs,
    W: Watchdog,
{
    log::error!("Init failed: {}. Halting; reset the board to retry.", fault);
    loop {
        halt_blink_step(&mut indicator, &mut delay, &mut watchdog);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::{ActiveLowLed, NoIndicator};
    use crate::mock_storage::{MemoryStorage, StorageOp};
    use crate::platform::{MonotonicClock, NoWatchdog};
    use crate::sim::{CountingWatchdog, SimClock, SimDelay, SimOutputPin};
    use alloc::string::ToString;

    #[test]
    fn test_prepare_storage_creates_capture_dir() {
        let mut storage = MemoryStorage::empty();
        let existing = prepare_storage(&mut storage, &CaptureConfig::default()).unwrap();
        assert_eq!(existing, 0);
        assert!(storage.exists("/photos"));
        assert_eq!(
            storage.journal().first(),
            Some(&StorageOp::EnsureDir("/photos".to_string()))
        );
    }

    #[test]
    fn test_prepare_storage_reports_existing_entries() {
        let mut storage = MemoryStorage::with_dir("/photos");
        storage.add_file("/photos/IMG_00001.jpg", b"x");
        assert_eq!(prepare_storage(&mut storage, &CaptureConfig::default()), Ok(1));
    }

    #[test]
    fn test_prepare_storage_fails_when_path_is_file() {
        let mut storage = MemoryStorage::empty();
        storage.add_file("/photos", b"not a dir");
        assert!(matches!(
            prepare_storage(&mut storage, &CaptureConfig::default()),
            Err(InitFault::CaptureDir(_))
        ));
    }

    #[test]
    fn test_halt_blink_alternates_and_feeds() {
        let clock = SimClock::new();
        let pin = SimOutputPin::new();
        let mut led = ActiveLowLed::new(pin.clone());
        let mut delay = SimDelay::new(clock.clone());
        let mut watchdog = CountingWatchdog::new(clock.clone());

        for _ in 0..4 {
            halt_blink_step(&mut led, &mut delay, &mut watchdog);
        }
        assert_eq!(pin.history(), [true, false, true, false, true]);
        assert_eq!(watchdog.count(), 4);
        assert_eq!(clock.now_ms(), 4 * u64::from(HALT_BLINK_MS));
    }

    #[test]
    fn test_halt_blink_without_indicator_or_watchdog_still_sleeps() {
        let clock = SimClock::new();
        let mut delay = SimDelay::new(clock.clone());

        for _ in 0..3 {
            halt_blink_step(&mut NoIndicator, &mut delay, &mut NoWatchdog);
        }
        assert_eq!(clock.now_ms(), 3 * u64::from(HALT_BLINK_MS));
    }

    #[test]
    fn test_peripheral_fault_reports_code() {
        let fault = InitFault::Peripheral(0x103);
        assert!(fault.to_string().contains("0x103"));
    }
}
