//! Time and liveness capabilities supplied by the platform.

/// Monotonic millisecond clock
pub trait MonotonicClock {
    /// Milliseconds since an arbitrary fixed origin; never decreases.
    fn now_ms(&self) -> u64;
}

/// Platform liveness signal (task watchdog)
///
/// Fed on every poll iteration and on every check of the release wait,
/// since that wait can outlast the watchdog deadline.
pub trait Watchdog {
    fn feed(&mut self);
}

/// For platforms without a task watchdog
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWatchdog;

impl Watchdog for NoWatchdog {
    fn feed(&mut self) {}
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

impl<T: Watchdog + ?Sized> Watchdog for &mut T {
    fn feed(&mut self) {
        (**self).feed()
    }
}

impl<W: Watchdog> Watchdog for Option<W> {
    fn feed(&mut self) {
        if let Some(watchdog) = self {
            watchdog.feed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CountingWatchdog, SimClock};

    #[test]
    fn optional_watchdog_feeds_when_present() {
        let counter = CountingWatchdog::new(SimClock::new());
        let mut present = Some(counter.clone());
        present.feed();
        present.feed();
        assert_eq!(counter.count(), 2);

        let mut absent: Option<CountingWatchdog> = None;
        absent.feed();
    }
}
