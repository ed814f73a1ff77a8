//! Fixed-period poll loop tying the button to the capture sequencer.
//!
//! Each tick samples the button, feeds the [`Debouncer`] and, on activation,
//! runs one capture synchronously. It then waits for the button to be
//! released so a single long press cannot trigger repeated captures. The wait
//! is bounded by the release timeout and feeds the watchdog on every check.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

use crate::config::CaptureConfig;
use crate::debounce::Debouncer;
use crate::indicator::Indicator;
use crate::platform::{MonotonicClock, Watchdog};
use crate::sensor::FrameSource;
use crate::sequencer::{CaptureSequencer, CaptureStatus};
use crate::storage::Storage;

/// How the post-capture wait for release ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseWait {
    Released { waited_ms: u64 },
    /// Button still held when the bound ran out
    TimedOut { waited_ms: u64 },
}

/// Outcome of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// No activation this tick
    Idle,
    /// An activation ran a capture
    Captured {
        status: CaptureStatus,
        release: ReleaseWait,
    },
}

/// Counters for the current session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub activations: u32,
    pub saved: u32,
    pub sensor_faults: u32,
    pub storage_faults: u32,
    pub release_timeouts: u32,
}

pub struct PollLoop<B, F, S, I, C, D, W> {
    button: B,
    debouncer: Debouncer,
    sequencer: CaptureSequencer<F, S, I, C>,
    clock: C,
    delay: D,
    watchdog: W,
    poll_interval_ms: u32,
    release_timeout_ms: u64,
    release_poll_ms: u32,
    stats: SessionStats,
}

impl<B, F, S, I, C, D, W> PollLoop<B, F, S, I, C, D, W>
where
    B: InputPin,
    F: FrameSource,
    S: Storage,
    I: Indicator,
    C: MonotonicClock,
    D: DelayNs,
    W: Watchdog,
{
    pub fn new(
        config: &CaptureConfig,
        button: B,
        sequencer: CaptureSequencer<F, S, I, C>,
        clock: C,
        delay: D,
        watchdog: W,
    ) -> Self {
        Self {
            button,
            debouncer: Debouncer::new(config.debounce_window_ms),
            sequencer,
            clock,
            delay,
            watchdog,
            poll_interval_ms: config.poll_interval_ms,
            release_timeout_ms: u64::from(config.release_timeout_ms),
            release_poll_ms: config.release_poll_ms,
            stats: SessionStats::default(),
        }
    }

    /// Run forever
    pub fn run(&mut self) -> ! {
        log::info!(
            "Polling shutter every {}ms (debounce {}ms)",
            self.poll_interval_ms,
            self.debouncer.window_ms()
        );
        loop {
            self.tick();
        }
    }

    /// One poll followed by the poll-interval sleep
    pub fn tick(&mut self) -> PollEvent {
        let event = self.poll();
        self.delay.delay_ms(self.poll_interval_ms);
        event
    }

    /// Sample the button once and capture on activation
    pub fn poll(&mut self) -> PollEvent {
        self.watchdog.feed();
        let now = self.clock.now_ms();
        let level = self.read_level();

        let Some(activation) = self.debouncer.sample(level, now) else {
            return PollEvent::Idle;
        };

        self.stats.activations += 1;
        log::info!(
            "Shutter pressed (settled after {}ms)",
            activation.settled_at_ms - activation.pressed_at_ms
        );

        let status = self.sequencer.capture_and_store();
        match status {
            CaptureStatus::Success(_) => self.stats.saved += 1,
            CaptureStatus::SensorFault => self.stats.sensor_faults += 1,
            CaptureStatus::StorageFault(_) => self.stats.storage_faults += 1,
        }

        let release = self.wait_for_release();
        if let ReleaseWait::TimedOut { .. } = release {
            self.stats.release_timeouts += 1;
        }

        let stats = self.stats;
        log::info!(
            "Session: {} presses, {} saved, {} sensor faults, {} storage faults",
            stats.activations,
            stats.saved,
            stats.sensor_faults,
            stats.storage_faults
        );

        PollEvent::Captured { status, release }
    }

    /// Block until the button is released or the release bound runs out,
    /// feeding the watchdog on every check
    pub fn wait_for_release(&mut self) -> ReleaseWait {
        let start = self.clock.now_ms();
        loop {
            self.watchdog.feed();
            let now = self.clock.now_ms();
            let waited_ms = now.saturating_sub(start);

            if self.read_level() {
                self.debouncer.sample(true, now);
                return ReleaseWait::Released { waited_ms };
            }

            if waited_ms >= self.release_timeout_ms {
                log::warn!(
                    "Shutter still held after {}ms, resuming polling",
                    waited_ms
                );
                return ReleaseWait::TimedOut { waited_ms };
            }

            self.delay.delay_ms(self.release_poll_ms);
        }
    }

    /// Electrical level of the button; read errors count as released
    fn read_level(&mut self) -> bool {
        match self.button.is_high() {
            Ok(high) => high,
            Err(e) => {
                log::warn!("Shutter read failed: {:?}", e);
                true
            }
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn sequencer(&self) -> &CaptureSequencer<F, S, I, C> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut CaptureSequencer<F, S, I, C> {
        &mut self.sequencer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::NoIndicator;
    use crate::mock_storage::MemoryStorage;
    use crate::sim::{CountingWatchdog, FakeSensor, ScriptedButton, SimClock, SimDelay};
    use alloc::vec::Vec;

    type TestLoop = PollLoop<
        ScriptedButton,
        FakeSensor,
        MemoryStorage,
        NoIndicator,
        SimClock,
        SimDelay,
        CountingWatchdog,
    >;

    struct Rig {
        clock: SimClock,
        button: ScriptedButton,
        watchdog: CountingWatchdog,
        poll: TestLoop,
    }

    fn rig() -> Rig {
        let config = CaptureConfig::default();
        let clock = SimClock::new();
        let button = ScriptedButton::new(clock.clone());
        let watchdog = CountingWatchdog::new(clock.clone());
        let sequencer = CaptureSequencer::new(
            &config,
            FakeSensor::new(128),
            MemoryStorage::with_dir("/photos"),
            NoIndicator,
            clock.clone(),
        );
        let poll = PollLoop::new(
            &config,
            button.clone(),
            sequencer,
            clock.clone(),
            SimDelay::new(clock.clone()),
            watchdog.clone(),
        );
        Rig {
            clock,
            button,
            watchdog,
            poll,
        }
    }

    fn run_until(rig: &mut Rig, until_ms: u64) -> Vec<PollEvent> {
        let mut events = Vec::new();
        while rig.clock.now_ms() < until_ms {
            match rig.poll.tick() {
                PollEvent::Idle => {}
                event => events.push(event),
            }
        }
        events
    }

    #[test]
    fn test_short_press_is_ignored() {
        let mut rig = rig();
        rig.button.press(100, 10);
        assert!(run_until(&mut rig, 1000).is_empty());
        assert_eq!(rig.poll.stats().activations, 0);
    }

    #[test]
    fn test_long_press_captures_once() {
        let mut rig = rig();
        rig.button.press(100, 100);
        let events = run_until(&mut rig, 1000);
        assert_eq!(events.len(), 1);
        match &events[0] {
            PollEvent::Captured { status, release } => {
                assert!(status.is_success());
                assert!(matches!(release, ReleaseWait::Released { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rig.poll.stats().saved, 1);
    }

    #[test]
    fn test_stuck_button_times_out_without_repeat_capture() {
        let mut rig = rig();
        rig.button.press(100, 5000);
        let events = run_until(&mut rig, 8000);

        assert_eq!(events.len(), 1);
        match &events[0] {
            PollEvent::Captured { release, .. } => {
                assert_eq!(*release, ReleaseWait::TimedOut { waited_ms: 2000 });
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rig.poll.stats().release_timeouts, 1);
        assert_eq!(rig.poll.sequencer().sensor().acquired(), 1);
        // Watchdog never went unfed for longer than one release check.
        assert!(rig.watchdog.longest_gap_since(100) <= 10);
    }

    #[test]
    fn test_new_press_after_release_captures_again() {
        let mut rig = rig();
        rig.button.press(100, 80);
        rig.button.press(400, 80);
        rig.button.press(700, 20);
        let events = run_until(&mut rig, 1200);
        assert_eq!(events.len(), 2);
        assert_eq!(rig.poll.stats().activations, 2);
        assert_eq!(rig.poll.sequencer().storage().list("/photos").len(), 2);
    }
}
