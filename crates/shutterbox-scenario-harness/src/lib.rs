//! Host-side scenario test harness for scripted button/capture flows.

use shutterbox_core::{
    ActiveLowLed, CaptureConfig, CaptureSequencer, CaptureStatus, CountingWatchdog, FakeSensor,
    MemoryStorage, MonotonicClock, PollEvent, PollLoop, ReleaseWait, ScriptedButton,
    SessionStats, SimClock, SimDelay, SimOutputPin,
};

type ScenarioLoop = PollLoop<
    ScriptedButton,
    FakeSensor,
    MemoryStorage,
    ActiveLowLed<SimOutputPin>,
    SimClock,
    SimDelay,
    CountingWatchdog,
>;

/// Frame size produced by the harness sensor
pub const FRAME_LEN: usize = 4096;

/// Couples the poll loop with simulated button, LED, watchdog and storage.
pub struct ScenarioHarness {
    clock: SimClock,
    button: ScriptedButton,
    led: SimOutputPin,
    watchdog: CountingWatchdog,
    poll: ScenarioLoop,
    events: Vec<PollEvent>,
}

impl ScenarioHarness {
    /// Construct a harness with caller-provided config and storage state.
    pub fn new(config: CaptureConfig, storage: MemoryStorage) -> Self {
        let clock = SimClock::new();
        let button = ScriptedButton::new(clock.clone());
        let led = SimOutputPin::new();
        let watchdog = CountingWatchdog::new(clock.clone());

        let sequencer = CaptureSequencer::new(
            &config,
            FakeSensor::new(FRAME_LEN),
            storage,
            ActiveLowLed::new(led.clone()),
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

        Self {
            clock,
            button,
            led,
            watchdog,
            poll,
            events: Vec::new(),
        }
    }

    /// Default config with an empty capture directory.
    pub fn with_defaults() -> Self {
        let config = CaptureConfig::default();
        let storage = MemoryStorage::with_dir(&config.capture_dir);
        Self::new(config, storage)
    }

    /// Schedule a press of `duration_ms` starting at `start_ms`.
    pub fn press(&mut self, start_ms: u64, duration_ms: u64) -> &mut Self {
        self.button.press(start_ms, duration_ms);
        self
    }

    /// Schedule a press that is never released.
    pub fn hold_from(&mut self, start_ms: u64) -> &mut Self {
        self.button.hold_from(start_ms);
        self
    }

    /// Tick the poll loop until virtual time reaches `until_ms`.
    /// Returns the number of captures attempted during the run.
    pub fn run_until(&mut self, until_ms: u64) -> usize {
        const MAX_TICKS: usize = 1_000_000;
        let before = self.events.len();

        for _ in 0..MAX_TICKS {
            if self.clock.now_ms() >= until_ms {
                break;
            }
            match self.poll.tick() {
                PollEvent::Idle => {}
                event => self.events.push(event),
            }
        }

        self.events.len() - before
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Capture events recorded so far.
    pub fn events(&self) -> &[PollEvent] {
        &self.events
    }

    /// Statuses of all captures so far.
    pub fn statuses(&self) -> Vec<&CaptureStatus> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PollEvent::Captured { status, .. } => Some(status),
                PollEvent::Idle => None,
            })
            .collect()
    }

    /// Release-wait outcomes of all captures so far.
    pub fn release_waits(&self) -> Vec<ReleaseWait> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PollEvent::Captured { release, .. } => Some(*release),
                PollEvent::Idle => None,
            })
            .collect()
    }

    /// Paths of successful captures, in order.
    pub fn saved_paths(&self) -> Vec<String> {
        self.statuses()
            .into_iter()
            .filter_map(|status| status.path().map(str::to_string))
            .collect()
    }

    pub fn stats(&self) -> SessionStats {
        self.poll.stats()
    }

    pub fn storage(&self) -> &MemoryStorage {
        self.poll.sequencer().storage()
    }

    /// Access storage for fault injection.
    pub fn storage_mut(&mut self) -> &mut MemoryStorage {
        self.poll.sequencer_mut().storage_mut()
    }

    pub fn sensor(&self) -> &FakeSensor {
        self.poll.sequencer().sensor()
    }

    /// Access the sensor for fault injection.
    pub fn sensor_mut(&mut self) -> &mut FakeSensor {
        self.poll.sequencer_mut().sensor_mut()
    }

    /// Indicator pin levels written so far (`false` = LED on).
    pub fn led_history(&self) -> Vec<bool> {
        self.led.history()
    }

    /// Whether the LED is currently off.
    pub fn led_idle(&self) -> bool {
        self.led.level() != Some(false)
    }

    pub fn watchdog(&self) -> &CountingWatchdog {
        &self.watchdog
    }
}
