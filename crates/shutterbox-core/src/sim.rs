//! Simulated peripherals for host tests.
//!
//! Time is virtual: [`SimClock`] only moves when a [`SimDelay`] sleeps or a
//! test advances it, so scenarios spanning seconds run instantly and
//! deterministically. Handles are cheap clones sharing state, letting a test
//! keep an observer while the pipeline owns the peripheral.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::platform::{MonotonicClock, Watchdog};
use crate::sensor::{FrameBuffer, FrameSource};

/// Shared virtual millisecond clock
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ms: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.set(ms);
    }
}

impl MonotonicClock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

/// Delay that advances a [`SimClock`] instead of sleeping
#[derive(Debug, Clone)]
pub struct SimDelay {
    clock: SimClock,
    carry_ns: u64,
}

impl SimDelay {
    pub fn new(clock: SimClock) -> Self {
        Self { clock, carry_ns: 0 }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let total = self.carry_ns + u64::from(ns);
        self.clock.advance(total / 1_000_000);
        self.carry_ns = total % 1_000_000;
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_ns(us.saturating_mul(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.advance(u64::from(ms));
    }
}

/// Active-low button driven by a schedule of presses on the virtual clock
#[derive(Debug, Clone)]
pub struct ScriptedButton {
    clock: SimClock,
    presses: Rc<RefCell<Vec<(u64, u64)>>>,
    reads: Rc<Cell<u64>>,
}

impl ScriptedButton {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            presses: Rc::new(RefCell::new(Vec::new())),
            reads: Rc::new(Cell::new(0)),
        }
    }

    /// Hold the button for `duration_ms` starting at `start_ms`
    pub fn press(&self, start_ms: u64, duration_ms: u64) {
        self.presses
            .borrow_mut()
            .push((start_ms, start_ms.saturating_add(duration_ms)));
    }

    /// Hold the button from `start_ms` onwards, never releasing
    pub fn hold_from(&self, start_ms: u64) {
        self.presses.borrow_mut().push((start_ms, u64::MAX));
    }

    /// Whether the button is held at `now_ms`
    pub fn is_pressed_at(&self, now_ms: u64) -> bool {
        self.presses
            .borrow()
            .iter()
            .any(|&(start, end)| start <= now_ms && now_ms < end)
    }

    /// Number of level reads so far
    pub fn reads(&self) -> u64 {
        self.reads.get()
    }
}

impl ErrorType for ScriptedButton {
    type Error = Infallible;
}

impl InputPin for ScriptedButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.reads.set(self.reads.get() + 1);
        Ok(!self.is_pressed_at(self.clock.now_ms()))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Output pin recording every level written (`true` = high)
#[derive(Debug, Clone, Default)]
pub struct SimOutputPin {
    history: Rc<RefCell<Vec<bool>>>,
}

impl SimOutputPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level, `None` before the first write
    pub fn level(&self) -> Option<bool> {
        self.history.borrow().last().copied()
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }
}

impl ErrorType for SimOutputPin {
    type Error = Infallible;
}

impl OutputPin for SimOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.history.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.history.borrow_mut().push(true);
        Ok(())
    }
}

/// Watchdog counting its feeds, with the virtual time of each feed
#[derive(Debug, Clone)]
pub struct CountingWatchdog {
    clock: SimClock,
    feeds: Rc<RefCell<Vec<u64>>>,
}

impl CountingWatchdog {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            feeds: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn count(&self) -> usize {
        self.feeds.borrow().len()
    }

    /// Feeds at or after `since_ms`
    pub fn count_since(&self, since_ms: u64) -> usize {
        self.feeds.borrow().iter().filter(|&&t| t >= since_ms).count()
    }

    /// Longest stretch of virtual time without a feed, from `from_ms` to the last feed
    pub fn longest_gap_since(&self, from_ms: u64) -> u64 {
        let feeds = self.feeds.borrow();
        let mut last = from_ms;
        let mut gap = 0;
        for &t in feeds.iter().filter(|&&t| t >= from_ms) {
            gap = gap.max(t - last);
            last = t;
        }
        gap
    }
}

impl Watchdog for CountingWatchdog {
    fn feed(&mut self) {
        self.feeds.borrow_mut().push(self.clock.now_ms());
    }
}

/// Frame handed out by [`FakeSensor`]
#[derive(Debug)]
pub struct SimFrame {
    id: u32,
    data: Vec<u8>,
}

impl SimFrame {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl FrameBuffer for SimFrame {
    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Sensor producing synthetic JPEG-framed payloads
///
/// Tracks every acquisition and release so tests can check buffer
/// accounting on each exit path.
#[derive(Debug)]
pub struct FakeSensor {
    frame_len: usize,
    next_id: u32,
    outstanding: Vec<u32>,
    max_outstanding: usize,
    acquired: u32,
    released: u32,
    unknown_releases: u32,
    failures_remaining: u32,
    always_fail: bool,
    pool_size: usize,
}

impl FakeSensor {
    /// Sensor with a single-buffer pool producing `frame_len`-byte frames
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len: frame_len.max(4),
            next_id: 1,
            outstanding: Vec::new(),
            max_outstanding: 0,
            acquired: 0,
            released: 0,
            unknown_releases: 0,
            failures_remaining: 0,
            always_fail: false,
            pool_size: 1,
        }
    }

    /// Fail the next `count` acquisitions
    pub fn fail_next(&mut self, count: u32) {
        self.failures_remaining = count;
    }

    /// Fail every acquisition
    pub fn set_always_fail(&mut self, fail: bool) {
        self.always_fail = fail;
    }

    pub fn acquired(&self) -> u32 {
        self.acquired
    }

    pub fn released(&self) -> u32 {
        self.released
    }

    /// Frames acquired but not yet released
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Highest number of frames held at once
    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding
    }

    /// Releases of frames this sensor never handed out (or already took back)
    pub fn unknown_releases(&self) -> u32 {
        self.unknown_releases
    }

    fn payload(&self, id: u32) -> Vec<u8> {
        // SOI marker, frame id filler, EOI marker
        let mut data = vec![(id & 0xFF) as u8; self.frame_len];
        data[0] = 0xFF;
        data[1] = 0xD8;
        data[self.frame_len - 2] = 0xFF;
        data[self.frame_len - 1] = 0xD9;
        data
    }
}

impl FrameSource for FakeSensor {
    type Frame = SimFrame;

    fn acquire_frame(&mut self) -> Option<SimFrame> {
        if self.always_fail {
            return None;
        }
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return None;
        }
        if self.outstanding.len() >= self.pool_size {
            log::warn!("Frame pool exhausted");
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.acquired += 1;
        self.outstanding.push(id);
        self.max_outstanding = self.max_outstanding.max(self.outstanding.len());
        Some(SimFrame {
            id,
            data: self.payload(id),
        })
    }

    fn release_frame(&mut self, frame: SimFrame) {
        match self.outstanding.iter().position(|&id| id == frame.id) {
            Some(pos) => {
                self.outstanding.remove(pos);
                self.released += 1;
            }
            None => self.unknown_releases += 1,
        }
    }
}
