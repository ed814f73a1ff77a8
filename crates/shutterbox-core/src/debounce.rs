//! Shutter button debouncing.
//!
//! The button is wired active-low against a pull-up: a low level means
//! pressed. A press only counts once it has been held for the debounce
//! window, and each physical press yields at most one [`Activation`].

/// A single logical press, emitted once the press has settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    /// Time the press began
    pub pressed_at_ms: u64,
    /// Time the press was accepted
    pub settled_at_ms: u64,
}

/// Debounce state for one active-low input line
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: u64,
    raw_level: bool,
    last_stable_level: bool,
    edge_timestamp_ms: u64,
    fired: bool,
}

impl Debouncer {
    /// Create a debouncer; the line starts out released (high).
    pub fn new(window_ms: u32) -> Self {
        Debouncer {
            window_ms: u64::from(window_ms),
            raw_level: true,
            last_stable_level: true,
            edge_timestamp_ms: 0,
            fired: false,
        }
    }

    /// Feed one sample of the electrical level (`true` = high = released).
    ///
    /// Returns an activation the first time a press has been held for the
    /// full window. Presses released earlier are dropped as noise.
    pub fn sample(&mut self, raw_level: bool, now_ms: u64) -> Option<Activation> {
        let pressed = !raw_level;
        let was_pressed = !self.raw_level;
        self.raw_level = raw_level;

        if !pressed {
            if self.fired {
                log::debug!(
                    "Button released after {}ms",
                    now_ms.saturating_sub(self.edge_timestamp_ms)
                );
            }
            self.last_stable_level = true;
            self.fired = false;
            return None;
        }

        if !was_pressed {
            self.edge_timestamp_ms = now_ms;
            return None;
        }

        if !self.fired && now_ms.saturating_sub(self.edge_timestamp_ms) >= self.window_ms {
            self.fired = true;
            self.last_stable_level = false;
            return Some(Activation {
                pressed_at_ms: self.edge_timestamp_ms,
                settled_at_ms: now_ms,
            });
        }

        None
    }

    /// Last accepted level (`true` = released)
    pub fn stable_level(&self) -> bool {
        self.last_stable_level
    }

    /// Time the current or most recent press began
    pub fn edge_timestamp_ms(&self) -> u64 {
        self.edge_timestamp_ms
    }

    /// Whether the current press has already produced its activation
    pub fn is_latched(&self) -> bool {
        self.fired
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }
}
