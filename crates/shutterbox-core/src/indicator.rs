//! Status LED.
//!
//! On while a capture is in progress, off when idle or after a fault.

use embedded_hal::digital::OutputPin;

/// Busy/idle signalling output
pub trait Indicator {
    fn set_busy(&mut self);
    fn set_idle(&mut self);

    /// Flip the output; used by the init-failure blink loop
    fn toggle(&mut self);
}

/// No indicator line configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

impl Indicator for NoIndicator {
    fn set_busy(&mut self) {}
    fn set_idle(&mut self) {}
    fn toggle(&mut self) {}
}

impl<I: Indicator> Indicator for Option<I> {
    fn set_busy(&mut self) {
        if let Some(indicator) = self {
            indicator.set_busy();
        }
    }

    fn set_idle(&mut self) {
        if let Some(indicator) = self {
            indicator.set_idle();
        }
    }

    fn toggle(&mut self) {
        if let Some(indicator) = self {
            indicator.toggle();
        }
    }
}

/// LED sunk by the GPIO: driving the pin low turns it on
pub struct ActiveLowLed<P> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> ActiveLowLed<P> {
    /// Take the pin and switch the LED off
    pub fn new(mut pin: P) -> Self {
        pin.set_high().ok();
        Self { pin, lit: false }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn drive(&mut self, lit: bool) {
        let result = if lit {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };
        if result.is_err() {
            log::warn!("Indicator pin write failed");
        }
        self.lit = lit;
    }
}

impl<P: OutputPin> Indicator for ActiveLowLed<P> {
    fn set_busy(&mut self) {
        self.drive(true);
    }

    fn set_idle(&mut self) {
        self.drive(false);
    }

    fn toggle(&mut self) {
        let lit = !self.lit;
        self.drive(lit);
    }
}
