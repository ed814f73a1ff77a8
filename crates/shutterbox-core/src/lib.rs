//! Capture pipeline for a single-button camera board.
//! Debounces the shutter button, captures one frame per press and persists it
//! durably to removable storage. Works on ESP32 and on the host.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::unreachable,
        clippy::unwrap_used
    )
)]

extern crate alloc;

pub mod config;
pub mod debounce;
pub mod error;
pub mod indicator;
pub mod naming;
pub mod platform;
pub mod poll_loop;
pub mod sensor;
pub mod sequencer;
pub mod startup;
pub mod storage;

#[cfg(any(test, feature = "std"))]
pub mod mock_storage;
#[cfg(any(test, feature = "std"))]
pub mod sim;

pub use config::{
    Builder, CaptureConfig, FrameLocation, FrameSize, GrabMode, SensorSettings, SensorTuning,
};
pub use debounce::{Activation, Debouncer};
pub use error::{ConfigError, InitFault, StorageError};
pub use indicator::{ActiveLowLed, Indicator, NoIndicator};
pub use naming::{CaptureRecord, FileNamer, IndexSource};
pub use platform::{MonotonicClock, NoWatchdog, Watchdog};
pub use poll_loop::{PollEvent, PollLoop, ReleaseWait, SessionStats};
pub use sensor::{FrameBuffer, FrameSource};
pub use sequencer::{CaptureSequencer, CaptureStatus};
pub use storage::{join_path, OpenMode, Storage};

#[cfg(any(test, feature = "std"))]
pub use mock_storage::{MemoryStorage, StorageOp};
#[cfg(any(test, feature = "std"))]
pub use sim::{CountingWatchdog, FakeSensor, ScriptedButton, SimClock, SimDelay, SimOutputPin};
