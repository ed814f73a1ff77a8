//! Capture and sensor configuration types and builder

use alloc::string::{String, ToString};

pub use crate::error::ConfigError;

/// Shortest accepted debounce window
pub const DEBOUNCE_WINDOW_MIN_MS: u32 = 20;
/// Longest accepted debounce window
pub const DEBOUNCE_WINDOW_MAX_MS: u32 = 60;
/// Default debounce window
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u32 = 40;
/// Default button sampling period
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 5;
/// Default upper bound on the wait for button release after a capture
pub const DEFAULT_RELEASE_TIMEOUT_MS: u32 = 2000;
/// Default sleep between release checks; the watchdog is fed every check
pub const DEFAULT_RELEASE_POLL_MS: u32 = 10;
/// Default capture directory on the card
pub const DEFAULT_CAPTURE_DIR: &str = "/photos";
/// Lowest JPEG quality value the encoder accepts (0 is best)
pub const JPEG_QUALITY_MAX: u8 = 63;

/// Pipeline configuration
///
/// Use [`Builder`] to create a validated `CaptureConfig`.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureConfig {
    /// Time a press must be held before it counts
    pub debounce_window_ms: u32,
    /// Button sampling period of the poll loop
    pub poll_interval_ms: u32,
    /// Upper bound on the post-capture wait for release
    pub release_timeout_ms: u32,
    /// Sleep between release checks
    pub release_poll_ms: u32,
    /// Absolute directory captures are written to
    pub capture_dir: String,
    /// Filename prefix, e.g. `IMG_`
    pub file_prefix: String,
    /// Filename extension without the dot
    pub file_extension: String,
    /// Minimum digits of the zero-padded sequence index
    pub index_width: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            release_timeout_ms: DEFAULT_RELEASE_TIMEOUT_MS,
            release_poll_ms: DEFAULT_RELEASE_POLL_MS,
            capture_dir: DEFAULT_CAPTURE_DIR.to_string(),
            file_prefix: "IMG_".to_string(),
            file_extension: "jpg".to_string(),
            index_width: 5,
        }
    }
}

/// Builder for constructing pipeline configuration
///
/// # Example
///
/// ```
/// use shutterbox_core::Builder;
///
/// let config = Builder::new()
///     .debounce_window_ms(30)
///     .capture_dir("/dcim")
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.debounce_window_ms, 30);
/// ```
#[derive(Default)]
pub struct Builder {
    config: CaptureConfig,
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debounce window (20..=60 ms)
    pub fn debounce_window_ms(mut self, ms: u32) -> Self {
        self.config.debounce_window_ms = ms;
        self
    }

    /// Set the button sampling period
    pub fn poll_interval_ms(mut self, ms: u32) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the bound on the post-capture release wait
    pub fn release_timeout_ms(mut self, ms: u32) -> Self {
        self.config.release_timeout_ms = ms;
        self
    }

    /// Set the sleep between release checks
    pub fn release_poll_ms(mut self, ms: u32) -> Self {
        self.config.release_poll_ms = ms;
        self
    }

    /// Set the capture directory
    pub fn capture_dir(mut self, dir: &str) -> Self {
        self.config.capture_dir = dir.trim_end_matches('/').to_string();
        if self.config.capture_dir.is_empty() && dir.starts_with('/') {
            self.config.capture_dir = "/".to_string();
        }
        self
    }

    /// Set the filename prefix
    pub fn file_prefix(mut self, prefix: &str) -> Self {
        self.config.file_prefix = prefix.to_string();
        self
    }

    /// Set the filename extension (leading dot is stripped)
    pub fn file_extension(mut self, ext: &str) -> Self {
        self.config.file_extension = ext.trim_start_matches('.').to_string();
        self
    }

    /// Set the minimum digits of the sequence index
    pub fn index_width(mut self, width: usize) -> Self {
        self.config.index_width = width;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid field.
    pub fn build(self) -> Result<CaptureConfig, ConfigError> {
        let config = self.config;
        if !(DEBOUNCE_WINDOW_MIN_MS..=DEBOUNCE_WINDOW_MAX_MS).contains(&config.debounce_window_ms)
        {
            return Err(ConfigError::DebounceWindowOutOfRange(
                config.debounce_window_ms,
            ));
        }
        if config.poll_interval_ms == 0 || config.release_poll_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if config.release_timeout_ms == 0 {
            return Err(ConfigError::ZeroReleaseTimeout);
        }
        if !config.capture_dir.starts_with('/') {
            return Err(ConfigError::RelativeCaptureDir(config.capture_dir));
        }
        for part in [&config.file_prefix, &config.file_extension] {
            if part.contains('/') {
                return Err(ConfigError::InvalidFileName(part.clone()));
            }
        }
        Ok(config)
    }
}

/// Sensor resolution class
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameSize {
    /// 320x240
    Qvga,
    /// 640x480
    Vga,
    /// 800x600
    Svga,
    /// 1024x768
    Xga,
    /// 1280x1024
    Sxga,
    /// 1600x1200
    Uxga,
}

impl FrameSize {
    /// Pixel dimensions `(width, height)`
    pub fn dimensions(&self) -> (u16, u16) {
        match self {
            FrameSize::Qvga => (320, 240),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }
}

/// Where the driver places frame buffers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameLocation {
    /// External PSRAM
    Psram,
    /// Internal DRAM
    Dram,
}

/// Driver policy when all frame buffers are full
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabMode {
    /// Block until a buffer slot is free
    WhenEmpty,
    /// Drop stale frames and always hand out the newest
    Latest,
}

/// Image tuning applied once after sensor init
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorTuning {
    pub vflip: bool,
    /// -2..=2
    pub brightness: i8,
    /// -2..=2
    pub saturation: i8,
    pub white_balance: bool,
    pub auto_gain: bool,
}

impl Default for SensorTuning {
    fn default() -> Self {
        SensorTuning {
            vflip: true,
            brightness: 1,
            saturation: -1,
            white_balance: true,
            auto_gain: true,
        }
    }
}

/// Sensor setup negotiated once at startup
///
/// Pixel format is always JPEG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorSettings {
    pub frame_size: FrameSize,
    /// 0..=63, lower is better quality
    pub jpeg_quality: u8,
    pub frame_buffers: u8,
    pub location: FrameLocation,
    pub grab_mode: GrabMode,
    pub tuning: SensorTuning,
}

impl SensorSettings {
    /// Pick the profile for the available memory
    ///
    /// With PSRAM the sensor runs at full resolution with two buffers and
    /// always hands out the newest frame. Without it a single DRAM buffer
    /// limits the frame size and the driver waits for a free slot.
    pub fn for_memory(psram_available: bool) -> Self {
        if psram_available {
            SensorSettings {
                frame_size: FrameSize::Uxga,
                jpeg_quality: 10,
                frame_buffers: 2,
                location: FrameLocation::Psram,
                grab_mode: GrabMode::Latest,
                tuning: SensorTuning::default(),
            }
        } else {
            SensorSettings {
                frame_size: FrameSize::Svga,
                jpeg_quality: 12,
                frame_buffers: 1,
                location: FrameLocation::Dram,
                grab_mode: GrabMode::WhenEmpty,
                tuning: SensorTuning::default(),
            }
        }
    }

    /// Check value ranges before handing the settings to a driver
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jpeg_quality > JPEG_QUALITY_MAX {
            return Err(ConfigError::JpegQualityOutOfRange(self.jpeg_quality));
        }
        if self.frame_buffers == 0 {
            return Err(ConfigError::ZeroFrameBuffers);
        }
        for level in [self.tuning.brightness, self.tuning.saturation] {
            if !(-2..=2).contains(&level) {
                return Err(ConfigError::TuningOutOfRange(level));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Builder::new().build().unwrap();
        assert_eq!(config, CaptureConfig::default());
        assert_eq!(config.debounce_window_ms, 40);
        assert_eq!(config.release_timeout_ms, 2000);
        assert_eq!(config.capture_dir, "/photos");
    }

    #[test]
    fn test_debounce_window_bounds() {
        assert!(Builder::new().debounce_window_ms(20).build().is_ok());
        assert!(Builder::new().debounce_window_ms(60).build().is_ok());
        assert_eq!(
            Builder::new().debounce_window_ms(19).build(),
            Err(ConfigError::DebounceWindowOutOfRange(19))
        );
        assert_eq!(
            Builder::new().debounce_window_ms(61).build(),
            Err(ConfigError::DebounceWindowOutOfRange(61))
        );
    }

    #[test]
    fn test_capture_dir_normalized_and_checked() {
        let config = Builder::new().capture_dir("/dcim/").build().unwrap();
        assert_eq!(config.capture_dir, "/dcim");
        assert!(matches!(
            Builder::new().capture_dir("dcim").build(),
            Err(ConfigError::RelativeCaptureDir(_))
        ));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        assert_eq!(
            Builder::new().poll_interval_ms(0).build(),
            Err(ConfigError::ZeroPollInterval)
        );
        assert_eq!(
            Builder::new().release_timeout_ms(0).build(),
            Err(ConfigError::ZeroReleaseTimeout)
        );
    }

    #[test]
    fn test_extension_dot_stripped() {
        let config = Builder::new().file_extension(".jpeg").build().unwrap();
        assert_eq!(config.file_extension, "jpeg");
    }

    #[test]
    fn test_sensor_profile_follows_psram() {
        let high = SensorSettings::for_memory(true);
        assert_eq!(high.frame_size, FrameSize::Uxga);
        assert_eq!(high.location, FrameLocation::Psram);
        assert_eq!(high.grab_mode, GrabMode::Latest);
        assert_eq!(high.frame_buffers, 2);

        let low = SensorSettings::for_memory(false);
        assert_eq!(low.frame_size, FrameSize::Svga);
        assert_eq!(low.location, FrameLocation::Dram);
        assert_eq!(low.grab_mode, GrabMode::WhenEmpty);
        assert_eq!(low.frame_buffers, 1);

        assert!(high.validate().is_ok());
        assert!(low.validate().is_ok());
    }

    #[test]
    fn test_sensor_settings_validation() {
        let mut settings = SensorSettings::for_memory(false);
        settings.jpeg_quality = 64;
        assert_eq!(
            settings.validate(),
            Err(ConfigError::JpegQualityOutOfRange(64))
        );

        let mut settings = SensorSettings::for_memory(false);
        settings.tuning.brightness = 3;
        assert_eq!(settings.validate(), Err(ConfigError::TuningOutOfRange(3)));
    }
}
