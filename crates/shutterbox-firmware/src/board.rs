//! AI-Thinker ESP32-CAM pin map.
//!
//! SD/MMC runs in 1-bit mode (CLK 14, CMD 15, D0 2), which leaves GPIO4
//! (flash LED) dark and GPIO13 free for the shutter button.

/// OV2640 power-down
pub const CAM_PIN_PWDN: i32 = 32;
/// Reset not wired
pub const CAM_PIN_RESET: i32 = -1;
pub const CAM_PIN_XCLK: i32 = 0;
pub const CAM_PIN_SIOD: i32 = 26;
pub const CAM_PIN_SIOC: i32 = 27;

/// Data lines D0..D7 (Y2..Y9)
pub const CAM_PIN_DATA: [i32; 8] = [5, 18, 19, 21, 36, 39, 34, 35];
pub const CAM_PIN_VSYNC: i32 = 25;
pub const CAM_PIN_HREF: i32 = 23;
pub const CAM_PIN_PCLK: i32 = 22;

pub const CAM_XCLK_FREQ_HZ: i32 = 20_000_000;

/// Mount point of the FAT volume on the card
pub const SD_MOUNT_POINT: &str = "/sdcard";
pub const SD_MAX_FILES: i32 = 5;
