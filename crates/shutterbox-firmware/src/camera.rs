//! OV2640 sensor through the esp32-camera component.
//!
//! Frame buffers live in the driver's pool; `esp_camera_fb_get` lends one out
//! and `esp_camera_fb_return` hands it back.

use core::ffi::c_int;
use core::ptr::NonNull;

use esp_idf_svc::sys::{self, camera, esp};
use shutterbox_core::{
    FrameBuffer, FrameLocation, FrameSize, FrameSource, GrabMode, InitFault, SensorSettings,
    SensorTuning,
};

use crate::board::*;

/// A frame buffer borrowed from the camera driver
pub struct CameraFrame {
    fb: NonNull<camera::camera_fb_t>,
}

impl FrameBuffer for CameraFrame {
    fn data(&self) -> &[u8] {
        unsafe {
            let fb = self.fb.as_ref();
            core::slice::from_raw_parts(fb.buf, fb.len)
        }
    }
}

/// Initialised camera driver
pub struct Camera {
    settings: SensorSettings,
}

impl Camera {
    /// Configure the sensor once; never renegotiated per capture
    pub fn init(settings: SensorSettings) -> Result<Self, InitFault> {
        settings.validate()?;

        let config = camera_config(&settings);
        esp!(unsafe { camera::esp_camera_init(&config) })
            .map_err(|e| InitFault::SensorInit(e.code()))?;

        apply_tuning(&settings.tuning)?;

        let (width, height) = settings.frame_size.dimensions();
        log::info!(
            "Camera ready: {}x{} JPEG q{} buffers={} in {:?} grab={:?}",
            width,
            height,
            settings.jpeg_quality,
            settings.frame_buffers,
            settings.location,
            settings.grab_mode
        );

        Ok(Self { settings })
    }

    pub fn settings(&self) -> &SensorSettings {
        &self.settings
    }
}

impl FrameSource for Camera {
    type Frame = CameraFrame;

    fn acquire_frame(&mut self) -> Option<CameraFrame> {
        let fb = NonNull::new(unsafe { camera::esp_camera_fb_get() })?;
        Some(CameraFrame { fb })
    }

    fn release_frame(&mut self, frame: CameraFrame) {
        unsafe { camera::esp_camera_fb_return(frame.fb.as_ptr()) }
    }
}

fn camera_config(settings: &SensorSettings) -> camera::camera_config_t {
    let [d0, d1, d2, d3, d4, d5, d6, d7] = CAM_PIN_DATA;

    camera::camera_config_t {
        pin_pwdn: CAM_PIN_PWDN,
        pin_reset: CAM_PIN_RESET,
        pin_xclk: CAM_PIN_XCLK,
        __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 {
            pin_sccb_sda: CAM_PIN_SIOD,
        },
        __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 {
            pin_sccb_scl: CAM_PIN_SIOC,
        },
        pin_d7: d7,
        pin_d6: d6,
        pin_d5: d5,
        pin_d4: d4,
        pin_d3: d3,
        pin_d2: d2,
        pin_d1: d1,
        pin_d0: d0,
        pin_vsync: CAM_PIN_VSYNC,
        pin_href: CAM_PIN_HREF,
        pin_pclk: CAM_PIN_PCLK,
        xclk_freq_hz: CAM_XCLK_FREQ_HZ,
        ledc_timer: sys::ledc_timer_t_LEDC_TIMER_0,
        ledc_channel: sys::ledc_channel_t_LEDC_CHANNEL_0,
        pixel_format: camera::pixformat_t_PIXFORMAT_JPEG,
        frame_size: frame_size(settings.frame_size),
        jpeg_quality: c_int::from(settings.jpeg_quality),
        fb_count: usize::from(settings.frame_buffers),
        fb_location: match settings.location {
            FrameLocation::Psram => camera::camera_fb_location_t_CAMERA_FB_IN_PSRAM,
            FrameLocation::Dram => camera::camera_fb_location_t_CAMERA_FB_IN_DRAM,
        },
        grab_mode: match settings.grab_mode {
            GrabMode::WhenEmpty => camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY,
            GrabMode::Latest => camera::camera_grab_mode_t_CAMERA_GRAB_LATEST,
        },
        ..Default::default()
    }
}

fn frame_size(size: FrameSize) -> camera::framesize_t {
    match size {
        FrameSize::Qvga => camera::framesize_t_FRAMESIZE_QVGA,
        FrameSize::Vga => camera::framesize_t_FRAMESIZE_VGA,
        FrameSize::Svga => camera::framesize_t_FRAMESIZE_SVGA,
        FrameSize::Xga => camera::framesize_t_FRAMESIZE_XGA,
        FrameSize::Sxga => camera::framesize_t_FRAMESIZE_SXGA,
        FrameSize::Uxga => camera::framesize_t_FRAMESIZE_UXGA,
    }
}

type Setter = Option<unsafe extern "C" fn(*mut camera::sensor_t, c_int) -> c_int>;

fn apply_tuning(tuning: &SensorTuning) -> Result<(), InitFault> {
    let sensor = unsafe { camera::esp_camera_sensor_get() };
    if sensor.is_null() {
        return Err(InitFault::SensorTuning);
    }

    let s = unsafe { &*sensor };
    let steps: [(&str, Setter, c_int); 5] = [
        ("vflip", s.set_vflip, c_int::from(tuning.vflip)),
        ("brightness", s.set_brightness, c_int::from(tuning.brightness)),
        ("saturation", s.set_saturation, c_int::from(tuning.saturation)),
        ("whitebal", s.set_whitebal, c_int::from(tuning.white_balance)),
        ("gain_ctrl", s.set_gain_ctrl, c_int::from(tuning.auto_gain)),
    ];

    for (name, setter, value) in steps {
        let Some(set) = setter else {
            log::warn!("Sensor has no {} control", name);
            continue;
        };
        let res = unsafe { set(sensor, value) };
        if res != 0 {
            log::warn!("Sensor {}={} rejected: {}", name, value, res);
        }
    }

    Ok(())
}
