mod board;
mod camera;
mod runtime_diagnostics;
mod sdcard;

use esp_idf_svc::hal::{
    delay::FreeRtos,
    gpio::{Gpio13, Gpio33, Input, Output, PinDriver, Pull},
    peripherals::Peripherals,
};

use shutterbox_core::{
    startup, ActiveLowLed, Builder, CaptureConfig, CaptureSequencer, InitFault, NoIndicator,
    NoWatchdog, PollLoop, SensorSettings,
};

use camera::Camera;
use runtime_diagnostics::{log_heap, psram_available, EspClock, TaskWatchdog};
use sdcard::SdCardStorage;

type StatusLed = Option<ActiveLowLed<PinDriver<'static, Gpio33, Output>>>;
type ShutterButton = PinDriver<'static, Gpio13, Input>;

struct Hardware {
    button: ShutterButton,
    storage: SdCardStorage,
    camera: Camera,
}

fn bring_up(config: &CaptureConfig, button_pin: Gpio13) -> Result<Hardware, InitFault> {
    let mut button =
        PinDriver::input(button_pin).map_err(|e| InitFault::Peripheral(e.code()))?;
    button
        .set_pull(Pull::Up)
        .map_err(|e| InitFault::Peripheral(e.code()))?;

    let mut storage = SdCardStorage::mount()?;
    startup::prepare_storage(&mut storage, config)?;
    log_heap("sd_mounted");

    let psram = psram_available();
    log::info!("PSRAM {}", if psram { "found" } else { "not found" });
    let camera = Camera::init(SensorSettings::for_memory(psram))?;
    log_heap("camera_ready");

    Ok(Hardware {
        button,
        storage,
        camera,
    })
}

fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("shutterbox {}", env!("CARGO_PKG_VERSION"));
    log_heap("startup");

    // No LED or watchdog yet; halt with the log line alone
    let peripherals = match Peripherals::take() {
        Ok(p) => p,
        Err(e) => startup::halt(
            &InitFault::Peripheral(e.code()),
            NoIndicator,
            FreeRtos,
            NoWatchdog,
        ),
    };

    // Red LED on the back of the board, active low
    let led: StatusLed = match PinDriver::output(peripherals.pins.gpio33) {
        Ok(pin) => Some(ActiveLowLed::new(pin)),
        Err(e) => {
            log::warn!("Status LED unavailable: {:?}", e);
            None
        }
    };

    let watchdog = match TaskWatchdog::subscribe() {
        Ok(wdt) => Some(wdt),
        Err(e) => {
            log::warn!("{}; running without task watchdog", e);
            None
        }
    };

    let config = match Builder::new().build() {
        Ok(config) => config,
        Err(e) => startup::halt(&InitFault::from(e), led, FreeRtos, watchdog),
    };

    let hardware = match bring_up(&config, peripherals.pins.gpio13) {
        Ok(hw) => hw,
        Err(fault) => startup::halt(&fault, led, FreeRtos, watchdog),
    };

    log::info!(
        "Capturing {:?} frames into {}",
        hardware.camera.settings().frame_size,
        config.capture_dir
    );
    let sequencer = CaptureSequencer::new(
        &config,
        hardware.camera,
        hardware.storage,
        led,
        EspClock,
    );
    let mut poll_loop = PollLoop::new(
        &config,
        hardware.button,
        sequencer,
        EspClock,
        FreeRtos,
        watchdog,
    );

    log::info!("Ready: press the shutter button to capture");
    poll_loop.run()
}
