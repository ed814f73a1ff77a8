use esp_idf_svc::sys;
use shutterbox_core::{InitFault, MonotonicClock, Watchdog};

/// Log heap usage statistics and current task stack headroom.
pub fn log_heap(label: &str) {
    let free_heap = unsafe { sys::esp_get_free_heap_size() };
    let min_free = unsafe { sys::esp_get_minimum_free_heap_size() };
    let free_psram = unsafe { sys::heap_caps_get_free_size(sys::MALLOC_CAP_SPIRAM) };
    let stack_hwm_words = unsafe { sys::uxTaskGetStackHighWaterMark(core::ptr::null_mut()) };
    let stack_hwm_bytes = (stack_hwm_words as usize) * core::mem::size_of::<sys::StackType_t>();
    log::info!(
        "[MEM] {}: free={} min_free={} free_psram={} stack_hwm={}B",
        label,
        free_heap,
        min_free,
        free_psram,
        stack_hwm_bytes
    );
}

/// Whether external PSRAM was found and added to the heap
pub fn psram_available() -> bool {
    unsafe { sys::heap_caps_get_total_size(sys::MALLOC_CAP_SPIRAM) > 0 }
}

/// `esp_timer` based millisecond clock
#[derive(Debug, Clone, Copy)]
pub struct EspClock;

impl MonotonicClock for EspClock {
    fn now_ms(&self) -> u64 {
        (unsafe { sys::esp_timer_get_time() } / 1_000) as u64
    }
}

/// Subscription of the main task to the task watchdog
pub struct TaskWatchdog {
    _subscribed: (),
}

impl TaskWatchdog {
    /// Subscribe the calling task
    pub fn subscribe() -> Result<Self, InitFault> {
        let res = unsafe { sys::esp_task_wdt_add(core::ptr::null_mut()) };
        if res != sys::ESP_OK {
            return Err(InitFault::Peripheral(res));
        }
        Ok(Self { _subscribed: () })
    }
}

impl Watchdog for TaskWatchdog {
    fn feed(&mut self) {
        unsafe {
            sys::esp_task_wdt_reset();
        }
    }
}
