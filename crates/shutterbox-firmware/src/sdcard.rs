use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::ptr;

use esp_idf_svc::sys;
use shutterbox_core::{InitFault, OpenMode, Storage, StorageError};

use crate::board::{SD_MAX_FILES, SD_MOUNT_POINT};

/// Open capture file
pub struct SdFile {
    file: File,
    path: String,
}

/// FAT volume on the SD/MMC slot, accessed through the VFS
pub struct SdCardStorage {
    base_path: String,
}

impl SdCardStorage {
    /// Mount the card in 1-bit SD/MMC mode
    pub fn mount() -> Result<Self, InitFault> {
        let base_path = SD_MOUNT_POINT.to_string();
        let c_base =
            std::ffi::CString::new(base_path.clone()).map_err(|_| InitFault::StorageMount(-1))?;

        let host = build_sdmmc_host();
        let mut slot_config = sys::sdmmc_slot_config_t::default();
        slot_config.__bindgen_anon_1.gpio_cd = -1;
        slot_config.__bindgen_anon_2.gpio_wp = -1;
        slot_config.width = 1;
        slot_config.flags = 0;

        let mount_config = sys::esp_vfs_fat_mount_config_t {
            format_if_mount_failed: false,
            max_files: SD_MAX_FILES,
            allocation_unit_size: 0,
            disk_status_check_enable: false,
            use_one_fat: false,
        };

        let mut card: *mut sys::sdmmc_card_t = ptr::null_mut();
        let res = unsafe {
            sys::esp_vfs_fat_sdmmc_mount(
                c_base.as_ptr(),
                &host,
                &slot_config as *const _ as *const core::ffi::c_void,
                &mount_config,
                &mut card,
            )
        };

        if res != sys::ESP_OK {
            return Err(InitFault::StorageMount(res));
        }

        if !card.is_null() {
            let capacity_mb = unsafe {
                let csd = (*card).csd;
                (csd.capacity as u64) * (csd.sector_size as u64) / (1024 * 1024)
            };
            log::info!("SD card mounted at {} ({} MB)", base_path, capacity_mb);
        } else {
            log::info!("SD card mounted at {}", base_path);
        }

        Ok(Self { base_path })
    }

    fn host_path(&self, path: &str) -> String {
        if path == "/" {
            self.base_path.clone()
        } else {
            format!("{}/{}", self.base_path, path.trim_start_matches('/'))
        }
    }
}

fn to_storage_error(err: io::Error) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        io::ErrorKind::AlreadyExists => StorageError::AlreadyExists,
        _ => StorageError::Io(format!("{:?}", err)),
    }
}

impl Storage for SdCardStorage {
    type Handle = SdFile;

    fn count_entries(&mut self, dir: &str) -> Result<usize, StorageError> {
        let read_dir = fs::read_dir(self.host_path(dir)).map_err(to_storage_error)?;
        let mut count = 0;
        for entry in read_dir {
            entry.map_err(to_storage_error)?;
            count += 1;
        }
        Ok(count)
    }

    fn ensure_dir(&mut self, dir: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.host_path(dir)).map_err(to_storage_error)
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<SdFile, StorageError> {
        let host_path = self.host_path(path);
        let mut options = OpenOptions::new();
        options.write(true);
        match mode {
            OpenMode::CreateNew => options.create_new(true),
            OpenMode::Truncate => options.create(true).truncate(true),
        };
        let file = options.open(&host_path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists,
            _ => StorageError::Open(format!("{:?}", e)),
        })?;
        Ok(SdFile {
            file,
            path: host_path,
        })
    }

    fn write(&mut self, handle: &mut SdFile, data: &[u8]) -> Result<(), StorageError> {
        handle
            .file
            .write_all(data)
            .map_err(|e| StorageError::Write(format!("{}: {:?}", handle.path, e)))
    }

    fn flush(&mut self, handle: &mut SdFile) -> Result<(), StorageError> {
        handle
            .file
            .flush()
            .and_then(|()| handle.file.sync_all())
            .map_err(|e| StorageError::Flush(format!("{}: {:?}", handle.path, e)))
    }

    fn close(&mut self, handle: SdFile) {
        log::debug!("Closing {}", handle.path);
        drop(handle.file);
    }
}

fn build_sdmmc_host() -> sys::sdmmc_host_t {
    const SDMMC_HOST_FLAG_1BIT: u32 = 1 << 0;
    const SDMMC_HOST_FLAG_4BIT: u32 = 1 << 1;
    const SDMMC_HOST_FLAG_8BIT: u32 = 1 << 2;
    const SDMMC_HOST_FLAG_DDR: u32 = 1 << 4;
    const SDMMC_HOST_SLOT_1: i32 = 1;
    const SDMMC_FREQ_DEFAULT: i32 = 20_000;

    sys::sdmmc_host_t {
        flags: SDMMC_HOST_FLAG_1BIT
            | SDMMC_HOST_FLAG_4BIT
            | SDMMC_HOST_FLAG_8BIT
            | SDMMC_HOST_FLAG_DDR,
        slot: SDMMC_HOST_SLOT_1,
        max_freq_khz: SDMMC_FREQ_DEFAULT,
        io_voltage: 3.3,
        init: Some(sys::sdmmc_host_init),
        set_bus_width: Some(sys::sdmmc_host_set_bus_width),
        get_bus_width: Some(sys::sdmmc_host_get_slot_width),
        set_bus_ddr_mode: Some(sys::sdmmc_host_set_bus_ddr_mode),
        set_card_clk: Some(sys::sdmmc_host_set_card_clk),
        set_cclk_always_on: Some(sys::sdmmc_host_set_cclk_always_on),
        do_transaction: Some(sys::sdmmc_host_do_transaction),
        __bindgen_anon_1: sys::sdmmc_host_t__bindgen_ty_1 {
            deinit: Some(sys::sdmmc_host_deinit),
        },
        io_int_enable: Some(sys::sdmmc_host_io_int_enable),
        io_int_wait: Some(sys::sdmmc_host_io_int_wait),
        command_timeout_ms: 0,
        get_real_freq: Some(sys::sdmmc_host_get_real_freq),
        input_delay_phase: sys::sdmmc_delay_phase_t_SDMMC_DELAY_PHASE_0,
        set_input_delay: Some(sys::sdmmc_host_set_input_delay),
        dma_aligned_buffer: ptr::null_mut(),
        pwr_ctrl_handle: ptr::null_mut(),
        get_dma_info: None,
    }
}
