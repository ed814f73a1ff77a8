use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let sdkconfig_defaults = PathBuf::from(&manifest_dir).join("sdkconfig.defaults");

    println!("cargo:rerun-if-changed=sdkconfig.defaults");
    println!("cargo:rerun-if-changed=bindings.h");

    // esp-idf-sys caches the generated sdkconfig; a newer defaults file would
    // otherwise be ignored (PSRAM and watchdog settings matter here).
    let target_dir = PathBuf::from(&manifest_dir).join("target");
    if let Ok(entries) = fs::read_dir(&target_dir) {
        for build_dir in entries.flatten().map(|e| e.path().join("build")) {
            let Ok(build_entries) = fs::read_dir(&build_dir) else {
                continue;
            };
            for build_path in build_entries.flatten().map(|e| e.path()) {
                if !build_path.to_string_lossy().contains("esp-idf-sys") {
                    continue;
                }
                invalidate_if_stale(&build_path, &sdkconfig_defaults);
            }
        }
    }

    embuild::espidf::sysenv::output();
}

fn invalidate_if_stale(build_path: &Path, sdkconfig_defaults: &Path) {
    let sdkconfig = build_path.join("out/esp-idf/sdkconfig");
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();

    if let (Some(sdk_time), Some(defaults_time)) =
        (modified(&sdkconfig), modified(sdkconfig_defaults))
    {
        if defaults_time > sdk_time {
            eprintln!("sdkconfig.defaults changed! Forcing regeneration...");
            let _ = fs::remove_file(&sdkconfig);
            let _ = fs::remove_dir_all(build_path.join("out/esp-idf/sdkconfig.d"));
        }
    }
}
