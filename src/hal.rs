//! Restart primitive and storage mount.

/// Unconditional device reset.
pub trait Restart {
    /// On hardware this never returns.
    fn restart(&mut self);
}

#[cfg(target_os = "espidf")]
pub struct EspRestart;

#[cfg(target_os = "espidf")]
impl Restart for EspRestart {
    fn restart(&mut self) {
        log::info!("Restarting...");
        unsafe { esp_idf_svc::sys::esp_restart() }
    }
}

/// Host stand-in: restarting ends the process, the supervisor starts it again.
#[cfg(not(target_os = "espidf"))]
pub struct ProcessRestart;

#[cfg(not(target_os = "espidf"))]
impl Restart for ProcessRestart {
    fn restart(&mut self) {
        log::info!("Restart requested, exiting");
        std::process::exit(0)
    }
}

/// Mounts the SPIFFS data partition at `base_path`, formatting it when the
/// mount fails. An error here means nothing can be persisted.
#[cfg(target_os = "espidf")]
pub fn mount_storage(base_path: &'static std::ffi::CStr) -> anyhow::Result<()> {
    use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

    let conf = esp_vfs_spiffs_conf_t {
        base_path: base_path.as_ptr(),
        partition_label: std::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };

    esp!(unsafe { esp_vfs_spiffs_register(&conf) })
        .map_err(|e| anyhow::anyhow!("Failed to mount storage: {:?}", e))?;

    log::info!("SPIFFS mounted at {:?}", base_path);
    Ok(())
}
