use captive_setup::{CredentialStore, FsStorage, ModeController, PortalConfig};

#[cfg(target_os = "espidf")]
const STORAGE_BASE: &std::ffi::CStr = c"/spiffs";

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use captive_setup::{hal, network::esp::EspRadio};
    use esp_idf_svc::eventloop::EspSystemEventLoop;

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    let peripherals = esp_idf_svc::hal::prelude::Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let _fs = esp_idf_svc::io::vfs::MountedEventfs::mount(5)?;
    let partition = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;

    let config = PortalConfig::default();
    log::info!("AP SSID: {:?}", config.ap_ssid);

    // without storage there is nothing to provision into
    hal::mount_storage(STORAGE_BASE)?;
    let storage = FsStorage::open(STORAGE_BASE.to_str()?);
    let store = CredentialStore::new(storage, &config.credentials_file);

    let led = captive_setup::status_led!(peripherals)?;
    let radio = EspRadio::new(peripherals.modem, sysloop, partition, config.ap_ip)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut controller = ModeController::new(config, radio, led, store, hal::EspRestart);
    rt.block_on(async move {
        let phase = controller.start().await;
        log::info!("Startup finished: {:?}", phase);
        controller.run().await;
    });

    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use captive_setup::{boards::LogIndicator, hal::ProcessRestart, network::SimRadio};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PortalConfig::from_env();
    let data_dir = std::env::var("PORTAL_DATA_DIR").unwrap_or_else(|_| "portal-data".to_string());
    let storage = FsStorage::mount(&data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to mount storage at {}: {}", data_dir, e))?;
    let store = CredentialStore::new(storage, &config.credentials_file);

    let radio = SimRadio::from_env(config.ap_ip);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut controller =
        ModeController::new(config, radio, LogIndicator::new(), store, ProcessRestart);
    rt.block_on(async move {
        let phase = controller.start().await;
        log::info!("Startup finished: {:?}", phase);
        if let Some(addr) = controller.http_addr() {
            log::info!("Portal: http://{}", addr);
        }
        controller.run().await;
    });

    Ok(())
}
