//! ESP-IDF WiFi driver behind the [`Radio`] seam.

use std::net::Ipv4Addr;

use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    ipv4::{self, Mask, Subnet},
    netif::{EspNetif, NetifConfiguration, NetifStack},
    nvs::EspDefaultNvsPartition,
    wifi::{
        AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration,
        Configuration as WifiConfig, EspWifi, WifiDriver,
    },
};

use super::{ConnectionStatus, Radio};

const AP_NETMASK: Mask = Mask(24);

pub struct EspRadio {
    wifi: BlockingWifi<EspWifi<'static>>,
    ap_config: Option<AccessPointConfiguration>,
}

impl EspRadio {
    /// 创建 WiFi 驱动，AP 网络接口固定使用 `ap_ip`，DHCP 下发的 DNS 也指向它
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        ap_ip: Ipv4Addr,
    ) -> anyhow::Result<Self> {
        let ap_ip = ipv4::Ipv4Addr::from(ap_ip.octets());
        let ap_netif_config = NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Router(ipv4::RouterConfiguration {
                subnet: Subnet {
                    gateway: ap_ip,
                    mask: AP_NETMASK,
                },
                dhcp_enabled: true,
                dns: Some(ap_ip),
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        };

        let ap_netif = EspNetif::new_with_conf(&ap_netif_config)?;
        let driver = WifiDriver::new(modem, sysloop.clone(), Some(nvs))?;
        let sta_netif = EspNetif::new(NetifStack::Sta)?;

        let wifi = BlockingWifi::wrap(EspWifi::wrap_all(driver, sta_netif, ap_netif)?, sysloop)?;

        Ok(Self {
            wifi,
            ap_config: None,
        })
    }

    fn auth_method(pass: &str) -> AuthMethod {
        if pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        }
    }
}

impl Radio for EspRadio {
    fn associate(&mut self, ssid: &str, pass: &str) -> anyhow::Result<()> {
        let client = ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("SSID too long: {}", ssid))?,
            password: pass
                .try_into()
                .map_err(|_| anyhow::anyhow!("Password too long"))?,
            auth_method: Self::auth_method(pass),
            ..Default::default()
        };

        self.ap_config = None;
        self.wifi.set_configuration(&WifiConfig::Client(client))?;
        self.wifi.start()?;
        // non-blocking, completion is observed through `status`
        self.wifi.wifi_mut().connect()?;
        Ok(())
    }

    fn status(&mut self) -> ConnectionStatus {
        let wifi = self.wifi.wifi();
        match (wifi.is_connected(), wifi.sta_netif().is_up()) {
            (Ok(true), Ok(true)) => ConnectionStatus::Connected,
            (Ok(true), _) => ConnectionStatus::Connecting,
            _ => ConnectionStatus::Disconnected,
        }
    }

    fn local_address(&mut self) -> Option<Ipv4Addr> {
        let netif = if self.ap_config.is_some() {
            self.wifi.wifi().ap_netif()
        } else {
            self.wifi.wifi().sta_netif()
        };
        netif
            .get_ip_info()
            .ok()
            .map(|info| Ipv4Addr::from(info.ip.octets()))
    }

    fn begin_access_point(&mut self, ssid: &str, pass: &str) -> anyhow::Result<()> {
        let ap_config = AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("AP SSID too long: {}", ssid))?,
            password: pass
                .try_into()
                .map_err(|_| anyhow::anyhow!("AP password too long"))?,
            ssid_hidden: false,
            channel: 1,
            auth_method: Self::auth_method(pass),
            max_connections: 4,
            ..Default::default()
        };

        // AP + STA, so scanning keeps working while the portal is up
        self.wifi.set_configuration(&WifiConfig::Mixed(
            ClientConfiguration::default(),
            ap_config.clone(),
        ))?;
        self.wifi.start()?;
        self.ap_config = Some(ap_config);
        Ok(())
    }

    fn scan(&mut self) -> anyhow::Result<Vec<String>> {
        let found = self.wifi.scan()?;
        Ok(found.into_iter().map(|ap| ap.ssid.to_string()).collect())
    }

    fn end(&mut self) {
        if let Err(e) = self.wifi.wifi_mut().disconnect() {
            log::debug!("disconnect: {:?}", e);
        }
        if let Err(e) = self.wifi.stop() {
            log::warn!("Failed to stop wifi: {:?}", e);
        }
        self.ap_config = None;
    }
}
