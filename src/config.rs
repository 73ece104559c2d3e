//! Portal configuration.
//!
//! Every constant the provisioning flow relies on lives here. Defaults match the
//! device firmware; `AP_SSID` / `AP_PASS` can be baked in at compile time, and the
//! host build can override most fields through `PORTAL_*` environment variables.

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

static DEFAULT_AP_SSID: Option<&str> = std::option_env!("AP_SSID");
static DEFAULT_AP_PASS: Option<&str> = std::option_env!("AP_PASS");

/// AP 模式的固定 IP 地址
pub const AP_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Name of the network broadcast while provisioning.
    pub ap_ssid: String,
    /// Passphrase of the provisioning network. Empty means an open AP.
    pub ap_pass: String,
    /// Address every hijacked DNS answer resolves to.
    pub ap_ip: Ipv4Addr,
    /// Local address the DNS and HTTP listeners bind to.
    pub bind_ip: Ipv4Addr,
    pub http_port: u16,
    pub dns_port: u16,
    /// Credential file name, relative to the mounted storage root.
    pub credentials_file: String,

    pub association_timeout: Duration,
    pub association_poll: Duration,
    /// Pause after shutting the radio down before reconfiguring it.
    pub radio_settle: Duration,
    pub scan_interval: Duration,

    /// Absolute read budget for one HTTP connection.
    pub http_read_timeout: Duration,
    /// Once the header separator arrived, stop reading after this much silence.
    pub http_idle_gap: Duration,
    /// Serve the setup page to a client that connected but sent nothing.
    pub render_on_empty_request: bool,

    pub restart_delay: Duration,
    /// Idle loop period.
    pub tick: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            ap_ssid: DEFAULT_AP_SSID.unwrap_or("Portenta-Setup").to_string(),
            ap_pass: DEFAULT_AP_PASS.unwrap_or("12345678").to_string(),
            ap_ip: AP_IP,
            bind_ip: Ipv4Addr::UNSPECIFIED,
            http_port: 80,
            dns_port: 53,
            credentials_file: "wifi.json".to_string(),
            association_timeout: Duration::from_secs(20),
            association_poll: Duration::from_millis(300),
            radio_settle: Duration::from_millis(150),
            scan_interval: Duration::from_secs(10),
            http_read_timeout: Duration::from_secs(5),
            http_idle_gap: Duration::from_millis(200),
            render_on_empty_request: true,
            restart_delay: Duration::from_millis(500),
            tick: Duration::from_millis(10),
        }
    }
}

impl PortalConfig {
    /// Defaults overridden by `PORTAL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ssid) = lookup("PORTAL_AP_SSID") {
            config.ap_ssid = ssid;
        }
        if let Some(pass) = lookup("PORTAL_AP_PASS") {
            config.ap_pass = pass;
        }
        if let Some(file) = lookup("PORTAL_CREDENTIALS_FILE") {
            config.credentials_file = file;
        }

        override_parsed(&lookup, "PORTAL_AP_IP", &mut config.ap_ip);
        override_parsed(&lookup, "PORTAL_BIND_IP", &mut config.bind_ip);
        override_parsed(&lookup, "PORTAL_HTTP_PORT", &mut config.http_port);
        override_parsed(&lookup, "PORTAL_DNS_PORT", &mut config.dns_port);
        override_parsed(
            &lookup,
            "PORTAL_RENDER_ON_EMPTY_REQUEST",
            &mut config.render_on_empty_request,
        );

        override_millis(&lookup, "PORTAL_ASSOCIATION_TIMEOUT_MS", &mut config.association_timeout);
        override_millis(&lookup, "PORTAL_SCAN_INTERVAL_MS", &mut config.scan_interval);
        override_millis(&lookup, "PORTAL_HTTP_READ_TIMEOUT_MS", &mut config.http_read_timeout);
        override_millis(&lookup, "PORTAL_HTTP_IDLE_GAP_MS", &mut config.http_idle_gap);
        override_millis(&lookup, "PORTAL_RESTART_DELAY_MS", &mut config.restart_delay);

        config
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => log::warn!("Ignoring invalid {}={:?}, keeping default", key, raw),
    }
}

fn override_millis<F>(lookup: &F, key: &str, slot: &mut Duration)
where
    F: Fn(&str) -> Option<String>,
{
    let mut millis = slot.as_millis() as u64;
    override_parsed(lookup, key, &mut millis);
    *slot = Duration::from_millis(millis);
}
