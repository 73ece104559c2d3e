//! Startup sequence and the idle loop.
//!
//! The controller tries the saved network first and falls back to broadcasting
//! its own access point. From then on a single cooperative loop refreshes the
//! status LED, answers at most one DNS query (access point only), rescans
//! periodically and serves at most one HTTP connection per tick.

use std::net::SocketAddr;

use tokio::time::{sleep, Instant};

use crate::boards::{Color, StatusIndicator};
use crate::captive_portal::{DnsResponder, Exchange, HttpServer, Portal};
use crate::config::PortalConfig;
use crate::credentials::{CredentialStore, Storage};
use crate::hal::Restart;
use crate::network::{ConnectionStatus, Radio, VisibleNetworks};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    Client,
    AccessPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    ConnectingClient,
    ClientActive,
    AccessPointActive,
    /// The access point failed to start: no DNS or HTTP service.
    Degraded,
}

pub struct ModeController<R, L, S, X> {
    config: PortalConfig,
    radio: R,
    indicator: L,
    store: CredentialStore<S>,
    restarter: X,

    phase: Phase,
    networks: VisibleNetworks,
    last_scan: Option<Instant>,
    dns: Option<DnsResponder>,
    http: Option<HttpServer>,
}

impl<R, L, S, X> ModeController<R, L, S, X>
where
    R: Radio,
    L: StatusIndicator,
    S: Storage,
    X: Restart,
{
    pub fn new(
        config: PortalConfig,
        radio: R,
        indicator: L,
        store: CredentialStore<S>,
        restarter: X,
    ) -> Self {
        Self {
            config,
            radio,
            indicator,
            store,
            restarter,
            phase: Phase::Initializing,
            networks: VisibleNetworks::new(),
            last_scan: None,
            dns: None,
            http: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> NetworkMode {
        if self.phase == Phase::AccessPointActive {
            NetworkMode::AccessPoint
        } else {
            NetworkMode::Client
        }
    }

    pub fn networks(&self) -> &VisibleNetworks {
        &self.networks
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn indicator(&self) -> &L {
        &self.indicator
    }

    pub fn store(&self) -> &CredentialStore<S> {
        &self.store
    }

    pub fn restarter(&self) -> &X {
        &self.restarter
    }

    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn dns_addr(&self) -> Option<SocketAddr> {
        self.dns.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Brings the device to either client or access point mode.
    pub async fn start(&mut self) -> Phase {
        self.indicator.self_test();

        self.phase = Phase::ConnectingClient;
        if self.connect_client().await {
            self.phase = Phase::ClientActive;
            log::info!("Connected to WiFi. IP: {:?}", self.radio.local_address());
            if let Err(e) = self.start_http().await {
                log::error!("Failed to start HTTP server: {:?}", e);
            }
        } else {
            log::info!("Failed to connect WiFi. Starting AP mode...");
            if let Err(e) = self.start_access_point().await {
                log::error!("Failed to start access point: {:?}", e);
                self.phase = Phase::Degraded;
            }
        }

        self.phase
    }

    async fn connect_client(&mut self) -> bool {
        let creds = match self.store.load() {
            Ok(creds) => creds,
            Err(e) => {
                log::info!("No usable credentials: {}", e);
                return false;
            }
        };

        self.radio.end();
        sleep(self.config.radio_settle).await;

        log::info!("Connecting to '{}'...", creds.ssid());
        if let Err(e) = self.radio.associate(creds.ssid(), creds.pass()) {
            log::warn!("Association request failed: {:?}", e);
            return false;
        }

        let deadline = Instant::now() + self.config.association_timeout;
        while self.radio.status() != ConnectionStatus::Connected {
            if Instant::now() >= deadline {
                log::warn!(
                    "'{}' not reachable after {:?}",
                    creds.ssid(),
                    self.config.association_timeout
                );
                return false;
            }
            sleep(self.config.association_poll).await;
        }

        true
    }

    /// Starts the access point with its DNS and HTTP listeners. Calling it
    /// while the access point is already up does nothing.
    pub async fn start_access_point(&mut self) -> anyhow::Result<()> {
        if self.phase == Phase::AccessPointActive {
            log::debug!("Access point already active");
            return Ok(());
        }

        self.radio.end();
        sleep(self.config.radio_settle).await;
        self.radio
            .begin_access_point(&self.config.ap_ssid, &self.config.ap_pass)?;

        let dns_addr = SocketAddr::from((self.config.bind_ip, self.config.dns_port));
        self.dns = Some(DnsResponder::bind(dns_addr, self.config.ap_ip).await?);
        self.start_http().await?;

        self.phase = Phase::AccessPointActive;
        log::info!(
            "Access point '{}' active, portal at http://{}",
            self.config.ap_ssid,
            self.config.ap_ip
        );
        Ok(())
    }

    async fn start_http(&mut self) -> anyhow::Result<()> {
        if self.http.is_none() {
            let addr = SocketAddr::from((self.config.bind_ip, self.config.http_port));
            self.http = Some(HttpServer::bind(addr).await?);
        }
        Ok(())
    }

    /// One pass of the idle loop.
    pub async fn tick(&mut self) {
        self.update_indicator();

        if self.mode() == NetworkMode::AccessPoint {
            if let Some(dns) = self.dns.as_mut() {
                dns.serve_pending();
            }
        }

        self.refresh_networks();
        self.serve_http().await;
    }

    pub async fn run(&mut self) {
        loop {
            self.tick().await;
            sleep(self.config.tick).await;
        }
    }

    fn update_indicator(&mut self) {
        let color = match self.phase {
            Phase::AccessPointActive => Color::Red,
            _ if self.radio.status() == ConnectionStatus::Connected => Color::Cyan,
            _ => Color::Off,
        };
        self.indicator.set_color(color);
    }

    fn refresh_networks(&mut self) {
        let due = self
            .last_scan
            .map_or(true, |at| at.elapsed() >= self.config.scan_interval);
        if !due {
            return;
        }

        match self.radio.scan() {
            Ok(names) => {
                self.networks.replace(&names);
                log::info!("Scan found {} networks", names.len());
            }
            Err(e) => log::warn!("WiFi scan failed: {:?}", e),
        }
        self.last_scan = Some(Instant::now());
    }

    async fn serve_http(&mut self) {
        let Some(http) = self.http.as_ref() else {
            return;
        };

        let mut portal = Portal {
            indicator: &mut self.indicator,
            store: &mut self.store,
            networks: &self.networks,
        };

        if http.serve_pending(&mut portal, &self.config).await == Exchange::Restart {
            log::info!("Credentials saved. Rebooting...");
            sleep(self.config.restart_delay).await;
            self.restarter.restart();
        }
    }
}
