//! A radio that only exists in memory, for running the portal off-device.

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use super::{ConnectionStatus, Radio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimState {
    Off,
    Station,
    AccessPoint,
}

#[derive(Debug, Clone)]
pub struct SimRadio {
    visible: Vec<String>,
    /// Scan results that replace `visible` one per scan, after the first.
    upcoming: VecDeque<Vec<String>>,
    joinable: Vec<(String, String)>,
    ap_ip: Ipv4Addr,
    station_ip: Ipv4Addr,
    fail_access_point: bool,

    state: SimState,
    associated: bool,
    ap_starts: usize,
    associations: usize,
    scans: usize,
}

impl SimRadio {
    pub fn new(ap_ip: Ipv4Addr) -> Self {
        Self {
            visible: Vec::new(),
            upcoming: VecDeque::new(),
            joinable: Vec::new(),
            ap_ip,
            station_ip: Ipv4Addr::new(192, 168, 1, 50),
            fail_access_point: false,
            state: SimState::Off,
            associated: false,
            ap_starts: 0,
            associations: 0,
            scans: 0,
        }
    }

    /// Builds the radio from `PORTAL_SIM_NETWORKS` (comma separated names) and
    /// `PORTAL_SIM_JOINABLE` (comma separated `name:secret` pairs).
    pub fn from_env(ap_ip: Ipv4Addr) -> Self {
        let mut radio = Self::new(ap_ip);
        if let Ok(raw) = std::env::var("PORTAL_SIM_NETWORKS") {
            radio.visible = split_list(&raw).map(str::to_string).collect();
        }
        if let Ok(raw) = std::env::var("PORTAL_SIM_JOINABLE") {
            radio.joinable = split_list(&raw)
                .map(|pair| match pair.split_once(':') {
                    Some((name, secret)) => (name.to_string(), secret.to_string()),
                    None => (pair.to_string(), String::new()),
                })
                .collect();
        }
        radio
    }

    pub fn with_visible<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.visible = names.into_iter().map(Into::into).collect();
        self
    }

    /// What a later scan reports; calls queue up one result per scan.
    pub fn then_visible<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.upcoming
            .push_back(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_joinable(mut self, ssid: &str, pass: &str) -> Self {
        self.joinable.push((ssid.to_string(), pass.to_string()));
        self
    }

    pub fn with_failing_access_point(mut self) -> Self {
        self.fail_access_point = true;
        self
    }

    /// How many times an access point was brought up.
    pub fn ap_starts(&self) -> usize {
        self.ap_starts
    }

    pub fn associations(&self) -> usize {
        self.associations
    }

    pub fn scans(&self) -> usize {
        self.scans
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl Radio for SimRadio {
    fn associate(&mut self, ssid: &str, pass: &str) -> anyhow::Result<()> {
        self.state = SimState::Station;
        self.associations += 1;
        self.associated = self
            .joinable
            .iter()
            .any(|(name, secret)| name == ssid && secret == pass);
        log::info!("[sim] associate '{}' -> {}", ssid, self.associated);
        Ok(())
    }

    fn status(&mut self) -> ConnectionStatus {
        match (self.state, self.associated) {
            (SimState::Station, true) => ConnectionStatus::Connected,
            (SimState::Station, false) => ConnectionStatus::Connecting,
            _ => ConnectionStatus::Disconnected,
        }
    }

    fn local_address(&mut self) -> Option<Ipv4Addr> {
        match self.state {
            SimState::Station if self.associated => Some(self.station_ip),
            SimState::AccessPoint => Some(self.ap_ip),
            _ => None,
        }
    }

    fn begin_access_point(&mut self, ssid: &str, _pass: &str) -> anyhow::Result<()> {
        if self.fail_access_point {
            anyhow::bail!("access point '{}' refused to start", ssid);
        }
        self.state = SimState::AccessPoint;
        self.associated = false;
        self.ap_starts += 1;
        log::info!("[sim] access point '{}' up at {}", ssid, self.ap_ip);
        Ok(())
    }

    fn scan(&mut self) -> anyhow::Result<Vec<String>> {
        if self.scans > 0 {
            if let Some(next) = self.upcoming.pop_front() {
                self.visible = next;
            }
        }
        self.scans += 1;
        Ok(self.visible.clone())
    }

    fn end(&mut self) {
        self.state = SimState::Off;
        self.associated = false;
    }
}
