//! WiFi radio abstraction and the cached list of visible networks.

use std::net::Ipv4Addr;

#[cfg(target_os = "espidf")]
pub mod esp;
mod sim;

pub use sim::SimRadio;

/// Capacity of the visible network list.
pub const MAX_VISIBLE_NETWORKS: usize = 20;
/// 802.11 SSIDs are at most 32 bytes.
pub const NETWORK_NAME_LEN: usize = 32;

pub type NetworkName = heapless::String<NETWORK_NAME_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Station is associated and has an address.
    Connected,
    /// Association requested, not finished yet.
    Connecting,
    Disconnected,
}

/// The WiFi driver as seen by the portal.
///
/// Calls may block briefly; long waits are done by the caller polling
/// [`Radio::status`].
pub trait Radio {
    /// Starts associating as a station. Returns once the request is issued.
    fn associate(&mut self, ssid: &str, pass: &str) -> anyhow::Result<()>;

    fn status(&mut self) -> ConnectionStatus;

    /// Address of the active interface, if it has one.
    fn local_address(&mut self) -> Option<Ipv4Addr>;

    /// Broadcasts our own network. An empty `pass` means an open network.
    fn begin_access_point(&mut self, ssid: &str, pass: &str) -> anyhow::Result<()>;

    /// Network names in the order the driver reported them.
    fn scan(&mut self) -> anyhow::Result<Vec<String>>;

    /// Stops station and access point alike.
    fn end(&mut self);
}

/// The most recent scan result, bounded to [`MAX_VISIBLE_NETWORKS`].
#[derive(Debug, Clone, Default)]
pub struct VisibleNetworks {
    names: heapless::Vec<NetworkName, MAX_VISIBLE_NETWORKS>,
}

impl VisibleNetworks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole list. Entries past the capacity are dropped.
    pub fn replace<I, T>(&mut self, names: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.names.clear();
        for name in names {
            let name = crate::credentials::truncated(name.as_ref());
            if self.names.push(name).is_err() {
                break;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
