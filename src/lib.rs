//! WiFi provisioning through a captive portal.
//!
//! When no saved network can be joined the device broadcasts its own access
//! point, answers every DNS lookup with its own address and serves a setup page
//! where new credentials can be entered. Saved credentials are used on the next
//! boot.

pub mod app;
pub mod boards;
pub mod captive_portal;
pub mod config;
pub mod credentials;
pub mod form;
pub mod hal;
pub mod network;

pub use app::{ModeController, NetworkMode, Phase};
pub use config::PortalConfig;
pub use credentials::{CredentialStore, Credentials, FsStorage, StoreError};
