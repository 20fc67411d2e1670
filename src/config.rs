//! Construction parameters for a robot handle
//!
//! Field names follow the camelCase keys robot configs are written with.

use crate::error::{Result, RoboVacError};
use crate::types::DeviceIdentity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default local port robots listen on
pub const DEFAULT_PORT: u16 = 6668;

/// Default protocol version
pub const DEFAULT_VERSION: &str = "3.3";

/// Default discovery bound in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 2;

/// Construction options for a [`RoboVac`](crate::RoboVac)
///
/// Field names deserialize from the camelCase keys used by existing robot
/// configuration files (`deviceId`, `localKey`, `debugLog`, ...).
///
/// # Example
///
/// ```
/// use robovac::RoboVacConfig;
///
/// let config = RoboVacConfig::new("0123456789abcdef", "secretkey")
///     .with_ip("192.168.1.50")
///     .with_debug_log(true);
/// assert_eq!(config.port, 6668);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoboVacConfig {
    #[serde(default)]
    pub device_id: String,

    #[serde(default)]
    pub local_key: String,

    #[serde(default)]
    pub ip: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_version")]
    pub version: String,

    /// Log every lifecycle event and outgoing command
    #[serde(default)]
    pub debug_log: bool,

    /// Discovery bound in seconds
    #[serde(default = "default_timeout")]
    pub timeout_duration: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RoboVacConfig {
    /// Create a config with the given identity and default options
    pub fn new(device_id: impl Into<String>, local_key: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            local_key: local_key.into(),
            ip: None,
            port: DEFAULT_PORT,
            version: default_version(),
            debug_log: false,
            timeout_duration: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a known device address, skipping discovery
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_debug_log(mut self, debug_log: bool) -> Self {
        self.debug_log = debug_log;
        self
    }

    /// Set the discovery bound in seconds
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_duration = secs;
        self
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_duration)
    }

    /// Check required fields and build the device identity
    pub fn validate(&self) -> Result<DeviceIdentity> {
        let device_id = self.device_id.trim();
        if device_id.is_empty() {
            return Err(RoboVacError::Config("a device id is required".to_string()));
        }

        let ip = self
            .ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        Ok(DeviceIdentity {
            device_id: device_id.to_string(),
            local_key: self.local_key.clone(),
            ip,
            port: self.port,
            version: self.version.clone(),
        })
    }
}
