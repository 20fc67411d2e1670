//! Identity and status types exchanged with a transport

use crate::dps::DataPoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Device identifier
pub type DeviceId = String;

/// Raw data point map keyed by wire index ("2", "102", ...)
pub type DpMap = BTreeMap<String, Value>;

/// Battery charge in percent
pub type BatteryLevel = u8;

/// Network identity of a robot
///
/// Built once from a validated [`RoboVacConfig`](crate::RoboVacConfig) and
/// never mutated. A missing `ip` means the address has to be discovered
/// before the first connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    #[serde(rename = "devId")]
    pub device_id: DeviceId,

    #[serde(rename = "localKey")]
    pub local_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    pub port: u16,

    pub version: String,
}

/// Full status of a robot as returned by one fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(rename = "devId", default)]
    pub device_id: DeviceId,

    #[serde(default)]
    pub dps: DpMap,
}

impl StatusSnapshot {
    /// Create a snapshot from raw data point values
    pub fn new(device_id: impl Into<DeviceId>, dps: DpMap) -> Self {
        Self {
            device_id: device_id.into(),
            dps,
        }
    }

    /// Get the raw value stored for a data point
    pub fn value(&self, dp: DataPoint) -> Option<&Value> {
        self.dps.get(dp.index())
    }
}
