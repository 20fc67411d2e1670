//! Rust library for controlling battery-powered cleaning robots over their
//! local data-point protocol
//!
//! Robots expose their state as a small map of numbered data points (DPs):
//! play/pause, work mode, clean speed, battery level, error code and so on.
//! This library gives each of them a typed accessor and takes care of:
//!
//! - Connecting on demand, discovering the robot's address first if needed
//! - Caching the last full status for 30 seconds to avoid polling the robot
//! - Mapping raw wire literals to typed enums
//! - Relaying transport events (data, refreshes, errors) to subscribers
//!
//! # Quick Start
//!
//! ```no_run
//! use robovac::{CleanSpeed, RoboVac, RoboVacConfig, WorkStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RoboVacConfig::new("0123456789abcdef", "secretkey");
//!     let robovac = RoboVac::with_bridge(config, "ws://127.0.0.1:8090")?;
//!
//!     if robovac.work_status(false).await? == WorkStatus::Charging {
//!         robovac.set_clean_speed(CleanSpeed::BoostIq).await?;
//!         robovac.start_cleaning(false).await?;
//!     }
//!
//!     // Reuses the status fetched above
//!     println!("Battery: {}%", robovac.battery_level(false).await?);
//!     Ok(())
//! }
//! ```
//!
//! # Custom Transports
//!
//! The robot's encrypted session is handled by a [`Transport`]. The bundled
//! [`BridgeTransport`] talks JSON over WebSocket to a local bridge service;
//! anything else implementing the trait can be passed to [`RoboVac::new`].
//!
//! # Architecture
//!
//! - **RoboVac**: typed accessors and the status cache policy
//! - **Session**: connected flag and the discover-then-connect gate
//! - **Cache**: last status snapshot with its fetch time
//! - **DPs**: data point table and value domains
//! - **Transport**: seam to the wire, with a WebSocket bridge implementation

mod bridge;
mod cache;
mod config;
mod connection;
mod dps;
mod error;
mod protocol;
mod robovac;
mod session;
mod subscription;
mod transport;
mod types;

// Public exports
pub use bridge::BridgeTransport;
pub use cache::{CacheEntry, StatusCache, DEFAULT_MAX_AGE};
pub use config::{RoboVacConfig, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, DEFAULT_VERSION};
pub use dps::{CleanSpeed, DataPoint, Direction, DpEnum, ErrorCode, ValueKind, WorkMode, WorkStatus};
pub use error::{Result, RoboVacError};
pub use robovac::RoboVac;
pub use session::{Session, SessionState};
pub use subscription::EventReceiver;
pub use transport::{ObserverList, Transport, TransportEvent, TransportObserver};
pub use types::{BatteryLevel, DeviceId, DeviceIdentity, DpMap, StatusSnapshot};
