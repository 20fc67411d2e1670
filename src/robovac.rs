//! Typed control surface for one robot

use crate::bridge::BridgeTransport;
use crate::cache::{CacheEntry, StatusCache};
use crate::config::RoboVacConfig;
use crate::dps::{CleanSpeed, DataPoint, Direction, DpEnum, ErrorCode, WorkMode, WorkStatus};
use crate::error::{Result, RoboVacError};
use crate::session::{Session, SessionState};
use crate::subscription::{ChannelObserver, EventReceiver};
use crate::transport::Transport;
use crate::types::{BatteryLevel, DeviceIdentity, DpMap, StatusSnapshot};
use serde_json::{json, Value};
use std::sync::Arc;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Handle for controlling a cleaning robot
///
/// Reads go through a status cache that is reused for 30 seconds; writes go
/// straight to the robot. Both connect on demand, discovering the robot's
/// address first when it was not configured.
///
/// # Example
///
/// ```no_run
/// use robovac::{CleanSpeed, RoboVac, RoboVacConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = RoboVacConfig::new("0123456789abcdef", "secretkey").with_ip("192.168.1.50");
///     let robovac = RoboVac::with_bridge(config, "ws://127.0.0.1:8090")?;
///
///     robovac.set_clean_speed(CleanSpeed::Max).await?;
///     robovac.start_cleaning(false).await?;
///     println!("Battery: {}%", robovac.battery_level(false).await?);
///     Ok(())
/// }
/// ```
pub struct RoboVac {
    identity: DeviceIdentity,
    session: Session,
    cache: StatusCache,
    events: Arc<ChannelObserver>,
    debug_log: bool,
}

impl RoboVac {
    /// Create a handle on top of an existing transport
    ///
    /// Fails with [`RoboVacError::Config`] before touching the transport if
    /// the config has no device id.
    pub fn new(config: RoboVacConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let identity = config.validate()?;

        let events = Arc::new(ChannelObserver::new(EVENT_CHANNEL_CAPACITY));
        transport.subscribe(events.clone());

        let session = Session::new(
            transport,
            identity.device_id.clone(),
            config.discovery_timeout(),
            config.debug_log,
        );

        Ok(Self {
            identity,
            session,
            cache: StatusCache::default(),
            events,
            debug_log: config.debug_log,
        })
    }

    /// Create a handle that reaches the robot through a WebSocket bridge
    ///
    /// No connection is made until the first read or write.
    pub fn with_bridge(config: RoboVacConfig, bridge_url: impl Into<String>) -> Result<Self> {
        let identity = config.validate()?;
        let transport = BridgeTransport::new(bridge_url, identity);
        Self::new(config, Arc::new(transport))
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Connect now instead of on the first operation
    pub async fn connect(&self) -> Result<()> {
        self.session.ensure_ready().await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.session.disconnect().await
    }

    /// Subscribe to every event the transport reports
    pub fn subscribe_events(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Last fetched status, however old
    pub fn last_status(&self) -> Option<CacheEntry> {
        self.cache.last()
    }

    // ========== Status ==========

    /// Get the full status, reusing the cached copy while it is fresh
    ///
    /// With `force` the robot is always queried. A failed fetch leaves the
    /// cached copy in place.
    pub async fn get_statuses(&self, force: bool) -> Result<StatusSnapshot> {
        if !force {
            if let Some(snapshot) = self.cache.fresh() {
                return Ok(snapshot);
            }
        }

        let snapshot = self.session.fetch().await?;
        self.cache.store(snapshot.clone());
        Ok(snapshot)
    }

    /// Get the raw value of a data point
    pub async fn get(&self, dp: DataPoint, force: bool) -> Result<Value> {
        let snapshot = self.get_statuses(force).await?;
        snapshot
            .value(dp)
            .cloned()
            .ok_or(RoboVacError::MissingDataPoint(dp))
    }

    /// Write several data points in one command
    pub async fn set(&self, entries: impl IntoIterator<Item = (DataPoint, Value)>) -> Result<()> {
        let data: DpMap = entries
            .into_iter()
            .map(|(dp, value)| (dp.index().to_string(), value))
            .collect();
        self.session.write(data).await
    }

    async fn set_one(&self, dp: DataPoint, value: Value) -> Result<()> {
        self.set([(dp, value)]).await
    }

    /// Raw value of a data point, rejected unless it has the DP's JSON kind
    async fn get_checked(&self, dp: DataPoint, force: bool) -> Result<Value> {
        let value = self.get(dp, force).await?;
        if dp.kind().matches(&value) {
            Ok(value)
        } else {
            Err(RoboVacError::UnexpectedValue { dp, value })
        }
    }

    async fn get_bool(&self, dp: DataPoint, force: bool) -> Result<bool> {
        let value = self.get_checked(dp, force).await?;
        value
            .as_bool()
            .ok_or(RoboVacError::UnexpectedValue { dp, value })
    }

    async fn get_enum<T: DpEnum>(&self, dp: DataPoint, force: bool) -> Result<T> {
        let value = self.get_checked(dp, force).await?;
        let parsed = value
            .as_str()
            .map(|raw| T::from(raw))
            .ok_or(RoboVacError::UnexpectedValue { dp, value })?;
        if !parsed.known() {
            tracing::warn!(
                device_id = %self.identity.device_id,
                "Unrecognized value {:?} for data point {}",
                parsed.wire(),
                dp
            );
        }
        Ok(parsed)
    }

    // ========== Play / Pause ==========

    pub async fn play_pause(&self, force: bool) -> Result<bool> {
        self.get_bool(DataPoint::PlayPause, force).await
    }

    pub async fn set_play_pause(&self, state: bool) -> Result<()> {
        self.set_one(DataPoint::PlayPause, json!(state)).await
    }

    pub async fn play(&self) -> Result<()> {
        self.set_play_pause(true).await
    }

    /// Sends the same command as [`play`](Self::play)
    // FIXME: writes true like play(); needs confirming against a robot
    // whether false is the pause command before changing it.
    pub async fn pause(&self) -> Result<()> {
        self.set_play_pause(true).await
    }

    // ========== Movement ==========

    pub async fn direction(&self, force: bool) -> Result<Direction> {
        self.get_enum(DataPoint::Direction, force).await
    }

    /// Steer the robot manually
    pub async fn set_direction(&self, direction: Direction) -> Result<()> {
        self.set_one(DataPoint::Direction, json!(direction.as_str())).await
    }

    // ========== Cleaning ==========

    pub async fn work_mode(&self, force: bool) -> Result<WorkMode> {
        self.get_enum(DataPoint::WorkMode, force).await
    }

    pub async fn set_work_mode(&self, mode: WorkMode) -> Result<()> {
        self.set_one(DataPoint::WorkMode, json!(mode.as_str())).await
    }

    pub async fn work_status(&self, force: bool) -> Result<WorkStatus> {
        self.get_enum(DataPoint::WorkStatus, force).await
    }

    pub async fn clean_speed(&self, force: bool) -> Result<CleanSpeed> {
        self.get_enum(DataPoint::CleanSpeed, force).await
    }

    pub async fn set_clean_speed(&self, speed: CleanSpeed) -> Result<()> {
        self.set_one(DataPoint::CleanSpeed, json!(speed.as_str())).await
    }

    /// Start an automatic clean
    ///
    /// The status is read first for the log only; this does not check that
    /// the robot actually started moving.
    pub async fn start_cleaning(&self, force: bool) -> Result<()> {
        let status = self.get_statuses(force).await?;
        if self.debug_log {
            tracing::debug!(
                device_id = %self.identity.device_id,
                "Starting cleaning from status {:?}",
                status.dps
            );
        }
        self.set_work_mode(WorkMode::Auto).await
    }

    // ========== Docking ==========

    pub async fn is_going_home(&self, force: bool) -> Result<bool> {
        self.get_bool(DataPoint::GoHome, force).await
    }

    /// Send the robot back to its charging base
    pub async fn go_home(&self) -> Result<()> {
        self.set_one(DataPoint::GoHome, json!(true)).await
    }

    // ========== Locating ==========

    pub async fn find_robot(&self, force: bool) -> Result<bool> {
        self.get_bool(DataPoint::FindRobot, force).await
    }

    /// Turn the robot's locator beep on or off
    pub async fn set_find_robot(&self, state: bool) -> Result<()> {
        self.set_one(DataPoint::FindRobot, json!(state)).await
    }

    // ========== Health ==========

    /// Battery charge in percent, as reported
    pub async fn battery_level(&self, force: bool) -> Result<BatteryLevel> {
        let dp = DataPoint::BatteryLevel;
        let value = self.get_checked(dp, force).await?;
        value
            .as_u64()
            .and_then(|level| BatteryLevel::try_from(level).ok())
            .ok_or(RoboVacError::UnexpectedValue { dp, value })
    }

    pub async fn error_code(&self, force: bool) -> Result<ErrorCode> {
        self.get_enum(DataPoint::ErrorCode, force).await
    }
}
