//! Connection gate shared by every read and write
//!
//! The connected flag follows the transport's lifecycle events only. Before
//! each operation the session connects on demand, looking up the robot's
//! address first when none is known.

use crate::error::{Result, RoboVacError};
use crate::transport::{Transport, TransportEvent, TransportObserver};
use crate::types::{DeviceId, DpMap, StatusSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Slack on top of the discovery timeout handed to the transport, so a find
/// that succeeds right at its own deadline is not cut off
const DISCOVERY_GRACE: Duration = Duration::from_millis(500);

/// Connectivity of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Looking for the robot's address before connecting
    Discovering,
    Connected,
}

/// Connected flag, driven only by transport lifecycle events
struct ConnectionState {
    device_id: DeviceId,
    connected: AtomicBool,
    debug_log: bool,
}

impl TransportObserver for ConnectionState {
    fn on_event(&self, event: &TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.connected.store(true, Ordering::SeqCst);
                if self.debug_log {
                    tracing::debug!(device_id = %self.device_id, "Connected to device");
                }
            }
            TransportEvent::Disconnected => {
                self.connected.store(false, Ordering::SeqCst);
                if self.debug_log {
                    tracing::debug!(device_id = %self.device_id, "Disconnected from device");
                }
            }
            TransportEvent::Error(e) => {
                if self.debug_log {
                    tracing::error!(device_id = %self.device_id, "Transport error: {}", e);
                }
            }
            TransportEvent::DpRefresh(data) => {
                if self.debug_log {
                    tracing::debug!(device_id = %self.device_id, "DP refresh: {}", data);
                }
            }
            TransportEvent::Data(data) => {
                if self.debug_log {
                    tracing::debug!(device_id = %self.device_id, "Data: {}", data);
                }
            }
        }
    }
}

/// Gate in front of the transport
///
/// Every read and write goes through [`Session::fetch`] or
/// [`Session::write`], which first make sure the transport is connected,
/// discovering the robot's address when it is not known yet.
pub struct Session {
    transport: Arc<dyn Transport>,
    state: Arc<ConnectionState>,
    discovering: AtomicBool,
    discovery_timeout: Duration,
    debug_log: bool,
}

impl Session {
    /// Create a session and subscribe to the transport's lifecycle events
    pub fn new(
        transport: Arc<dyn Transport>,
        device_id: impl Into<DeviceId>,
        discovery_timeout: Duration,
        debug_log: bool,
    ) -> Self {
        let state = Arc::new(ConnectionState {
            device_id: device_id.into(),
            connected: AtomicBool::new(false),
            debug_log,
        });
        transport.subscribe(state.clone());

        Self {
            transport,
            state,
            discovering: AtomicBool::new(false),
            discovery_timeout,
            debug_log,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        if self.is_connected() {
            SessionState::Connected
        } else if self.discovering.load(Ordering::SeqCst) {
            SessionState::Discovering
        } else {
            SessionState::Disconnected
        }
    }

    /// Make sure the transport is connected
    ///
    /// Discovery failures are only logged; the connect attempt that follows
    /// reports the real error.
    pub async fn ensure_ready(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        if self.transport.resolved_address().is_none() {
            if let Err(e) = self.discover().await {
                tracing::warn!(device_id = %self.state.device_id, "Discovery failed: {}", e);
            }
        }

        self.connect().await
    }

    /// Connect unless already connected
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        if self.debug_log {
            tracing::debug!(device_id = %self.state.device_id, "Connecting");
        }

        self.transport.connect().await.inspect_err(|e| {
            if self.debug_log {
                tracing::error!(device_id = %self.state.device_id, "Connect failed: {}", e);
            }
        })
    }

    /// Disconnect unconditionally
    pub async fn disconnect(&self) -> Result<()> {
        if self.debug_log {
            tracing::debug!(device_id = %self.state.device_id, "Disconnecting");
        }
        self.transport.disconnect().await
    }

    /// Fetch the full status once connected
    pub async fn fetch(&self) -> Result<StatusSnapshot> {
        self.ensure_ready().await?;
        self.transport.get().await
    }

    /// Write data points once connected
    pub async fn write(&self, data: DpMap) -> Result<()> {
        self.ensure_ready().await?;
        if self.debug_log {
            tracing::debug!(device_id = %self.state.device_id, "Setting {:?}", data);
        }
        self.transport.set(data).await
    }

    async fn discover(&self) -> Result<()> {
        self.discovering.store(true, Ordering::SeqCst);
        let bound = self.discovery_timeout + DISCOVERY_GRACE;
        let result = match timeout(bound, self.transport.find(self.discovery_timeout)).await {
            Ok(result) => result,
            Err(_) => Err(RoboVacError::Discovery(format!(
                "device not found within {:?}",
                self.discovery_timeout
            ))),
        };
        self.discovering.store(false, Ordering::SeqCst);
        result
    }
}
