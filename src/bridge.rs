//! Transport that reaches the robot through a WebSocket bridge

use crate::connection::Connection;
use crate::error::{Result, RoboVacError};
use crate::protocol::{Method, Request, Response};
use crate::transport::{ObserverList, Transport, TransportEvent, TransportObserver};
use crate::types::{DeviceIdentity, DpMap, StatusSnapshot};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

/// Relays events from one socket only while it is the transport's current one
struct LinkObserver {
    observers: Arc<ObserverList>,
    current: Arc<AtomicU64>,
    link: u64,
}

impl TransportObserver for LinkObserver {
    fn on_event(&self, event: &TransportEvent) {
        if self.current.load(Ordering::SeqCst) == self.link {
            self.observers.notify(event);
        } else {
            tracing::trace!("Dropping {} event from a retired bridge socket", event.name());
        }
    }
}

/// Transport that reaches the robot through a local WebSocket bridge
///
/// The bridge owns the robot's encrypted session; this side only sends
/// connect/find/get/set requests and relays the bridge's notifications.
/// The WebSocket itself is opened lazily and reopened after it drops.
pub struct BridgeTransport {
    url: String,
    identity: DeviceIdentity,
    connection: Mutex<Option<Arc<Connection>>>,
    address: RwLock<Option<String>>,
    observers: Arc<ObserverList>,
    current_link: Arc<AtomicU64>,
}

impl BridgeTransport {
    /// Create a transport for one robot; nothing is opened yet
    pub fn new(url: impl Into<String>, identity: DeviceIdentity) -> Self {
        let address = identity.ip.clone();
        Self {
            url: url.into(),
            identity,
            connection: Mutex::new(None),
            address: RwLock::new(address),
            observers: Arc::new(ObserverList::new()),
            current_link: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn connection(&self) -> Result<Arc<Connection>> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            if !connection.is_closed() {
                return Ok(connection.clone());
            }
        }

        let link = self.current_link.fetch_add(1, Ordering::SeqCst) + 1;
        let observer = Arc::new(LinkObserver {
            observers: self.observers.clone(),
            current: self.current_link.clone(),
            link,
        });
        let connection = Arc::new(Connection::connect(self.url.clone(), observer).await?);
        *slot = Some(connection.clone());
        Ok(connection)
    }

    async fn request(&self, method: Method, data: Value) -> Result<Response> {
        let request = Request::new(method, self.identity.device_id.clone()).with_data(data);
        let result = match self.connection().await {
            Ok(connection) => connection.send_request(request).await,
            Err(e) => Err(e),
        };

        result.inspect_err(|e| self.observers.notify(&TransportEvent::Error(e.to_string())))
    }

    fn set_address(&self, ip: String) {
        *self.address.write().unwrap_or_else(|e| e.into_inner()) = Some(ip);
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn connect(&self) -> Result<()> {
        let address = self.resolved_address();
        let data = json!({
            "localKey": self.identity.local_key,
            "ip": address,
            "port": self.identity.port,
            "version": self.identity.version,
        });

        self.request(Method::Connect, data).await.map_err(|e| match e {
            RoboVacError::Transport(detail) => RoboVacError::Connection(detail),
            other => other,
        })?;

        self.observers.notify(&TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let connection = self.connection.lock().await.take();
        let mut result = Ok(());
        if let Some(connection) = connection {
            if !connection.is_closed() {
                let request = Request::new(Method::Disconnect, self.identity.device_id.clone());
                result = connection
                    .send_request(request)
                    .await
                    .map(|_| ())
                    .map_err(|e| match e {
                        RoboVacError::Transport(detail) => RoboVacError::Connection(detail),
                        other => other,
                    });
            }
            self.current_link.fetch_add(1, Ordering::SeqCst);
            connection.close().await;
        }

        self.observers.notify(&TransportEvent::Disconnected);
        result
    }

    async fn find(&self, timeout: Duration) -> Result<()> {
        let response = self
            .request(Method::Find, json!({ "timeout": timeout.as_secs_f64() }))
            .await
            .map_err(|e| RoboVacError::Discovery(e.to_string()))?;

        let ip = response
            .data
            .as_ref()
            .and_then(|data| data.get("ip"))
            .and_then(Value::as_str)
            .filter(|ip| !ip.is_empty())
            .ok_or_else(|| RoboVacError::Discovery("bridge returned no address".to_string()))?;

        tracing::info!(device_id = %self.identity.device_id, "Found device at {}", ip);
        self.set_address(ip.to_string());
        Ok(())
    }

    async fn get(&self) -> Result<StatusSnapshot> {
        let response = self.request(Method::Get, json!({ "schema": true })).await?;
        let data = response
            .data
            .ok_or_else(|| RoboVacError::InvalidResponse("No data in status response".to_string()))?;

        let mut snapshot: StatusSnapshot = serde_json::from_value(data)?;
        if snapshot.device_id.is_empty() {
            snapshot.device_id = self.identity.device_id.clone();
        }
        Ok(snapshot)
    }

    async fn set(&self, data: DpMap) -> Result<()> {
        self.request(Method::Set, json!({ "multiple": true, "data": data }))
            .await?;
        Ok(())
    }

    fn resolved_address(&self) -> Option<String> {
        self.address.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn subscribe(&self, observer: Arc<dyn TransportObserver>) {
        self.observers.add(observer);
    }
}
