//! Seam between the session layer and whatever carries data points to the
//! robot.
//!
//! The session only needs the operations in [`Transport`] and the two
//! lifecycle events `connected`/`disconnected`. Everything else a transport
//! reports is diagnostics.

use crate::error::Result;
use crate::types::{DpMap, StatusSnapshot};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Event emitted by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    /// Transport-level failure, already surfaced to the failing call if any
    Error(String),
    /// Unsolicited partial status refresh
    DpRefresh(Value),
    /// Raw data received from the robot
    Data(Value),
}

impl TransportEvent {
    /// Name of the event as transports report it
    pub fn name(&self) -> &'static str {
        match self {
            TransportEvent::Connected => "connected",
            TransportEvent::Disconnected => "disconnected",
            TransportEvent::Error(_) => "error",
            TransportEvent::DpRefresh(_) => "dp-refresh",
            TransportEvent::Data(_) => "data",
        }
    }
}

/// Receives transport events
///
/// Called inline by the transport, so implementations must not block.
pub trait TransportObserver: Send + Sync {
    fn on_event(&self, event: &TransportEvent);
}

/// Connection to a single robot
///
/// Implementations own the network session, encryption and raw data point
/// exchange. `connect` must notify observers with
/// [`TransportEvent::Connected`] before it returns `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session with the robot
    async fn connect(&self) -> Result<()>;

    /// Close the session
    async fn disconnect(&self) -> Result<()>;

    /// Locate the robot on the network, giving up after `timeout`
    async fn find(&self, timeout: Duration) -> Result<()>;

    /// Fetch the full status
    async fn get(&self) -> Result<StatusSnapshot>;

    /// Write one or more data points in a single command
    async fn set(&self, data: DpMap) -> Result<()>;

    /// Address the robot was found at, if known
    fn resolved_address(&self) -> Option<String>;

    /// Register an observer for lifecycle and data events
    fn subscribe(&self, observer: Arc<dyn TransportObserver>);
}

/// Fan-out list of observers, for transport implementations
#[derive(Default)]
pub struct ObserverList {
    observers: std::sync::RwLock<Vec<Arc<dyn TransportObserver>>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn TransportObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    pub fn notify(&self, event: &TransportEvent) {
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer.on_event(event);
        }
    }
}

impl TransportObserver for ObserverList {
    fn on_event(&self, event: &TransportEvent) {
        self.notify(event);
    }
}
