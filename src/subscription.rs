//! Broadcast fan-out of transport events to any number of listeners

use crate::error::{Result, RoboVacError};
use crate::transport::{TransportEvent, TransportObserver};
use tokio::sync::broadcast;

/// Observer that republishes transport events on a broadcast channel
pub(crate) struct ChannelObserver {
    tx: broadcast::Sender<TransportEvent>,
}

impl ChannelObserver {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.tx.subscribe())
    }
}

impl TransportObserver for ChannelObserver {
    fn on_event(&self, event: &TransportEvent) {
        // No receivers is fine
        let _ = self.tx.send(event.clone());
    }
}

/// Receiver for transport events
pub struct EventReceiver {
    rx: broadcast::Receiver<TransportEvent>,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<TransportEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event
    ///
    /// Fails with `ConnectionClosed` once the robot handle has been dropped.
    pub async fn recv(&mut self) -> Result<TransportEvent> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => RoboVacError::ConnectionClosed,
            broadcast::error::RecvError::Lagged(n) => {
                RoboVacError::Transport(format!("Lagged by {} events", n))
            }
        })
    }

    /// Try to receive an event without blocking
    ///
    /// Returns `None` if no event is available.
    pub fn try_recv(&mut self) -> Result<Option<TransportEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(RoboVacError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(RoboVacError::Transport(format!("Lagged by {} events", n)))
            }
        }
    }
}
