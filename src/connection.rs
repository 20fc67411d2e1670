//! WebSocket link to a robot bridge

use crate::error::{Result, RoboVacError};
use crate::protocol::{Incoming, Request, Response};
use crate::transport::{TransportEvent, TransportObserver};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket connection state
struct ConnectionState {
    /// Pending requests waiting for responses
    pending_requests: HashMap<Uuid, oneshot::Sender<Response>>,
    /// Channel for sending outgoing messages
    ws_tx: mpsc::UnboundedSender<Message>,
}

type SharedState = Arc<Mutex<ConnectionState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, ConnectionState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Removes a request from the pending map however `send_request` ends
struct PendingGuard<'a> {
    state: &'a SharedState,
    id: Uuid,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).pending_requests.remove(&self.id);
    }
}

/// WebSocket connection to a robot bridge
///
/// Responses are matched to requests by id; notifications are handed to the
/// observer. When the bridge closes the socket, pending requests fail and
/// the observer sees [`TransportEvent::Disconnected`]. A socket closed from this
/// side with [`Connection::close`], or dropped, reports nothing further.
pub struct Connection {
    state: SharedState,
    reader: JoinHandle<()>,
    writer_abort: AbortHandle,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Connect to a WebSocket URL
    pub async fn connect(url: impl Into<String>, observer: Arc<dyn TransportObserver>) -> Result<Self> {
        let url = url.into();
        tracing::info!("Connecting to bridge at {}", url);

        let (ws_stream, _) = connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();

        let state = Arc::new(Mutex::new(ConnectionState {
            pending_requests: HashMap::new(),
            ws_tx,
        }));

        // Forward outgoing messages; a close frame is the last one sent
        let writer = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    tracing::error!("Failed to send message: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });
        let writer_abort = writer.abort_handle();

        let state_clone = state.clone();
        let reader_writer_abort = writer_abort.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = Self::handle_message(&state_clone, observer.as_ref(), text) {
                            tracing::error!("Error handling message: {}", e);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Bridge connection closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        observer.on_event(&TransportEvent::Error(e.to_string()));
                        break;
                    }
                    _ => {}
                }
            }

            // Dropping the senders fails every waiting request
            lock(&state_clone).pending_requests.clear();
            reader_writer_abort.abort();
            observer.on_event(&TransportEvent::Disconnected);
        });

        Ok(Self {
            state,
            reader,
            writer_abort,
            writer: Mutex::new(Some(writer)),
        })
    }

    fn handle_message(state: &SharedState, observer: &dyn TransportObserver, text: String) -> Result<()> {
        tracing::trace!("Received: {}", text);

        match serde_json::from_str::<Incoming>(&text)? {
            Incoming::Response(response) => {
                let tx = lock(state).pending_requests.remove(&response.id);
                match tx {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => tracing::warn!("Response for unknown request {}", response.id),
                }
            }
            Incoming::Event(notification) => observer.on_event(&notification.into_event()),
        }

        Ok(())
    }

    /// Whether the socket has gone away
    pub fn is_closed(&self) -> bool {
        lock(&self.state).ws_tx.is_closed()
    }

    /// Close the socket from this side
    ///
    /// Stops event delivery first, then sends a close frame and waits briefly
    /// for it to go out.
    pub async fn close(&self) {
        self.reader.abort();

        let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner()).take();
        {
            let mut state = lock(&self.state);
            state.pending_requests.clear();
            let _ = state.ws_tx.send(Message::Close(None));
        }

        if let Some(writer) = writer {
            if timeout(CLOSE_TIMEOUT, writer).await.is_err() {
                self.writer_abort.abort();
            }
        }
    }

    /// Send a request and wait for the response
    pub async fn send_request(&self, request: Request) -> Result<Response> {
        let request_id = request.id;
        let json = serde_json::to_string(&request)?;
        let (tx, rx) = oneshot::channel();

        let _pending = PendingGuard {
            state: &self.state,
            id: request_id,
        };

        {
            let mut state = lock(&self.state);
            state.pending_requests.insert(request_id, tx);

            tracing::trace!("Sending: {}", json);
            state
                .ws_tx
                .send(Message::Text(json))
                .map_err(|_| RoboVacError::ConnectionClosed)?;
        }

        let response = match timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(RoboVacError::ConnectionClosed),
            Err(_) => return Err(RoboVacError::Timeout),
        };

        if let Some(detail) = &response.error {
            return Err(RoboVacError::Transport(detail.clone()));
        }

        Ok(response)
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        lock(&self.state).pending_requests.len()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer_abort.abort();
    }
}
