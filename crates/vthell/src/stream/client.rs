//! Reconnecting WebSocket client with event fan-out.
//!
//! Owns one logical connection to the backend push endpoint. Inbound frames
//! are decoded and dispatched to registered handlers in registration order;
//! when the transport drops for any reason other than [`EventStreamClient::close`],
//! a fresh transport is opened after a fixed delay. The handler table lives
//! outside the transport, so subscriptions survive reconnects.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::frame::{events, Frame};
use crate::error::StreamError;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const OUTBOUND_QUEUE: usize = 64;

type Handler = Box<dyn Fn(&Value) + Send + Sync + 'static>;
type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle to the persistent event stream. Cheap to clone; all clones share
/// the same connection and handler table.
#[derive(Clone)]
pub struct EventStreamClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    url: String,
    reconnect_delay: Duration,
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
    outbound_tx: mpsc::Sender<Frame>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Frame>>>,
    connected: AtomicBool,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl EventStreamClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_reconnect_delay(url, RECONNECT_DELAY)
    }

    /// Same as [`new`](Self::new) with a custom delay between reconnect
    /// attempts.
    pub fn with_reconnect_delay(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ClientInner {
                url: url.into(),
                reconnect_delay,
                handlers: RwLock::new(HashMap::new()),
                outbound_tx,
                outbound_rx: Mutex::new(Some(outbound_rx)),
                connected: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                shutdown,
            }),
        }
    }

    /// Registers a handler for an event name. Multiple handlers per name are
    /// allowed and run in registration order.
    pub fn on<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut handlers = lock_write(&self.inner.handlers);
        handlers
            .entry(event.into())
            .or_default()
            .push(Box::new(handler));
    }

    /// Removes every handler registered for the event name.
    pub fn off(&self, event: &str) {
        let mut handlers = lock_write(&self.inner.handlers);
        handlers.remove(event);
    }

    /// Queues an `{event, data}` frame for sending over the open transport.
    pub fn emit(&self, event: impl Into<String>, data: Value) -> Result<(), StreamError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(StreamError::Closed);
        }
        if !self.inner.connected.load(Ordering::Acquire) {
            return Err(StreamError::NotConnected);
        }
        self.inner
            .outbound_tx
            .try_send(Frame::new(event, data))
            .map_err(|_| StreamError::QueueFull)
    }

    /// Opens the transport and starts the connection task. Call once.
    pub fn connect(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { run(inner).await })
    }

    /// Deliberately terminates the connection. No reconnect will follow.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let _ = self.inner.shutdown.send(true);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }
}

async fn run(inner: Arc<ClientInner>) {
    let mut outbound = match inner.outbound_rx.lock().await.take() {
        Some(rx) => rx,
        None => {
            warn!("Stream client connect() called twice; ignoring");
            return;
        }
    };
    let mut shutdown_rx = inner.shutdown.subscribe();

    loop {
        if inner.closed.load(Ordering::Acquire) {
            break;
        }
        let connected = tokio::select! {
            res = connect_async(inner.url.as_str()) => res,
            _ = shutdown_rx.changed() => break,
        };
        let mut ws = match connected {
            Ok((ws, _)) => ws,
            Err(e) => {
                warn!("Failed to reach {}: {}", inner.url, e);
                if !wait_reconnect(&inner, &mut shutdown_rx).await {
                    break;
                }
                continue;
            }
        };

        info!("Connection established with {}", inner.url);
        inner.connected.store(true, Ordering::Release);
        inner.dispatch(events::CONNECT, &Value::Null);

        run_session(&inner, &mut ws, &mut outbound, &mut shutdown_rx).await;

        inner.connected.store(false, Ordering::Release);
        info!("Connection closed with {}", inner.url);
        inner.dispatch(events::CLOSED, &Value::Null);

        if inner.closed.load(Ordering::Acquire) {
            break;
        }
        if !wait_reconnect(&inner, &mut shutdown_rx).await {
            break;
        }
    }
    debug!("Stream client task for {} finished", inner.url);
}

/// Pumps one live transport until it drops or the client is closed.
async fn run_session(
    inner: &ClientInner,
    ws: &mut Transport,
    outbound: &mut mpsc::Receiver<Frame>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            inbound = ws.next() => match inbound {
                Some(Ok(message)) => {
                    if let Some(reply) = inner.handle_message(message) {
                        if let Err(e) = send_frame(ws, &reply).await {
                            warn!("Failed to answer ping: {}", e);
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("Stream transport error: {}", e);
                    return;
                }
                None => return,
            },
            frame = outbound.recv() => {
                let Some(frame) = frame else { return };
                if let Err(e) = send_frame(ws, &frame).await {
                    warn!("Failed to send '{}' frame: {}", frame.event, e);
                    return;
                }
            }
            _ = shutdown_rx.changed() => {
                let _ = ws.close(None).await;
                return;
            }
        }
    }
}

async fn send_frame(
    ws: &mut Transport,
    frame: &Frame,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    // Encode failures are a local bug, not a transport problem; drop and log.
    match frame.encode() {
        Ok(text) => ws.send(Message::Text(text)).await,
        Err(e) => {
            warn!("Failed to serialize '{}' frame: {}", frame.event, e);
            Ok(())
        }
    }
}

/// Waits out the reconnect delay. Returns false when the client was closed
/// in the meantime.
async fn wait_reconnect(inner: &ClientInner, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    debug!("Reconnecting in {:?}", inner.reconnect_delay);
    tokio::select! {
        _ = tokio::time::sleep(inner.reconnect_delay) => !inner.closed.load(Ordering::Acquire),
        _ = shutdown_rx.changed() => false,
    }
}

impl ClientInner {
    /// Decodes one transport message. Returns a frame to send back when the
    /// message was a server ping.
    fn handle_message(&self, message: Message) -> Option<Frame> {
        let decoded = match message {
            Message::Text(text) => Frame::decode(&text),
            Message::Binary(bytes) => Frame::decode_bytes(&bytes),
            // Protocol-level ping/pong is handled by the transport itself.
            _ => return None,
        };
        match decoded {
            Ok(frame) if frame.event == events::PING => {
                debug!("Answering server ping");
                Some(Frame::new(events::PONG, frame.data))
            }
            Ok(frame) => {
                self.dispatch(&frame.event, &frame.data);
                None
            }
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                None
            }
        }
    }

    /// Invokes every handler registered for the event, in order. A panicking
    /// handler is contained so the rest still run.
    fn dispatch(&self, event: &str, data: &Value) {
        let handlers = match self.handlers.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Handler table lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let Some(list) = handlers.get(event) else {
            return;
        };
        for handler in list {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler(data))).is_err() {
                warn!("Handler for '{}' panicked, continuing dispatch", event);
            }
        }
    }
}

fn lock_write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Handler table lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn client() -> EventStreamClient {
        EventStreamClient::new("ws://127.0.0.1:9/")
    }

    #[test]
    fn test_dispatch_runs_handlers_in_registration_order() {
        let client = client();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            client.on("job_update", move |_| {
                seen.lock().unwrap().push(tag);
            });
        }
        client.inner.dispatch("job_update", &json!({"id": "v1"}));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_off_removes_all_handlers_for_event() {
        let client = client();
        let seen = Arc::new(StdMutex::new(0u32));
        let counter = Arc::clone(&seen);
        client.on("closed", move |_| {
            *counter.lock().unwrap() += 1;
        });
        client.off("closed");
        client.inner.dispatch("closed", &Value::Null);
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let client = client();
        let seen = Arc::new(StdMutex::new(false));
        client.on("connect", |_| panic!("bad handler"));
        let flag = Arc::clone(&seen);
        client.on("connect", move |_| {
            *flag.lock().unwrap() = true;
        });
        client.inner.dispatch("connect", &Value::Null);
        assert!(*seen.lock().unwrap());
    }

    #[test]
    fn test_ping_answered_without_forwarding() {
        let client = client();
        let seen = Arc::new(StdMutex::new(0u32));
        let counter = Arc::clone(&seen);
        client.on("ping", move |_| {
            *counter.lock().unwrap() += 1;
        });
        let payload = json!({"t": 1234});
        let reply = client
            .inner
            .handle_message(Message::Text(json!({"event": "ping", "data": payload}).to_string()))
            .expect("ping should produce a pong");
        assert_eq!(reply.event, events::PONG);
        assert_eq!(reply.data, json!({"t": 1234}));
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_malformed_frame_is_dropped_silently() {
        let client = client();
        let seen = Arc::new(StdMutex::new(0u32));
        let counter = Arc::clone(&seen);
        client.on("job_update", move |_| {
            *counter.lock().unwrap() += 1;
        });
        assert!(client
            .inner
            .handle_message(Message::Text("{broken".to_string()))
            .is_none());
        assert!(client
            .inner
            .handle_message(Message::Binary(b"\xff\xfe".to_vec()))
            .is_none());
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_binary_frame_is_decoded() {
        let client = client();
        let seen = Arc::new(StdMutex::new(0u32));
        let counter = Arc::clone(&seen);
        client.on("job_delete", move |_| {
            *counter.lock().unwrap() += 1;
        });
        let bytes = json!({"event": "job_delete", "data": {"id": "v1"}})
            .to_string()
            .into_bytes();
        client.inner.handle_message(Message::Binary(bytes));
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_emit_fails_when_not_connected() {
        let client = client();
        assert!(matches!(
            client.emit("pong", Value::Null),
            Err(StreamError::NotConnected)
        ));
    }

    #[test]
    fn test_emit_fails_after_close() {
        let client = client();
        client.close();
        assert!(matches!(
            client.emit("pong", Value::Null),
            Err(StreamError::Closed)
        ));
    }
}
