//! WebSocket utilities shared by the extension bridge, the activity feed,
//! and the agent run push channel.
//!
//! An ergonomic stream wrapper plus a multi-client broadcaster keyed by
//! room name. Here "room" is always a `UserId` — each user gets at most
//! one broadcaster per surface.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;

#[derive(Debug)]
pub enum WsError {
    Send(axum::Error),
    Recv(axum::Error),
    Json(serde_json::Error),
    Closed,
}

impl std::fmt::Display for WsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WsError::Send(e) => write!(f, "ws send: {e}"),
            WsError::Recv(e) => write!(f, "ws recv: {e}"),
            WsError::Json(e) => write!(f, "ws json: {e}"),
            WsError::Closed => write!(f, "ws closed"),
        }
    }
}

impl std::error::Error for WsError {}

/// Ergonomic wrapper around Axum's `WebSocket` with typed JSON helpers.
pub struct WsStream {
    inner: WebSocket,
}

impl WsStream {
    pub fn new(socket: WebSocket) -> Self {
        Self { inner: socket }
    }

    pub async fn send(&mut self, msg: Message) -> Result<(), WsError> {
        self.inner.send(msg).await.map_err(WsError::Send)
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), WsError> {
        self.send(Message::Text(text.into().into())).await
    }

    pub async fn send_json<T: Serialize>(&mut self, data: &T) -> Result<(), WsError> {
        let json = serde_json::to_string(data).map_err(WsError::Json)?;
        self.send_text(json).await
    }

    pub async fn next(&mut self) -> Option<Result<Message, WsError>> {
        match self.inner.recv().await {
            Some(Ok(msg)) => Some(Ok(msg)),
            Some(Err(e)) => Some(Err(WsError::Recv(e))),
            None => None,
        }
    }

    pub async fn next_text(&mut self) -> Option<Result<String, WsError>> {
        loop {
            match self.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => return None,
                Err(e) => return Some(Err(e)),
                _ => continue,
            }
        }
    }

    pub async fn next_json<T: DeserializeOwned>(&mut self) -> Option<Result<T, WsError>> {
        let text = match self.next_text().await? {
            Ok(t) => t,
            Err(e) => return Some(Err(e)),
        };
        Some(serde_json::from_str(&text).map_err(WsError::Json))
    }

    pub fn into_inner(self) -> WebSocket {
        self.inner
    }
}

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
struct BroadcastMessage {
    data: Arc<Message>,
}

/// Multi-client broadcaster for a single room (here: a single user's surface).
#[derive(Clone)]
pub struct WsBroadcaster {
    tx: broadcast::Sender<BroadcastMessage>,
}

impl WsBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn send_json<T: Serialize>(&self, data: &T) -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(data)?;
        let _ = self.tx.send(BroadcastMessage {
            data: Arc::new(Message::Text(json.into())),
        });
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn subscribe(&self) -> WsBroadcastReceiver {
        WsBroadcastReceiver {
            rx: self.tx.subscribe(),
            client_id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

pub struct WsBroadcastReceiver {
    rx: broadcast::Receiver<BroadcastMessage>,
    client_id: u64,
}

impl WsBroadcastReceiver {
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// Receive the next broadcast message. Returns `Some(None)`-free: a
    /// lagged receiver silently skips ahead rather than reporting the gap,
    /// since broadcaster consumers here only care about the freshest state.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some((*msg.data).clone()),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }
}

/// Named room manager — one `WsBroadcaster` per key, created on first use.
#[derive(Clone)]
pub struct WsRooms {
    rooms: Arc<DashMap<String, WsBroadcaster>>,
    capacity: usize,
}

impl WsRooms {
    pub fn new(capacity_per_room: usize) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            capacity: capacity_per_room,
        }
    }

    pub fn room(&self, name: &str) -> WsBroadcaster {
        self.rooms
            .entry(name.to_string())
            .or_insert_with(|| WsBroadcaster::new(self.capacity))
            .clone()
    }

    pub fn remove(&self, name: &str) {
        self.rooms.remove(name);
    }
}

impl Default for WsRooms {
    fn default() -> Self {
        Self::new(128)
    }
}

/// Run a simple bidirectional relay: forward `rx` broadcasts to the socket and
/// feed incoming JSON frames to `on_incoming` until the socket closes.
pub async fn relay_with_broadcast<T, F, Fut>(
    mut ws: WsStream,
    mut rx: WsBroadcastReceiver,
    mut on_incoming: F,
) where
    T: DeserializeOwned,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(msg) => {
                        if ws.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = ws.next_json::<T>() => {
                match incoming {
                    Some(Ok(value)) => on_incoming(value).await,
                    Some(Err(_)) => continue,
                    None => break,
                }
            }
        }
    }
}
