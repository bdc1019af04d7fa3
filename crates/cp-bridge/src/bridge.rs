use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cp_core::ids::{RequestId, UserId};
use cp_events::{ActivityEvent, ActivityEventBus, ActivityStatus};
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::BridgeError;
use crate::frame::OutboundFrame;

type Completion = oneshot::Sender<Result<serde_json::Value, BridgeError>>;

struct PendingEntry {
    user_id: UserId,
    tx: Completion,
}

/// Routes typed requests to a user's in-browser agent over its persistent
/// connection and correlates the response by `RequestId`. The connection
/// itself is represented as a channel sender; the WebSocket handler owning
/// the real socket reads from its peer and forwards writes through here.
#[derive(Clone)]
pub struct ExtensionBridge {
    connections: Arc<DashMap<UserId, mpsc::UnboundedSender<OutboundFrame>>>,
    pending: Arc<DashMap<RequestId, PendingEntry>>,
    events: ActivityEventBus,
}

impl ExtensionBridge {
    pub fn new(events: ActivityEventBus) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
            events,
        }
    }

    /// Registers the connection for `user_id`, closing and failing out any
    /// prior connection's outstanding requests first.
    pub fn connect(&self, user_id: UserId, sender: mpsc::UnboundedSender<OutboundFrame>) {
        if self.connections.contains_key(&user_id) {
            self.disconnect(&user_id);
        }
        self.connections.insert(user_id, sender);
    }

    pub fn disconnect(&self, user_id: &UserId) {
        self.connections.remove(user_id);

        let stale: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|entry| &entry.value().user_id == user_id)
            .map(|entry| *entry.key())
            .collect();

        for request_id in stale {
            if let Some((_, entry)) = self.pending.remove(&request_id) {
                let _ = entry.tx.send(Err(BridgeError::NotConnected(user_id.clone())));
            }
        }
    }

    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.connections.contains_key(user_id)
    }

    pub async fn send(
        &self,
        user_id: &UserId,
        frame_type: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, BridgeError> {
        let sender = self
            .connections
            .get(user_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| BridgeError::NotConnected(user_id.clone()))?;

        let request_id = RequestId::new();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            request_id,
            PendingEntry {
                user_id: user_id.clone(),
                tx,
            },
        );

        let frame = OutboundFrame {
            frame_type: frame_type.to_string(),
            request_id,
            payload,
        };
        if sender.send(frame).is_err() {
            self.pending.remove(&request_id);
            return Err(BridgeError::NotConnected(user_id.clone()));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::NotConnected(user_id.clone())),
            Err(_) => {
                self.pending.remove(&request_id);
                Err(BridgeError::Timeout)
            }
        }
    }

    /// Dispatches an inbound frame: a matching `request_id` fulfills the
    /// waiting completion; anything else is published as an activity alert.
    pub async fn on_frame(&self, user_id: &UserId, raw: serde_json::Value) {
        if let Some(request_id) = raw
            .get("request_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId::from)
        {
            if let Some((_, entry)) = self.pending.remove(&request_id) {
                let _ = entry.tx.send(Ok(raw));
                return;
            }
        }

        self.publish_alert(user_id, raw).await;
    }

    async fn publish_alert(&self, user_id: &UserId, raw: serde_json::Value) {
        let action = raw
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("alert")
            .to_string();
        let status = match raw.get("status").and_then(|v| v.as_str()) {
            Some("failed") => ActivityStatus::Failed,
            _ => ActivityStatus::Success,
        };
        let target = raw
            .get("target")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let details: BTreeMap<String, serde_json::Value> = match &raw {
            serde_json::Value::Object(map) => map.clone().into_iter().collect(),
            _ => BTreeMap::new(),
        };

        let event = ActivityEvent {
            user_id: user_id.clone(),
            action,
            status,
            target,
            details,
            timestamp: chrono::Utc::now(),
        };

        if let Err(err) = self.events.publish(event).await {
            tracing::warn!(%user_id, error = %err, "failed to publish extension alert");
        }
    }
}
