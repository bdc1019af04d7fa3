use cp_core::error::AppError;
use cp_core::ids::UserId;
use cp_storage::ActivityRepository;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::event::ActivityEvent;

const PER_USER_CHANNEL_CAPACITY: usize = 256;

/// Fan-out of per-user activity events to live subscribers, plus a durable
/// append store. Unlike the generic websocket broadcaster in `cp-core`, a
/// subscriber that falls behind is told so explicitly rather than silently
/// skipping ahead — the bus's contract requires at-most-once delivery per
/// live subscriber, and a dropped `lagging` signal is how that contract is
/// kept visible to the caller instead of being quietly violated.
#[derive(Clone)]
pub struct ActivityEventBus {
    repo: ActivityRepository,
    channels: Arc<DashMap<UserId, broadcast::Sender<ActivityEvent>>>,
}

impl ActivityEventBus {
    pub fn new(repo: ActivityRepository) -> Self {
        Self {
            repo,
            channels: Arc::new(DashMap::new()),
        }
    }

    fn channel_for(&self, user_id: &UserId) -> broadcast::Sender<ActivityEvent> {
        self.channels
            .entry(user_id.clone())
            .or_insert_with(|| broadcast::channel(PER_USER_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Append to durable history, then deliver to any live subscribers of
    /// this user. Appending always happens, even if there are no
    /// subscribers or the broadcast send finds none listening.
    pub async fn publish(&self, event: ActivityEvent) -> Result<(), AppError> {
        let row = event.clone().into_row();
        self.repo.append(&row).await?;

        let sender = self.channel_for(&event.user_id);
        let _ = sender.send(event);
        Ok(())
    }

    pub fn subscribe(&self, user_id: &UserId) -> ActivitySubscription {
        let sender = self.channel_for(user_id);
        ActivitySubscription {
            rx: sender.subscribe(),
        }
    }

    pub async fn history(&self, user_id: &UserId, limit: i64) -> Result<Vec<ActivityEvent>, AppError> {
        let rows = self.repo.history(user_id, limit).await?;
        Ok(rows.into_iter().map(ActivityEvent::from_row).collect())
    }
}

pub struct ActivitySubscription {
    rx: broadcast::Receiver<ActivityEvent>,
}

/// What a live subscriber observes: either the next event in publish order,
/// or a terminal notice that events were missed because the subscriber fell
/// behind the channel's bounded buffer.
pub enum ActivityStreamItem {
    Event(ActivityEvent),
    Lagging { missed: u64 },
}

impl ActivitySubscription {
    /// Returns `None` once the bus-side sender for this user is dropped.
    /// A `Lagging` item is terminal: the caller should treat the
    /// subscription as broken and re-subscribe (optionally re-fetching
    /// `history` to recover the gap) rather than call `recv` again.
    pub async fn recv(&mut self) -> Option<ActivityStreamItem> {
        match self.rx.recv().await {
            Ok(event) => Some(ActivityStreamItem::Event(event)),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                Some(ActivityStreamItem::Lagging { missed })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_for_is_stable_per_user() {
        let channels: DashMap<UserId, broadcast::Sender<ActivityEvent>> = DashMap::new();
        let user = UserId::new("u1");
        let (tx, _) = broadcast::channel(4);
        channels.insert(user.clone(), tx.clone());
        assert!(channels.get(&user).is_some());
    }

    fn sample_event(user_id: &UserId) -> ActivityEvent {
        ActivityEvent {
            user_id: user_id.clone(),
            action: "like".into(),
            status: crate::event::ActivityStatus::Success,
            target: None,
            details: Default::default(),
            timestamp: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn lagging_subscriber_receives_terminal_signal() {
        let (tx, rx) = broadcast::channel(2);
        let mut sub = ActivitySubscription { rx };
        let user = UserId::new("u1");

        for _ in 0..5 {
            let _ = tx.send(sample_event(&user));
        }

        match sub.recv().await {
            Some(ActivityStreamItem::Lagging { missed }) => assert!(missed > 0),
            _ => panic!("expected a lagging signal"),
        }
    }
}
