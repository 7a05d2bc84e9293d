use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db;

/// Events pushed to the submitting user over their live stream and mirrored
/// into the notifications table.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    ReturnSubmitted {
        return_id: Uuid,
        package_name: String,
    },
    ReturnApproved {
        return_id: Uuid,
        points: f64,
    },
}

impl NotificationEvent {
    pub fn message(&self) -> String {
        match self {
            NotificationEvent::ReturnSubmitted { package_name, .. } => format!(
                "Your return for package \"{}\" has been submitted.",
                package_name
            ),
            NotificationEvent::ReturnApproved { points, .. } => format!(
                "Your return was approved! You earned {} Green Points.",
                points
            ),
        }
    }

    pub fn kind(&self) -> &'static str {
        "Return"
    }

    pub fn link(&self) -> Option<&'static str> {
        match self {
            NotificationEvent::ReturnSubmitted { .. } => None,
            NotificationEvent::ReturnApproved { .. } => Some("/my-returns"),
        }
    }
}

/// Per-user fan-out of notification events. Injected into the engine through
/// `AppState`; emission is best-effort and never fails the operation that
/// triggered it.
pub struct Notifier {
    pool: PgPool,
    channels: RwLock<HashMap<Uuid, broadcast::Sender<NotificationEvent>>>,
}

const CHANNEL_CAPACITY: usize = 32;

impl Notifier {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a user's live event stream.
    pub async fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<NotificationEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Persist the event and push it to live subscribers. Both halves are
    /// best-effort: failures are logged and swallowed.
    pub async fn notify(&self, user_id: Uuid, event: NotificationEvent) {
        if let Err(e) = db::insert_notification(
            &self.pool,
            user_id,
            &event.message(),
            event.kind(),
            event.link(),
        )
        .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to persist notification");
        }

        self.push_live(user_id, event).await;
    }

    /// Channel-only push, without persistence.
    pub async fn push_live(&self, user_id: Uuid, event: NotificationEvent) {
        let channels = self.channels.read().await;
        match channels.get(&user_id) {
            Some(sender) => {
                // send only errors when nobody is subscribed anymore
                if sender.send(event).is_err() {
                    debug!(user_id = %user_id, "No live subscribers for notification");
                }
            }
            None => {
                debug!(user_id = %user_id, "No live subscribers for notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NotificationEvent {
        NotificationEvent::ReturnApproved {
            return_id: Uuid::new_v4(),
            points: 12.5,
        }
    }

    #[tokio::test]
    async fn live_push_reaches_subscriber() {
        let notifier = Notifier::new(PgPool::connect_lazy("postgres://localhost/unused").unwrap());
        let user = Uuid::new_v4();

        let mut rx = notifier.subscribe(user).await;
        notifier.push_live(user, event()).await;

        let received = rx.try_recv().expect("event should be delivered");
        assert!(matches!(
            received,
            NotificationEvent::ReturnApproved { .. }
        ));
    }

    #[tokio::test]
    async fn push_without_subscriber_is_silent() {
        let notifier = Notifier::new(PgPool::connect_lazy("postgres://localhost/unused").unwrap());
        // must not panic or error
        notifier.push_live(Uuid::new_v4(), event()).await;
    }

    #[tokio::test]
    async fn events_are_scoped_per_user() {
        let notifier = Notifier::new(PgPool::connect_lazy("postgres://localhost/unused").unwrap());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut alice_rx = notifier.subscribe(alice).await;
        let mut bob_rx = notifier.subscribe(bob).await;
        notifier.push_live(alice, event()).await;

        assert!(alice_rx.try_recv().is_ok());
        assert!(bob_rx.try_recv().is_err());
    }

    #[test]
    fn messages_match_event_content() {
        let ev = NotificationEvent::ReturnSubmitted {
            return_id: Uuid::new_v4(),
            package_name: "Shoe box".to_string(),
        };
        assert!(ev.message().contains("Shoe box"));
        assert_eq!(ev.kind(), "Return");
        assert!(ev.link().is_none());

        let approved = event();
        assert!(approved.message().contains("12.5"));
        assert_eq!(approved.link(), Some("/my-returns"));
    }
}
