//! Live notification fan-out.
//!
//! A [`NotificationBroadcaster`] owns one unbounded queue per connected client id. Workflow
//! services publish events; the API layer drains a client's queue through a [`Subscription`].
//! Delivery is best-effort to the queues open at publish time.

use crate::{RecordId, Role, UrgencyLevel};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;

use crate::constants::KEEP_ALIVE_INTERVAL_SECS;

/// A workflow event pushed to connected clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    AppointmentBooked {
        patient_id: RecordId,
        appointment_id: RecordId,
        time: NaiveDateTime,
    },
    EmergencyRequest {
        urgency: UrgencyLevel,
        patient_id: RecordId,
        location: String,
        description: String,
        appointment_id: RecordId,
        time: NaiveDateTime,
    },
    PatientVitalsRecorded {
        recipient_id: RecordId,
        patient_id: RecordId,
        appointment_id: RecordId,
        ehr_id: RecordId,
    },
    DiagnosisUpdated {
        recipient_id: RecordId,
        ehr_id: RecordId,
        appointment_id: RecordId,
    },
    EhrCompleted {
        recipient_id: RecordId,
        ehr_id: RecordId,
        appointment_id: RecordId,
    },
}

impl Notification {
    /// The profile id a targeted event is addressed to.
    pub fn recipient_id(&self) -> Option<RecordId> {
        match self {
            Notification::AppointmentBooked { .. } | Notification::EmergencyRequest { .. } => None,
            Notification::PatientVitalsRecorded { recipient_id, .. }
            | Notification::DiagnosisUpdated { recipient_id, .. }
            | Notification::EhrCompleted { recipient_id, .. } => Some(*recipient_id),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Clinical staff queues plus the addressed recipient.
    Normal,
    /// Every open queue.
    High,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StreamItem {
    Event(Notification),
    KeepAlive,
}

struct ClientEntry {
    role: Option<Role>,
    sender: UnboundedSender<Notification>,
    receiver: Arc<AsyncMutex<UnboundedReceiver<Notification>>>,
    subscribers: usize,
}

impl ClientEntry {
    fn wants(&self, client_id: &str, notification: &Notification, priority: Priority) -> bool {
        match priority {
            Priority::High => true,
            Priority::Normal => {
                self.role.is_some_and(|r| r.is_clinical_staff())
                    || notification
                        .recipient_id()
                        .is_some_and(|id| id.to_string() == client_id)
            }
        }
    }
}

struct Registry {
    clients: RwLock<HashMap<String, ClientEntry>>,
}

#[derive(Clone)]
pub struct NotificationBroadcaster {
    registry: Arc<Registry>,
    keep_alive: Duration,
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBroadcaster {
    pub fn new() -> Self {
        Self::with_keep_alive(Duration::from_secs(KEEP_ALIVE_INTERVAL_SECS))
    }

    pub fn with_keep_alive(keep_alive: Duration) -> Self {
        Self {
            registry: Arc::new(Registry {
                clients: RwLock::new(HashMap::new()),
            }),
            keep_alive,
        }
    }

    /// Open (or join) the queue for `client_id`.
    ///
    /// `client_type` is the role name the client connects as; anything that is not a role
    /// only receives high-priority and addressed events.
    pub fn subscribe(&self, client_id: &str, client_type: &str) -> Subscription {
        let mut clients = self
            .registry
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let entry = clients.entry(client_id.to_string()).or_insert_with(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            ClientEntry {
                role: client_type.parse().ok(),
                sender,
                receiver: Arc::new(AsyncMutex::new(receiver)),
                subscribers: 0,
            }
        });
        entry.subscribers += 1;
        tracing::debug!(client_id, client_type, subscribers = entry.subscribers, "client subscribed");

        Subscription {
            registry: Arc::clone(&self.registry),
            client_id: client_id.to_string(),
            receiver: Arc::clone(&entry.receiver),
            keep_alive: self.keep_alive,
        }
    }

    /// Queue `notification` for every client it applies to. Returns the number of queues
    /// reached.
    pub fn publish(&self, notification: Notification, priority: Priority) -> usize {
        let clients = self
            .registry
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let delivered = clients
            .iter()
            .filter(|(id, entry)| entry.wants(id, &notification, priority))
            .filter(|(_, entry)| entry.sender.send(notification.clone()).is_ok())
            .count();

        tracing::debug!(?priority, delivered, "notification published");
        delivered
    }

    pub fn connected_clients(&self) -> usize {
        self.registry
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A live handle on one client's queue. Dropping the last handle for a client id closes the
/// queue.
pub struct Subscription {
    registry: Arc<Registry>,
    client_id: String,
    receiver: Arc<AsyncMutex<UnboundedReceiver<Notification>>>,
    keep_alive: Duration,
}

impl Subscription {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Wait for the next event, or yield [`StreamItem::KeepAlive`] once the keep-alive
    /// interval passes with nothing queued. `None` once the queue is closed.
    pub async fn next(&self) -> Option<StreamItem> {
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(self.keep_alive, receiver.recv()).await {
            Ok(Some(notification)) => Some(StreamItem::Event(notification)),
            Ok(None) => None,
            Err(_) => Some(StreamItem::KeepAlive),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut clients = self
            .registry
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = clients.get_mut(&self.client_id) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                clients.remove(&self.client_id);
                tracing::debug!(client_id = %self.client_id, "client disconnected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn booked() -> Notification {
        Notification::AppointmentBooked {
            patient_id: RecordId::new(),
            appointment_id: RecordId::new(),
            time: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    fn emergency() -> Notification {
        Notification::EmergencyRequest {
            urgency: UrgencyLevel::High,
            patient_id: RecordId::new(),
            location: "Ward 3".into(),
            description: "chest pain".into(),
            appointment_id: RecordId::new(),
            time: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    async fn expect_event(sub: &Subscription) -> Notification {
        match sub.next().await {
            Some(StreamItem::Event(n)) => n,
            other => panic!("expected an event, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_priority_reaches_staff_only() {
        let broadcaster = NotificationBroadcaster::new();
        let nurse = broadcaster.subscribe("n1", "nurse");
        let doctor = broadcaster.subscribe("d1", "doctor");
        let patient = broadcaster.subscribe("p1", "patient");

        let event = booked();
        assert_eq!(broadcaster.publish(event.clone(), Priority::Normal), 2);

        assert_eq!(expect_event(&nurse).await, event);
        assert_eq!(expect_event(&doctor).await, event);
        assert_eq!(patient.next().await, Some(StreamItem::KeepAlive));
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_priority_reaches_everyone() {
        let broadcaster = NotificationBroadcaster::new();
        let _nurse = broadcaster.subscribe("n1", "nurse");
        let _patient = broadcaster.subscribe("p1", "patient");
        let _unknown = broadcaster.subscribe("x1", "kiosk");

        assert_eq!(broadcaster.publish(emergency(), Priority::High), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_addressed_event_reaches_recipient() {
        let broadcaster = NotificationBroadcaster::new();
        let patient_id = RecordId::new();
        let patient = broadcaster.subscribe(&patient_id.to_string(), "patient");
        let _other = broadcaster.subscribe(&RecordId::new().to_string(), "patient");

        let event = Notification::DiagnosisUpdated {
            recipient_id: patient_id,
            ehr_id: RecordId::new(),
            appointment_id: RecordId::new(),
        };
        assert_eq!(broadcaster.publish(event.clone(), Priority::Normal), 1);
        assert_eq!(expect_event(&patient).await, event);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_arrive_in_publish_order() {
        let broadcaster = NotificationBroadcaster::new();
        let sub = broadcaster.subscribe("d1", "doctor");

        let first = booked();
        let second = booked();
        broadcaster.publish(first.clone(), Priority::Normal);
        broadcaster.publish(second.clone(), Priority::Normal);

        assert_eq!(expect_event(&sub).await, first);
        assert_eq!(expect_event(&sub).await, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribed_and_dropped_clients_receive_nothing() {
        let broadcaster = NotificationBroadcaster::new();
        assert_eq!(broadcaster.publish(emergency(), Priority::High), 0);

        let sub = broadcaster.subscribe("n1", "nurse");
        assert_eq!(broadcaster.connected_clients(), 1);
        drop(sub);

        assert_eq!(broadcaster.connected_clients(), 0);
        assert_eq!(broadcaster.publish(emergency(), Priority::High), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_survives_until_last_subscription_drops() {
        let broadcaster = NotificationBroadcaster::new();
        let first = broadcaster.subscribe("n1", "nurse");
        let second = broadcaster.subscribe("n1", "nurse");

        drop(first);
        assert_eq!(broadcaster.publish(booked(), Priority::Normal), 1);
        assert!(matches!(second.next().await, Some(StreamItem::Event(_))));

        drop(second);
        assert_eq!(broadcaster.connected_clients(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_after_quiet_interval() {
        let broadcaster = NotificationBroadcaster::with_keep_alive(Duration::from_secs(2));
        let sub = broadcaster.subscribe("d1", "doctor");

        let started = tokio::time::Instant::now();
        assert_eq!(sub.next().await, Some(StreamItem::KeepAlive));
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_notification_json_has_type_tag() {
        let json = serde_json::to_value(emergency()).expect("should serialize");
        assert_eq!(json["type"], "emergency_request");
        assert_eq!(json["urgency"], "HIGH");
        assert_eq!(json["location"], "Ward 3");
    }
}
