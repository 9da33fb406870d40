use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::{Ms, TimeWindow};

const CHANNEL_CAPACITY: usize = 256;

/// What happened to a booking, for whoever displays or notifies about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    Created { id: Ulid, resource_id: Ulid, pending: bool },
    Approved { id: Ulid, resource_id: Ulid },
    Cancelled { id: Ulid, resource_id: Ulid },
    Rescheduled {
        id: Ulid,
        resource_id: Ulid,
        from: TimeWindow,
        to: TimeWindow,
    },
    CheckedOut { id: Ulid, resource_id: Ulid },
    Returned { id: Ulid, resource_id: Ulid },
    Completed { id: Ulid, resource_id: Ulid },
    NoShow { id: Ulid, resource_id: Ulid },
    Overdue { id: Ulid, resource_id: Ulid },
    Reminder { id: Ulid, resource_id: Ulid, starts_at: Ms },
    Due { id: Ulid, resource_id: Ulid, due_at: Ms },
}

impl BookingEvent {
    pub fn resource_id(&self) -> Ulid {
        match self {
            BookingEvent::Created { resource_id, .. }
            | BookingEvent::Approved { resource_id, .. }
            | BookingEvent::Cancelled { resource_id, .. }
            | BookingEvent::Rescheduled { resource_id, .. }
            | BookingEvent::CheckedOut { resource_id, .. }
            | BookingEvent::Returned { resource_id, .. }
            | BookingEvent::Completed { resource_id, .. }
            | BookingEvent::NoShow { resource_id, .. }
            | BookingEvent::Overdue { resource_id, .. }
            | BookingEvent::Reminder { resource_id, .. }
            | BookingEvent::Due { resource_id, .. } => *resource_id,
        }
    }
}

/// Broadcast hub of booking events per resource.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<BookingEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a resource. Creates the channel if needed.
    pub fn subscribe(&self, resource_id: Ulid) -> broadcast::Receiver<BookingEvent> {
        let sender = self
            .channels
            .entry(resource_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// No-op if nobody is listening.
    pub fn send(&self, event: BookingEvent) {
        if let Some(sender) = self.channels.get(&event.resource_id()) {
            let _ = sender.send(event);
        }
    }

    pub fn remove(&self, resource_id: &Ulid) {
        self.channels.remove(resource_id);
    }
}
