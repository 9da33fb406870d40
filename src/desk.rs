use std::collections::HashMap;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use ulid::Ulid;

use crate::engine::{
    EngineError, LifecycleService, Reminder, ReminderKind, SweepDisposition, SweepOutcome,
};
use crate::limits::*;
use crate::model::*;
use crate::notify::{BookingEvent, NotifyHub};
use crate::observability::*;

/// All bookings ever made against one resource, in insertion order.
pub type SharedSchedule = Arc<Mutex<Vec<Booking>>>;

/// In-process front door to the lifecycle service.
///
/// Each resource's schedule sits behind its own mutex and every decision
/// for that resource is made while holding it, so the existing-bookings
/// snapshot the engine sees cannot go stale before the result is stored.
/// Different resources never contend.
pub struct BookingDesk {
    service: LifecycleService,
    schedules: DashMap<Ulid, SharedSchedule>,
    /// Reverse lookup: booking id → resource id
    booking_to_resource: DashMap<Ulid, Ulid>,
    /// Reminders already sent, keyed by the instant they announced.
    reminded: DashSet<(Ulid, ReminderKind, Ms)>,
    pub notify: Arc<NotifyHub>,
}

impl BookingDesk {
    pub fn new(service: LifecycleService, notify: Arc<NotifyHub>) -> Self {
        Self {
            service,
            schedules: DashMap::new(),
            booking_to_resource: DashMap::new(),
            reminded: DashSet::new(),
            notify,
        }
    }

    pub fn service(&self) -> &LifecycleService {
        &self.service
    }

    fn schedule(&self, resource_id: Ulid) -> SharedSchedule {
        self.schedules
            .entry(resource_id)
            .or_default()
            .value()
            .clone()
    }

    fn all_schedules(&self) -> Vec<SharedSchedule> {
        self.schedules.iter().map(|e| e.value().clone()).collect()
    }

    /// Lookup booking → resource, acquire that resource's lock.
    async fn resolve(
        &self,
        booking_id: &Ulid,
    ) -> Result<(Ulid, OwnedMutexGuard<Vec<Booking>>), EngineError> {
        let resource_id = self
            .booking_to_resource
            .get(booking_id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(*booking_id))?;
        let schedule = self
            .schedules
            .get(&resource_id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::NotFound(resource_id))?;
        Ok((resource_id, schedule.lock_owned().await))
    }

    fn record(
        &self,
        operation: &'static str,
        result: Result<Booking, EngineError>,
    ) -> Result<Booking, EngineError> {
        match &result {
            Ok(b) => {
                metrics::counter!(DECISIONS_TOTAL, "operation" => operation, "outcome" => "accepted")
                    .increment(1);
                debug!(booking = %b.id, status = ?b.status, "{operation} accepted");
            }
            Err(e) => {
                metrics::counter!(DECISIONS_TOTAL, "operation" => operation, "outcome" => "rejected")
                    .increment(1);
                metrics::counter!(REJECTIONS_TOTAL, "operation" => operation, "reason" => e.label())
                    .increment(1);
                debug!("{operation} rejected: {e}");
            }
        }
        result
    }

    /// Run one decision on an existing booking under its resource lock and
    /// store the result in place.
    async fn apply<D, E>(
        &self,
        id: Ulid,
        operation: &'static str,
        decide: D,
        event: E,
    ) -> Result<Booking, EngineError>
    where
        D: FnOnce(&LifecycleService, &Booking, &[Booking]) -> Result<Booking, EngineError>,
        E: FnOnce(&Booking, &Booking) -> BookingEvent,
    {
        let (_, mut guard) = self.resolve(&id).await?;
        let pos = guard
            .iter()
            .position(|b| b.id == id)
            .ok_or(EngineError::NotFound(id))?;
        let result = decide(&self.service, &guard[pos], &guard[..]);
        let next = self.record(operation, result)?;
        let ev = event(&guard[pos], &next);
        guard[pos] = next.clone();
        drop(guard);
        self.notify.send(ev);
        Ok(next)
    }

    /// Bulk import of previously persisted bookings. A booking whose id is
    /// already held replaces the held copy, including when it now names a
    /// different resource.
    pub async fn load(&self, bookings: Vec<Booking>) -> Result<usize, EngineError> {
        if bookings.len() > MAX_SNAPSHOT_LEN {
            return Err(EngineError::LimitExceeded("snapshot too large"));
        }

        // Bookings that moved resource leave their old schedule first. One
        // lock at a time, so a concurrent load cannot deadlock with this one.
        let mut moved: HashMap<Ulid, Vec<Ulid>> = HashMap::new();
        for b in &bookings {
            let held_on = self.booking_to_resource.get(&b.id).map(|e| *e.value());
            if let Some(old) = held_on
                && old != b.resource_id
            {
                moved.entry(old).or_default().push(b.id);
            }
        }
        let mut removed = 0;
        for (old, ids) in moved {
            let Some(schedule) = self.schedules.get(&old).map(|e| e.value().clone()) else {
                continue;
            };
            let mut guard = schedule.lock().await;
            let before = guard.len();
            guard.retain(|held| !ids.contains(&held.id));
            removed += before - guard.len();
        }

        let mut by_resource: HashMap<Ulid, Vec<Booking>> = HashMap::new();
        for b in bookings {
            by_resource.entry(b.resource_id).or_default().push(b);
        }

        let mut inserted = 0;
        let result = self.insert_batches(by_resource, &mut inserted).await;

        metrics::gauge!(BOOKINGS_HELD).increment(inserted as f64 - removed as f64);
        result?;
        let loaded = inserted.saturating_sub(removed);
        info!("loaded {loaded} new bookings ({removed} moved between resources)");
        Ok(loaded)
    }

    async fn insert_batches(
        &self,
        by_resource: HashMap<Ulid, Vec<Booking>>,
        inserted: &mut usize,
    ) -> Result<(), EngineError> {
        for (resource_id, batch) in by_resource {
            let schedule = self.schedule(resource_id);
            let mut guard = schedule.lock().await;
            for b in batch {
                if let Some(pos) = guard.iter().position(|held| held.id == b.id) {
                    guard[pos] = b;
                    continue;
                }
                if guard.len() >= MAX_BOOKINGS_PER_RESOURCE {
                    return Err(EngineError::LimitExceeded("too many bookings on resource"));
                }
                self.booking_to_resource.insert(b.id, resource_id);
                guard.push(b);
                *inserted += 1;
            }
        }
        Ok(())
    }

    pub async fn create(&self, request: BookingRequest, now: Ms) -> Result<Booking, EngineError> {
        let resource_id = request.resource_id;
        let schedule = self.schedule(resource_id);
        let mut guard = schedule.lock().await;
        if guard.len() >= MAX_BOOKINGS_PER_RESOURCE {
            return self.record(
                "create",
                Err(EngineError::LimitExceeded("too many bookings on resource")),
            );
        }

        let result = self.service.create(request, &guard, now);
        let booking = self.record("create", result)?;
        guard.push(booking.clone());
        drop(guard);

        self.booking_to_resource.insert(booking.id, resource_id);
        metrics::gauge!(BOOKINGS_HELD).increment(1.0);
        self.notify.send(BookingEvent::Created {
            id: booking.id,
            resource_id,
            pending: booking.status == BookingStatus::Pending,
        });
        Ok(booking)
    }

    pub async fn approve(&self, id: Ulid, now: Ms) -> Result<Booking, EngineError> {
        self.apply(
            id,
            "approve",
            |svc, b, _| svc.approve(b, now),
            |_, next| BookingEvent::Approved {
                id,
                resource_id: next.resource_id,
            },
        )
        .await
    }

    pub async fn cancel(&self, id: Ulid, now: Ms) -> Result<Booking, EngineError> {
        self.apply(
            id,
            "cancel",
            |svc, b, _| svc.cancel(b, now),
            |_, next| BookingEvent::Cancelled {
                id,
                resource_id: next.resource_id,
            },
        )
        .await
    }

    pub async fn reschedule(
        &self,
        id: Ulid,
        new_window: TimeWindow,
        now: Ms,
    ) -> Result<Booking, EngineError> {
        self.apply(
            id,
            "reschedule",
            |svc, b, existing| svc.reschedule(b, new_window, existing, now),
            |prev, next| BookingEvent::Rescheduled {
                id,
                resource_id: next.resource_id,
                from: prev.window,
                to: next.window,
            },
        )
        .await
    }

    pub async fn check_out(&self, id: Ulid, now: Ms) -> Result<Booking, EngineError> {
        self.apply(
            id,
            "check_out",
            |svc, b, _| svc.check_out(b, now),
            |_, next| BookingEvent::CheckedOut {
                id,
                resource_id: next.resource_id,
            },
        )
        .await
    }

    pub async fn return_item(
        &self,
        id: Ulid,
        now: Ms,
        condition: EquipmentCondition,
    ) -> Result<Booking, EngineError> {
        self.apply(
            id,
            "return_item",
            |svc, b, _| svc.return_item(b, now, condition),
            |_, next| BookingEvent::Returned {
                id,
                resource_id: next.resource_id,
            },
        )
        .await
    }

    pub async fn complete(&self, id: Ulid, now: Ms) -> Result<Booking, EngineError> {
        self.apply(
            id,
            "complete",
            |svc, b, _| svc.complete(b, now),
            |_, next| BookingEvent::Completed {
                id,
                resource_id: next.resource_id,
            },
        )
        .await
    }

    pub async fn mark_no_show(&self, id: Ulid, now: Ms) -> Result<Booking, EngineError> {
        self.apply(
            id,
            "mark_no_show",
            |svc, b, _| svc.mark_no_show(b, now),
            |_, next| BookingEvent::NoShow {
                id,
                resource_id: next.resource_id,
            },
        )
        .await
    }

    /// Run the expiry sweep over every resource, store the transitions and
    /// broadcast one event per outcome (including `Overdue`).
    pub async fn sweep(&self, now: Ms) -> Vec<SweepOutcome> {
        let started = std::time::Instant::now();
        let mut all = Vec::new();

        for schedule in self.all_schedules() {
            let mut guard = schedule.lock().await;
            let outcomes = self.service.expire_sweep(&guard, now);
            for outcome in &outcomes {
                if !outcome.changed() {
                    continue;
                }
                if let Some(slot) = guard.iter_mut().find(|b| b.id == outcome.booking.id) {
                    *slot = outcome.booking.clone();
                }
            }
            drop(guard);

            for outcome in &outcomes {
                let id = outcome.booking.id;
                let resource_id = outcome.booking.resource_id;
                metrics::counter!(
                    SWEEP_TRANSITIONS_TOTAL,
                    "disposition" => disposition_label(outcome.disposition)
                )
                .increment(1);
                let event = match outcome.disposition {
                    SweepDisposition::Completed => BookingEvent::Completed { id, resource_id },
                    SweepDisposition::NoShow => BookingEvent::NoShow { id, resource_id },
                    SweepDisposition::Overdue => BookingEvent::Overdue { id, resource_id },
                };
                self.notify.send(event);
            }
            all.extend(outcomes);
        }

        metrics::histogram!(SWEEP_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        all
    }

    /// Broadcast reminders that came due since the last call. Each one goes
    /// out once; a rescheduled booking announces its new start again.
    pub async fn remind(&self, now: Ms) -> Vec<Reminder> {
        self.reminded.retain(|&(_, _, at)| at > now);

        let mut sent = Vec::new();
        for schedule in self.all_schedules() {
            let due = self.service.due_reminders(&schedule.lock().await, now);
            for r in due {
                if !self.reminded.insert((r.booking_id, r.kind, r.at)) {
                    continue;
                }
                metrics::counter!(REMINDERS_TOTAL, "kind" => reminder_label(r.kind)).increment(1);
                let (id, resource_id) = (r.booking_id, r.resource_id);
                self.notify.send(match r.kind {
                    ReminderKind::Starting => BookingEvent::Reminder {
                        id,
                        resource_id,
                        starts_at: r.at,
                    },
                    ReminderKind::EquipmentDue => BookingEvent::Due {
                        id,
                        resource_id,
                        due_at: r.at,
                    },
                });
                sent.push(r);
            }
        }
        sent.sort_by_key(|r| (r.at, r.booking_id));
        sent
    }

    pub async fn get(&self, id: Ulid) -> Result<Booking, EngineError> {
        let (_, guard) = self.resolve(&id).await?;
        guard
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    /// Every booking held for a resource, ordered by window start.
    pub async fn bookings_for(&self, resource_id: Ulid) -> Vec<Booking> {
        let Some(schedule) = self.schedules.get(&resource_id).map(|e| e.value().clone()) else {
            return Vec::new();
        };
        let mut bookings = schedule.lock().await.clone();
        bookings.sort_by_key(|b| b.window.start());
        bookings
    }

    /// A requester's bookings across all resources, most recent start first.
    pub async fn history_for(&self, requester_id: Ulid) -> Vec<Booking> {
        let mut history = Vec::new();
        for schedule in self.all_schedules() {
            let guard = schedule.lock().await;
            history.extend(guard.iter().filter(|b| b.requester_id == requester_id).cloned());
        }
        history.sort_by_key(|b| std::cmp::Reverse(b.window.start()));
        history
    }

    pub async fn day_slots(
        &self,
        resource_id: Ulid,
        operating_hours: &TimeWindow,
    ) -> Result<Vec<DaySlot>, EngineError> {
        let bookings = self.bookings_for(resource_id).await;
        self.service.day_slots(resource_id, operating_hours, &bookings)
    }
}
