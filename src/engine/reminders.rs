use serde::Serialize;
use ulid::Ulid;

use crate::model::*;

use super::LifecycleService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// A confirmed booking is about to start.
    Starting,
    /// Checked-out equipment is about to be due back.
    EquipmentDue,
}

/// A heads-up for one booking. `at` is the instant being announced (window
/// start for `Starting`, window end for `EquipmentDue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Reminder {
    pub booking_id: Ulid,
    pub resource_id: Ulid,
    pub kind: ReminderKind,
    pub at: Ms,
}

fn within(at: Ms, now: Ms, lead: Ms) -> bool {
    now < at && at.saturating_sub(now) <= lead
}

/// Reminders whose announced instant lies in `(now, now + lead]`, soonest
/// first. Callers that poll are responsible for not repeating one.
pub fn due_reminders(bookings: &[Booking], now: Ms, lead: Ms) -> Vec<Reminder> {
    let mut due: Vec<Reminder> = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .filter_map(|b| {
            let kind = if within(b.window.start(), now, lead) {
                ReminderKind::Starting
            } else if b.checked_out_at().is_some()
                && b.returned_at().is_none()
                && within(b.window.end(), now, lead)
            {
                ReminderKind::EquipmentDue
            } else {
                return None;
            };
            let at = match kind {
                ReminderKind::Starting => b.window.start(),
                ReminderKind::EquipmentDue => b.window.end(),
            };
            Some(Reminder {
                booking_id: b.id,
                resource_id: b.resource_id,
                kind,
                at,
            })
        })
        .collect();
    due.sort_by_key(|r| (r.at, r.booking_id));
    due
}

impl LifecycleService {
    /// `due_reminders` with the configured lead.
    pub fn due_reminders(&self, bookings: &[Booking], now: Ms) -> Vec<Reminder> {
        due_reminders(bookings, now, self.config.reminder_lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::window as w;

    const T0: Ms = 20_000 * DAY;

    fn booking(start: Ms, end: Ms, status: BookingStatus, details: BookingDetails) -> Booking {
        Booking {
            id: Ulid::new(),
            resource_id: Ulid::new(),
            requester_id: Ulid::new(),
            window: w(start, end),
            status,
            created_at: 0,
            updated_at: 0,
            details,
        }
    }

    fn checked_out(start: Ms, end: Ms, at: Ms) -> Booking {
        let mut b = booking(start, end, BookingStatus::Confirmed, BookingDetails::equipment(None));
        if let BookingDetails::Equipment { checked_out_at, .. } = &mut b.details {
            *checked_out_at = Some(at);
        }
        b
    }

    #[test]
    fn starting_within_lead_inclusive() {
        let room = BookingDetails::room(2);
        let exact = booking(T0 + HOUR, T0 + 2 * HOUR, BookingStatus::Confirmed, room.clone());
        let later = booking(T0 + HOUR + 1, T0 + 2 * HOUR, BookingStatus::Confirmed, room.clone());
        let started = booking(T0, T0 + HOUR, BookingStatus::Confirmed, room);

        let due = due_reminders(&[later, exact.clone(), started], T0, HOUR);
        assert_eq!(
            due,
            vec![Reminder {
                booking_id: exact.id,
                resource_id: exact.resource_id,
                kind: ReminderKind::Starting,
                at: T0 + HOUR,
            }]
        );
    }

    #[test]
    fn only_confirmed_bookings_are_reminded() {
        let tutor = BookingDetails::tutor("Statistics");
        let pending = booking(T0 + MINUTE, T0 + HOUR, BookingStatus::Pending, tutor.clone());
        let cancelled = booking(T0 + MINUTE, T0 + HOUR, BookingStatus::Cancelled, tutor);
        assert!(due_reminders(&[pending, cancelled], T0, HOUR).is_empty());
    }

    #[test]
    fn equipment_due_only_while_out() {
        let out = checked_out(T0 - DAY, T0 + 30 * MINUTE, T0 - DAY);
        let due = due_reminders(std::slice::from_ref(&out), T0, HOUR);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, ReminderKind::EquipmentDue);
        assert_eq!(due[0].at, T0 + 30 * MINUTE);

        let never_collected = booking(
            T0 - DAY,
            T0 + 30 * MINUTE,
            BookingStatus::Confirmed,
            BookingDetails::equipment(None),
        );
        assert!(due_reminders(&[never_collected], T0, HOUR).is_empty());
        // Once past the end it is overdue, not due.
        assert!(due_reminders(&[out], T0 + HOUR, HOUR).is_empty());
    }

    #[test]
    fn sorted_soonest_first_and_saturating() {
        let room = BookingDetails::room(1);
        let b = booking(T0 + 40 * MINUTE, T0 + HOUR, BookingStatus::Confirmed, room.clone());
        let a = booking(T0 + 10 * MINUTE, T0 + HOUR, BookingStatus::Confirmed, room.clone());
        let due = due_reminders(&[b.clone(), a.clone()], T0, HOUR);
        let ids: Vec<Ulid> = due.iter().map(|r| r.booking_id).collect();
        assert_eq!(ids, vec![a.id, b.id]);

        let far = booking(Ms::MAX - HOUR, Ms::MAX, BookingStatus::Confirmed, room);
        assert!(due_reminders(&[far], Ms::MIN, HOUR).is_empty());
    }

    #[test]
    fn service_uses_configured_lead() {
        let svc = LifecycleService::default();
        let soon = booking(
            T0 + 50 * MINUTE,
            T0 + 2 * HOUR,
            BookingStatus::Confirmed,
            BookingDetails::room(1),
        );
        assert_eq!(svc.due_reminders(std::slice::from_ref(&soon), T0).len(), 1);
        assert!(svc.due_reminders(&[soon], T0 - HOUR).is_empty());
    }
}
