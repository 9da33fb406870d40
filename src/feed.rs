//! Read-side projection of bookings for history lists and dashboards.
//! Nothing here mutates a booking; the action flags answer "would the
//! engine accept this right now" without building the result.

use serde::Serialize;
use ulid::Ulid;

use crate::engine::{next_status, Action};
use crate::model::*;
use crate::policy::policy_for;

/// One row of a requester's unified booking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingCard {
    pub id: Ulid,
    pub kind: ResourceKind,
    pub title: &'static str,
    pub subtitle: String,
    pub window: TimeWindow,
    pub status: BookingStatus,
    pub status_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BookingSummary {
    pub upcoming_count: usize,
    pub completed_count: usize,
    pub cancelled_count: usize,
    /// Upcoming bookings, soonest first.
    pub upcoming: Vec<BookingCard>,
}

pub fn status_label(kind: ResourceKind, status: BookingStatus) -> &'static str {
    match (kind, status) {
        (ResourceKind::TutorSession, BookingStatus::Confirmed) => "Scheduled",
        (_, BookingStatus::Pending) => "Pending",
        (_, BookingStatus::Confirmed) => "Confirmed",
        (_, BookingStatus::Cancelled) => "Cancelled",
        (_, BookingStatus::Completed) => "Completed",
        (_, BookingStatus::NoShow) => "No Show",
    }
}

fn subtitle(details: &BookingDetails) -> String {
    match details {
        BookingDetails::Tutor { subject, .. } => subject.clone(),
        BookingDetails::Room { attendees, purpose } => {
            let people = if *attendees == 1 {
                "1 attendee".to_string()
            } else {
                format!("{attendees} attendees")
            };
            match purpose {
                Some(p) => format!("{people} · {p}"),
                None => people,
            }
        }
        BookingDetails::Equipment { purpose, .. } => purpose
            .clone()
            .unwrap_or_else(|| "Equipment reservation".to_string()),
    }
}

pub fn project(booking: &Booking) -> BookingCard {
    let kind = booking.kind();
    BookingCard {
        id: booking.id,
        kind,
        title: kind.display_name(),
        subtitle: subtitle(&booking.details),
        window: booking.window,
        status: booking.status,
        status_label: status_label(kind, booking.status),
    }
}

// ── Flags ───────────────────────────────────────────────────────

pub fn is_upcoming(booking: &Booking, now: Ms) -> bool {
    booking.status == BookingStatus::Confirmed && booking.window.start() > now
}

pub fn is_past(booking: &Booking, now: Ms) -> bool {
    booking.window.end() < now
}

pub fn is_overdue(booking: &Booking, now: Ms) -> bool {
    booking.kind() == ResourceKind::EquipmentReservation
        && booking.status == BookingStatus::Confirmed
        && booking.window.end() < now
        && booking.returned_at().is_none()
}

/// Equipment currently in the requester's hands.
pub fn is_active(booking: &Booking) -> bool {
    booking.kind() == ResourceKind::EquipmentReservation
        && booking.status == BookingStatus::Confirmed
        && booking.checked_out_at().is_some()
        && booking.returned_at().is_none()
}

fn allowed(booking: &Booking, action: Action) -> bool {
    next_status(booking.kind(), booking.status, action).is_ok()
}

pub fn can_cancel(booking: &Booking, now: Ms) -> bool {
    allowed(booking, Action::Cancel)
        && policy_for(booking.kind()).allows_change_at(&booking.window, now)
}

pub fn can_reschedule(booking: &Booking, now: Ms) -> bool {
    allowed(booking, Action::Reschedule)
        && booking.checked_out_at().is_none()
        && policy_for(booking.kind()).allows_change_at(&booking.window, now)
}

pub fn can_return(booking: &Booking) -> bool {
    allowed(booking, Action::Return)
        && booking.checked_out_at().is_some()
        && booking.returned_at().is_none()
}

pub fn summarize(bookings: &[Booking], now: Ms) -> BookingSummary {
    let mut upcoming: Vec<&Booking> = bookings.iter().filter(|b| is_upcoming(b, now)).collect();
    upcoming.sort_by_key(|b| (b.window.start(), b.id));

    BookingSummary {
        upcoming_count: upcoming.len(),
        completed_count: bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Completed)
            .count(),
        cancelled_count: bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Cancelled)
            .count(),
        upcoming: upcoming.into_iter().map(project).collect(),
    }
}
