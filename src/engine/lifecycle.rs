use ulid::Ulid;

use crate::limits::MAX_TEXT_LEN;
use crate::model::*;
use crate::policy::policy_for;

use super::availability::{check_conflict, ConflictResult};
use super::transitions::{initial_status, next_status, Action};
use super::{EngineError, LifecycleService};

fn validate_text(details: &BookingDetails) -> Result<(), EngineError> {
    if details.text_fields().any(|t| t.len() > MAX_TEXT_LEN) {
        return Err(EngineError::LimitExceeded("text field too long"));
    }
    Ok(())
}

fn validate_duration(kind: ResourceKind, window: &TimeWindow) -> Result<(), EngineError> {
    let policy = policy_for(kind);
    if !policy.allows_duration(window.duration()) {
        return Err(EngineError::DurationOutOfRange {
            kind,
            duration: window.duration(),
            min: policy.min_duration,
            max: policy.max_duration,
        });
    }
    Ok(())
}

/// Lead time is measured against the window the booking currently holds.
fn require_lead_time(booking: &Booking, now: Ms) -> Result<(), EngineError> {
    let policy = policy_for(booking.kind());
    if !policy.allows_change_at(&booking.window, now) {
        return Err(EngineError::PastCancellationDeadline {
            deadline: booking.window.start().saturating_sub(policy.cancellation_lead_time),
            now,
        });
    }
    Ok(())
}

fn ensure_free(
    resource_id: Ulid,
    window: &TimeWindow,
    existing: &[Booking],
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    match check_conflict(resource_id, window, existing, exclude) {
        ConflictResult::NoConflict => Ok(()),
        ConflictResult::Conflict { booking_id } => Err(EngineError::SlotConflict(booking_id)),
    }
}

fn illegal(booking: &Booking, action: Action) -> EngineError {
    EngineError::IllegalTransition {
        kind: booking.kind(),
        from: booking.status,
        action,
    }
}

fn transitioned(booking: &Booking, status: BookingStatus, now: Ms) -> Booking {
    Booking {
        status,
        updated_at: now,
        ..booking.clone()
    }
}

/// Checkout/return state is set by operations, never by the requester.
fn fresh_details(details: BookingDetails) -> BookingDetails {
    match details {
        BookingDetails::Equipment { purpose, notes, .. } => BookingDetails::Equipment {
            purpose,
            checked_out_at: None,
            returned_at: None,
            return_condition: None,
            notes,
        },
        other => other,
    }
}

impl LifecycleService {
    /// Validate and create a booking. `existing` is the current booking set
    /// for the resource; entries for other resources are ignored.
    pub fn create(
        &self,
        request: BookingRequest,
        existing: &[Booking],
        now: Ms,
    ) -> Result<Booking, EngineError> {
        validate_text(&request.details)?;
        validate_duration(request.details.kind(), &request.window)?;
        ensure_free(request.resource_id, &request.window, existing, None)?;

        Ok(Booking {
            id: Ulid::new(),
            resource_id: request.resource_id,
            requester_id: request.requester_id,
            window: request.window,
            status: initial_status(self.config.auto_confirm),
            created_at: now,
            updated_at: now,
            details: fresh_details(request.details),
        })
    }

    /// Pending → Confirmed. Refused once the window has ended.
    pub fn approve(&self, booking: &Booking, now: Ms) -> Result<Booking, EngineError> {
        let to = next_status(booking.kind(), booking.status, Action::Approve)?;
        if now >= booking.window.end() {
            return Err(illegal(booking, Action::Approve));
        }
        Ok(transitioned(booking, to, now))
    }

    pub fn cancel(&self, booking: &Booking, now: Ms) -> Result<Booking, EngineError> {
        let to = next_status(booking.kind(), booking.status, Action::Cancel)?;
        require_lead_time(booking, now)?;
        Ok(transitioned(booking, to, now))
    }

    /// Move a confirmed booking to `new_window` on the same resource, keeping
    /// its id. Checks run in order: lead time, duration, conflict.
    pub fn reschedule(
        &self,
        booking: &Booking,
        new_window: TimeWindow,
        existing: &[Booking],
        now: Ms,
    ) -> Result<Booking, EngineError> {
        let to = next_status(booking.kind(), booking.status, Action::Reschedule)?;
        if booking.checked_out_at().is_some() {
            return Err(illegal(booking, Action::Reschedule));
        }
        require_lead_time(booking, now)?;
        validate_duration(booking.kind(), &new_window)?;
        ensure_free(booking.resource_id, &new_window, existing, Some(booking.id))?;

        Ok(Booking {
            window: new_window,
            ..transitioned(booking, to, now)
        })
    }

    /// Hand equipment to the requester. Once the reservation window has
    /// ended it can no longer be picked up.
    pub fn check_out(&self, reservation: &Booking, now: Ms) -> Result<Booking, EngineError> {
        let to = next_status(reservation.kind(), reservation.status, Action::CheckOut)?;
        if reservation.checked_out_at().is_some() || now >= reservation.window.end() {
            return Err(illegal(reservation, Action::CheckOut));
        }
        let mut next = transitioned(reservation, to, now);
        if let BookingDetails::Equipment { checked_out_at, .. } = &mut next.details {
            *checked_out_at = Some(now);
        }
        Ok(next)
    }

    /// Take equipment back. Always completes the reservation.
    pub fn return_item(
        &self,
        reservation: &Booking,
        now: Ms,
        condition: EquipmentCondition,
    ) -> Result<Booking, EngineError> {
        let to = next_status(reservation.kind(), reservation.status, Action::Return)?;
        if reservation.checked_out_at().is_none() || reservation.returned_at().is_some() {
            return Err(illegal(reservation, Action::Return));
        }
        let mut next = transitioned(reservation, to, now);
        if let BookingDetails::Equipment {
            returned_at,
            return_condition,
            ..
        } = &mut next.details
        {
            *returned_at = Some(now);
            *return_condition = Some(condition);
        }
        Ok(next)
    }

    /// Mark a started booking as used. Equipment completes through
    /// `return_item`; here it additionally needs a recorded return.
    pub fn complete(&self, booking: &Booking, now: Ms) -> Result<Booking, EngineError> {
        let to = next_status(booking.kind(), booking.status, Action::Complete)?;
        let unreturned =
            booking.kind() == ResourceKind::EquipmentReservation && booking.returned_at().is_none();
        if now < booking.window.start() || unreturned {
            return Err(illegal(booking, Action::Complete));
        }
        Ok(transitioned(booking, to, now))
    }

    /// Record that the requester never showed up. Equipment that was picked
    /// up is overdue, not a no-show.
    pub fn mark_no_show(&self, booking: &Booking, now: Ms) -> Result<Booking, EngineError> {
        let to = next_status(booking.kind(), booking.status, Action::NoShow)?;
        if now < booking.window.start() || booking.checked_out_at().is_some() {
            return Err(illegal(booking, Action::NoShow));
        }
        Ok(transitioned(booking, to, now))
    }
}
