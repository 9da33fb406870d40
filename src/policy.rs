use serde::Serialize;

use crate::model::*;

/// Per-kind booking rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PolicyRow {
    /// Only tutor sessions enforce a minimum.
    pub min_duration: Option<Ms>,
    pub max_duration: Ms,
    /// Minimum gap between "now" and `window.start` for cancel/reschedule.
    pub cancellation_lead_time: Ms,
}

const TUTOR_SESSION: PolicyRow = PolicyRow {
    min_duration: Some(30 * MINUTE),
    max_duration: 2 * HOUR,
    cancellation_lead_time: 24 * HOUR,
};

const ROOM_BOOKING: PolicyRow = PolicyRow {
    min_duration: None,
    max_duration: 2 * HOUR,
    cancellation_lead_time: HOUR,
};

const EQUIPMENT_RESERVATION: PolicyRow = PolicyRow {
    min_duration: None,
    max_duration: 7 * DAY,
    cancellation_lead_time: HOUR,
};

pub fn policy_for(kind: ResourceKind) -> PolicyRow {
    match kind {
        ResourceKind::TutorSession => TUTOR_SESSION,
        ResourceKind::RoomBooking => ROOM_BOOKING,
        ResourceKind::EquipmentReservation => EQUIPMENT_RESERVATION,
    }
}

impl PolicyRow {
    /// Inclusive on both ends.
    pub fn allows_duration(&self, duration: Ms) -> bool {
        self.min_duration.is_none_or(|min| duration >= min) && duration <= self.max_duration
    }

    /// Inclusive: a window starting exactly `cancellation_lead_time` from now passes.
    pub fn allows_change_at(&self, window: &TimeWindow, now: Ms) -> bool {
        window.start().saturating_sub(now) >= self.cancellation_lead_time
    }
}
