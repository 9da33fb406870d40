//! The booking policy core: availability, state machine and lifecycle
//! decisions for tutor sessions, study rooms and equipment.
//!
//! Everything here is a pure function of its arguments. Callers that persist
//! the returned bookings must serialize decisions per resource id; two
//! concurrent `create` calls that both see an empty schedule will both
//! succeed. [`crate::desk::BookingDesk`] does this with a per-resource lock.

mod availability;
mod error;
mod lifecycle;
mod reminders;
mod sweep;
mod transitions;

pub use availability::{
    check_conflict, compute_day_slots, free_windows, merge_overlapping, subtract_intervals,
    ConflictResult,
};
pub use error::EngineError;
pub use reminders::{due_reminders, Reminder, ReminderKind};
pub use sweep::{SweepDisposition, SweepOutcome};
pub use transitions::{initial_status, next_status, Action};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// New bookings start Confirmed when set; otherwise Pending until approved.
    pub auto_confirm: bool,
    /// Slot length used by [`LifecycleService::day_slots`].
    pub slot_granularity: Ms,
    /// How far ahead of a start or equipment due time reminders go out.
    pub reminder_lead: Ms,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_confirm: true,
            slot_granularity: 30 * MINUTE,
            reminder_lead: HOUR,
        }
    }
}

/// Entry point for booking decisions. Holds configuration only; every
/// operation takes the state it needs and returns a new `Booking`.
#[derive(Debug, Clone, Default)]
pub struct LifecycleService {
    config: EngineConfig,
}

impl LifecycleService {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Day slots at the configured granularity.
    pub fn day_slots(
        &self,
        resource_id: Ulid,
        operating_hours: &TimeWindow,
        existing: &[Booking],
    ) -> Result<Vec<DaySlot>, EngineError> {
        compute_day_slots(
            resource_id,
            operating_hours,
            existing,
            self.config.slot_granularity,
        )
    }
}
