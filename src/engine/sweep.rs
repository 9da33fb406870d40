use serde::Serialize;

use crate::model::*;

use super::transitions::{next_status, Action};
use super::LifecycleService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepDisposition {
    Completed,
    NoShow,
    /// Equipment still out past its window. The booking stays Confirmed.
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepOutcome {
    pub booking: Booking,
    pub disposition: SweepDisposition,
}

impl SweepOutcome {
    /// False for `Overdue`: the caller has nothing to persist.
    pub fn changed(&self) -> bool {
        self.disposition != SweepDisposition::Overdue
    }
}

impl LifecycleService {
    /// Resolve confirmed bookings whose window ended before `now`.
    ///
    /// Tutor sessions and rooms are assumed used once started and complete.
    /// Equipment completes only if it came back; if it is still out it is
    /// reported `Overdue` and left Confirmed until `return_item`; if it was
    /// never picked up it is a no-show. Other bookings are not reported.
    pub fn expire_sweep(&self, bookings: &[Booking], now: Ms) -> Vec<SweepOutcome> {
        bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed && b.window.end() < now)
            .filter_map(|b| {
                let disposition = match b.kind() {
                    ResourceKind::TutorSession | ResourceKind::RoomBooking => {
                        SweepDisposition::Completed
                    }
                    ResourceKind::EquipmentReservation => {
                        match (b.checked_out_at(), b.returned_at()) {
                            (_, Some(_)) => SweepDisposition::Completed,
                            (Some(_), None) => SweepDisposition::Overdue,
                            (None, None) => SweepDisposition::NoShow,
                        }
                    }
                };
                let action = match disposition {
                    SweepDisposition::Completed => Action::Complete,
                    SweepDisposition::NoShow => Action::NoShow,
                    SweepDisposition::Overdue => {
                        return Some(SweepOutcome {
                            booking: b.clone(),
                            disposition,
                        });
                    }
                };
                let status = next_status(b.kind(), b.status, action).ok()?;
                Some(SweepOutcome {
                    booking: Booking {
                        status,
                        updated_at: now,
                        ..b.clone()
                    },
                    disposition,
                })
            })
            .collect()
    }
}
