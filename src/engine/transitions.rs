use serde::{Deserialize, Serialize};

use crate::model::{BookingStatus, ResourceKind};

use super::EngineError;

/// Everything that can move a booking after it has been created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    Cancel,
    Reschedule,
    CheckOut,
    Return,
    Complete,
    NoShow,
}

/// Status a new booking starts in.
pub fn initial_status(auto_confirm: bool) -> BookingStatus {
    if auto_confirm {
        BookingStatus::Confirmed
    } else {
        BookingStatus::Pending
    }
}

/// The transition table. Guards that depend on time or extras (lead time,
/// checkout state) live in the lifecycle operations, not here.
pub fn next_status(
    kind: ResourceKind,
    from: BookingStatus,
    action: Action,
) -> Result<BookingStatus, EngineError> {
    use BookingStatus::*;

    let equipment = kind == ResourceKind::EquipmentReservation;
    let to = match (from, action) {
        (Pending, Action::Approve) => Some(Confirmed),
        (Pending | Confirmed, Action::Cancel) => Some(Cancelled),
        (Confirmed, Action::Reschedule) => Some(Confirmed),
        (Confirmed, Action::CheckOut) if equipment => Some(Confirmed),
        (Confirmed, Action::Return) if equipment => Some(Completed),
        (Confirmed, Action::Complete) => Some(Completed),
        (Confirmed, Action::NoShow) => Some(NoShow),
        _ => None,
    };
    to.ok_or(EngineError::IllegalTransition { kind, from, action })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: [Action; 7] = [
        Action::Approve,
        Action::Cancel,
        Action::Reschedule,
        Action::CheckOut,
        Action::Return,
        Action::Complete,
        Action::NoShow,
    ];

    #[test]
    fn initial_status_follows_auto_confirm() {
        assert_eq!(initial_status(true), BookingStatus::Confirmed);
        assert_eq!(initial_status(false), BookingStatus::Pending);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for kind in ResourceKind::ALL {
            for from in [
                BookingStatus::Cancelled,
                BookingStatus::Completed,
                BookingStatus::NoShow,
            ] {
                for action in ACTIONS {
                    let err = next_status(kind, from, action).unwrap_err();
                    assert_eq!(err, EngineError::IllegalTransition { kind, from, action });
                }
            }
        }
    }

    #[test]
    fn pending_only_approves_or_cancels() {
        for kind in ResourceKind::ALL {
            assert_eq!(
                next_status(kind, BookingStatus::Pending, Action::Approve),
                Ok(BookingStatus::Confirmed)
            );
            assert_eq!(
                next_status(kind, BookingStatus::Pending, Action::Cancel),
                Ok(BookingStatus::Cancelled)
            );
            for action in [
                Action::Reschedule,
                Action::CheckOut,
                Action::Return,
                Action::Complete,
                Action::NoShow,
            ] {
                assert!(next_status(kind, BookingStatus::Pending, action).is_err());
            }
        }
    }

    #[test]
    fn confirmed_cannot_be_approved_again() {
        for kind in ResourceKind::ALL {
            assert!(next_status(kind, BookingStatus::Confirmed, Action::Approve).is_err());
        }
    }

    #[test]
    fn checkout_and_return_are_equipment_only() {
        let c = BookingStatus::Confirmed;
        assert_eq!(
            next_status(ResourceKind::EquipmentReservation, c, Action::CheckOut),
            Ok(c)
        );
        assert_eq!(
            next_status(ResourceKind::EquipmentReservation, c, Action::Return),
            Ok(BookingStatus::Completed)
        );
        for kind in [ResourceKind::TutorSession, ResourceKind::RoomBooking] {
            assert!(next_status(kind, c, Action::CheckOut).is_err());
            assert!(next_status(kind, c, Action::Return).is_err());
        }
    }

    #[test]
    fn confirmed_exits() {
        for kind in ResourceKind::ALL {
            let c = BookingStatus::Confirmed;
            assert_eq!(next_status(kind, c, Action::Cancel), Ok(BookingStatus::Cancelled));
            assert_eq!(next_status(kind, c, Action::Reschedule), Ok(c));
            assert_eq!(next_status(kind, c, Action::Complete), Ok(BookingStatus::Completed));
            assert_eq!(next_status(kind, c, Action::NoShow), Ok(BookingStatus::NoShow));
        }
    }
}
