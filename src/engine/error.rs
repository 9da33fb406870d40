use ulid::Ulid;

use crate::model::{BookingStatus, Ms, ResourceKind};

use super::transitions::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidWindow {
        start: Ms,
        end: Ms,
    },
    DurationOutOfRange {
        kind: ResourceKind,
        duration: Ms,
        min: Option<Ms>,
        max: Ms,
    },
    SlotConflict(Ulid),
    IllegalTransition {
        kind: ResourceKind,
        from: BookingStatus,
        action: Action,
    },
    PastCancellationDeadline {
        /// Latest instant at which the change would have been allowed.
        deadline: Ms,
        now: Ms,
    },
    NotFound(Ulid),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidWindow { start, end } => {
                write!(f, "invalid window [{start}, {end}): end must be after start")
            }
            EngineError::DurationOutOfRange {
                kind,
                duration,
                min,
                max,
            } => match min {
                Some(min) => write!(
                    f,
                    "{} duration {duration}ms outside [{min}ms, {max}ms]",
                    kind.display_name()
                ),
                None => write!(
                    f,
                    "{} duration {duration}ms exceeds {max}ms",
                    kind.display_name()
                ),
            },
            EngineError::SlotConflict(id) => write!(f, "slot conflicts with booking: {id}"),
            EngineError::IllegalTransition { kind, from, action } => write!(
                f,
                "illegal transition: cannot {action:?} a {from:?} {}",
                kind.display_name()
            ),
            EngineError::PastCancellationDeadline { deadline, now } => {
                write!(f, "change deadline {deadline} has passed (now {now})")
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::InvalidWindow { .. } => "invalid_window",
            EngineError::DurationOutOfRange { .. } => "duration_out_of_range",
            EngineError::SlotConflict(_) => "slot_conflict",
            EngineError::IllegalTransition { .. } => "illegal_transition",
            EngineError::PastCancellationDeadline { .. } => "past_cancellation_deadline",
            EngineError::NotFound(_) => "not_found",
            EngineError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}
