use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;

/// Unix milliseconds. Durations are `Ms` too.
pub type Ms = i64;

pub const MINUTE: Ms = 60_000;
pub const HOUR: Ms = 60 * MINUTE;
pub const DAY: Ms = 24 * HOUR;

#[derive(Deserialize)]
struct RawWindow {
    start: Ms,
    end: Ms,
}

/// Half-open interval `[start, end)`. `start < end` always holds, including
/// for values that came in through deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    start: Ms,
    end: Ms,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = EngineError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        TimeWindow::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    pub fn new(start: Ms, end: Ms) -> Result<Self, EngineError> {
        if end <= start {
            return Err(EngineError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// For bounds already known to be ordered (clipping, merging).
    pub(crate) fn from_ordered(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "TimeWindow start must be before end");
        Self { start, end }
    }

    pub fn start(&self) -> Ms {
        self.start
    }

    pub fn end(&self) -> Ms {
        self.end
    }

    /// Saturates at `Ms::MAX` for windows spanning most of the `i64` range.
    pub fn duration(&self) -> Ms {
        self.end.saturating_sub(self.start)
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_window(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    TutorSession,
    RoomBooking,
    EquipmentReservation,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::TutorSession,
        ResourceKind::RoomBooking,
        ResourceKind::EquipmentReservation,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::TutorSession => "Tutor Session",
            ResourceKind::RoomBooking => "Study Room",
            ResourceKind::EquipmentReservation => "Equipment",
        }
    }
}

/// One status vocabulary for every kind. Tutor sessions historically called
/// the active state "scheduled"; that spelling is accepted on input and maps
/// to `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    #[serde(alias = "scheduled")]
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::NoShow
        )
    }

    /// Live bookings hold their window against other requests.
    pub fn is_live(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// Condition reported when an equipment item comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCondition {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Kind-specific extras. The booking's kind is derived from the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingDetails {
    #[serde(rename = "tutor_session")]
    Tutor {
        subject: String,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        meeting_link: Option<String>,
    },
    #[serde(rename = "room_booking")]
    Room {
        attendees: u32,
        #[serde(default)]
        purpose: Option<String>,
    },
    #[serde(rename = "equipment_reservation")]
    Equipment {
        #[serde(default)]
        purpose: Option<String>,
        #[serde(default)]
        checked_out_at: Option<Ms>,
        #[serde(default)]
        returned_at: Option<Ms>,
        #[serde(default)]
        return_condition: Option<EquipmentCondition>,
        #[serde(default)]
        notes: Option<String>,
    },
}

impl BookingDetails {
    pub fn kind(&self) -> ResourceKind {
        match self {
            BookingDetails::Tutor { .. } => ResourceKind::TutorSession,
            BookingDetails::Room { .. } => ResourceKind::RoomBooking,
            BookingDetails::Equipment { .. } => ResourceKind::EquipmentReservation,
        }
    }

    pub fn tutor(subject: impl Into<String>) -> Self {
        BookingDetails::Tutor {
            subject: subject.into(),
            notes: None,
            meeting_link: None,
        }
    }

    pub fn room(attendees: u32) -> Self {
        BookingDetails::Room {
            attendees,
            purpose: None,
        }
    }

    pub fn equipment(purpose: Option<String>) -> Self {
        BookingDetails::Equipment {
            purpose,
            checked_out_at: None,
            returned_at: None,
            return_condition: None,
            notes: None,
        }
    }

    pub(crate) fn text_fields(&self) -> impl Iterator<Item = &str> {
        let fields: [Option<&String>; 3] = match self {
            BookingDetails::Tutor {
                subject,
                notes,
                meeting_link,
            } => [Some(subject), notes.as_ref(), meeting_link.as_ref()],
            BookingDetails::Room { purpose, .. } => [purpose.as_ref(), None, None],
            BookingDetails::Equipment { purpose, notes, .. } => {
                [purpose.as_ref(), notes.as_ref(), None]
            }
        };
        fields.into_iter().flatten().map(String::as_str)
    }
}

/// What a requester asks for. `create` turns it into a `Booking`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub resource_id: Ulid,
    pub requester_id: Ulid,
    pub window: TimeWindow,
    pub details: BookingDetails,
}

/// A booking of any kind. Fields are read-only outside the crate: every
/// change goes through a lifecycle operation, which returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub(crate) id: Ulid,
    pub(crate) resource_id: Ulid,
    pub(crate) requester_id: Ulid,
    pub(crate) window: TimeWindow,
    pub(crate) status: BookingStatus,
    pub(crate) created_at: Ms,
    pub(crate) updated_at: Ms,
    pub(crate) details: BookingDetails,
}

impl Booking {
    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn resource_id(&self) -> Ulid {
        self.resource_id
    }

    pub fn requester_id(&self) -> Ulid {
        self.requester_id
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn created_at(&self) -> Ms {
        self.created_at
    }

    pub fn updated_at(&self) -> Ms {
        self.updated_at
    }

    pub fn details(&self) -> &BookingDetails {
        &self.details
    }

    pub fn kind(&self) -> ResourceKind {
        self.details.kind()
    }

    pub fn checked_out_at(&self) -> Option<Ms> {
        match self.details {
            BookingDetails::Equipment { checked_out_at, .. } => checked_out_at,
            _ => None,
        }
    }

    pub fn returned_at(&self) -> Option<Ms> {
        match self.details {
            BookingDetails::Equipment { returned_at, .. } => returned_at,
            _ => None,
        }
    }
}

/// One bookable slot of a resource's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlot {
    pub window: TimeWindow,
    pub available: bool,
}

#[cfg(test)]
pub(crate) fn window(start: Ms, end: Ms) -> TimeWindow {
    TimeWindow::new(start, end).unwrap()
}
