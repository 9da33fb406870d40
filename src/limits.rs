/// Max bookings a single resource may hold in the desk (live + historical).
pub const MAX_BOOKINGS_PER_RESOURCE: usize = 10_000;

/// Max slots `compute_day_slots` will produce for one query.
pub const MAX_SLOTS_PER_DAY: usize = 1_440;

/// Max length of free-text extras (subject, purpose, notes, meeting link).
pub const MAX_TEXT_LEN: usize = 1_024;

/// Max bookings accepted by a single snapshot load.
pub const MAX_SNAPSHOT_LEN: usize = 1_000_000;
