use serde::Serialize;
use ulid::Ulid;

use crate::limits::MAX_SLOTS_PER_DAY;
use crate::model::*;

use super::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ConflictResult {
    NoConflict,
    /// The earliest-starting live booking that overlaps the candidate.
    Conflict { booking_id: Ulid },
}

impl ConflictResult {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConflictResult::Conflict { .. })
    }
}

/// Live bookings on `resource_id`, minus `exclude`. Only these can block.
fn live_on<'a>(
    resource_id: Ulid,
    existing: &'a [Booking],
    exclude: Option<Ulid>,
) -> impl Iterator<Item = &'a Booking> {
    existing.iter().filter(move |b| {
        b.resource_id == resource_id && b.status.is_live() && Some(b.id) != exclude
    })
}

/// Does `candidate` collide with a live booking on the same resource?
/// Cancelled, completed and no-show bookings never block, and bookings on
/// other resources are ignored. `exclude` lets a reschedule skip itself.
pub fn check_conflict(
    resource_id: Ulid,
    candidate: &TimeWindow,
    existing: &[Booking],
    exclude: Option<Ulid>,
) -> ConflictResult {
    live_on(resource_id, existing, exclude)
        .filter(|b| b.window.overlaps(candidate))
        .min_by_key(|b| (b.window.start(), b.id))
        .map_or(ConflictResult::NoConflict, |b| ConflictResult::Conflict {
            booking_id: b.id,
        })
}

/// Merged busy windows of live bookings, clipped to `query`.
fn busy_windows(resource_id: Ulid, query: &TimeWindow, existing: &[Booking]) -> Vec<TimeWindow> {
    let mut busy: Vec<TimeWindow> = live_on(resource_id, existing, None)
        .filter(|b| b.window.overlaps(query))
        .map(|b| {
            TimeWindow::from_ordered(
                b.window.start().max(query.start()),
                b.window.end().min(query.end()),
            )
        })
        .collect();
    busy.sort_by_key(|w| w.start());
    merge_overlapping(&busy)
}

/// Split `operating_hours` into `granularity`-sized slots and flag each one.
/// The last slot is clipped to the end of operating hours.
pub fn compute_day_slots(
    resource_id: Ulid,
    operating_hours: &TimeWindow,
    existing: &[Booking],
    granularity: Ms,
) -> Result<Vec<DaySlot>, EngineError> {
    if granularity <= 0 {
        return Err(EngineError::LimitExceeded("slot granularity must be positive"));
    }
    let duration = operating_hours.duration();
    let count = duration / granularity + Ms::from(duration % granularity != 0);
    if count > MAX_SLOTS_PER_DAY as Ms {
        return Err(EngineError::LimitExceeded("too many slots in day"));
    }

    let busy = busy_windows(resource_id, operating_hours, existing);
    let mut slots = Vec::with_capacity(count as usize);
    let mut bi = 0;
    let mut start = operating_hours.start();

    while start < operating_hours.end() {
        let end = start.saturating_add(granularity).min(operating_hours.end());
        let slot = TimeWindow::from_ordered(start, end);

        // Both sequences are sorted; skip busy windows entirely before this slot.
        while bi < busy.len() && busy[bi].end() <= start {
            bi += 1;
        }
        let available = busy.get(bi).is_none_or(|b| !b.overlaps(&slot));
        slots.push(DaySlot { window: slot, available });
        start = end;
    }

    Ok(slots)
}

/// Maximal free sub-windows of `operating_hours`.
pub fn free_windows(
    resource_id: Ulid,
    operating_hours: &TimeWindow,
    existing: &[Booking],
) -> Vec<TimeWindow> {
    let busy = busy_windows(resource_id, operating_hours, existing);
    subtract_intervals(&[*operating_hours], &busy)
}

/// Merge sorted overlapping/adjacent windows into disjoint windows.
pub fn merge_overlapping(sorted: &[TimeWindow]) -> Vec<TimeWindow> {
    let mut merged: Vec<TimeWindow> = Vec::new();
    for &w in sorted {
        if let Some(last) = merged.last_mut()
            && w.start() <= last.end() {
                *last = TimeWindow::from_ordered(last.start(), last.end().max(w.end()));
                continue;
            }
        merged.push(w);
    }
    merged
}

pub fn subtract_intervals(base: &[TimeWindow], to_remove: &[TimeWindow]) -> Vec<TimeWindow> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start();
        let current_end = b.end();

        while ri < to_remove.len() && to_remove[ri].end() <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start() < current_end {
            let r = &to_remove[j];
            if r.start() > current_start {
                result.push(TimeWindow::from_ordered(current_start, r.start()));
            }
            current_start = current_start.max(r.end());
            j += 1;
        }

        if current_start < current_end {
            result.push(TimeWindow::from_ordered(current_start, current_end));
        }
    }

    result
}
