use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::desk::BookingDesk;
use crate::engine::SweepDisposition;
use crate::model::Ms;

pub fn wall_clock_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as Ms)
}

/// Background task that periodically resolves bookings whose window has
/// passed.
pub async fn run_sweeper(desk: Arc<BookingDesk>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        sweep_once(&desk, wall_clock_ms()).await;
    }
}

/// One sweep pass plus reminders, with a log line per resolved booking.
/// Returns how many bookings changed status.
pub async fn sweep_once(desk: &BookingDesk, now: Ms) -> usize {
    for r in desk.remind(now).await {
        info!("reminder for {}: {:?} at {}", r.booking_id, r.kind, r.at);
    }
    let outcomes = desk.sweep(now).await;
    let mut changed = 0;
    for outcome in &outcomes {
        let id = outcome.booking.id();
        match outcome.disposition {
            SweepDisposition::Overdue => info!("equipment reservation {id} is overdue"),
            d => {
                changed += 1;
                info!("swept {id}: {d:?}");
            }
        }
    }
    debug!("sweep at {now}: {} outcomes, {changed} changed", outcomes.len());
    changed
}
