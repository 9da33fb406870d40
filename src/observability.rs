use std::net::SocketAddr;

use crate::engine::{ReminderKind, SweepDisposition};

// ── Decisions ───────────────────────────────────────────────────

/// Counter: lifecycle decisions made. Labels: operation, outcome.
pub const DECISIONS_TOTAL: &str = "campusbook_decisions_total";

/// Counter: rejected decisions by error kind. Labels: operation, reason.
pub const REJECTIONS_TOTAL: &str = "campusbook_rejections_total";

// ── Sweep ───────────────────────────────────────────────────────

/// Counter: bookings resolved by the sweep. Labels: disposition.
pub const SWEEP_TRANSITIONS_TOTAL: &str = "campusbook_sweep_transitions_total";

/// Histogram: time spent in one sweep pass, seconds.
pub const SWEEP_DURATION_SECONDS: &str = "campusbook_sweep_duration_seconds";

/// Counter: reminders sent. Labels: kind.
pub const REMINDERS_TOTAL: &str = "campusbook_reminders_total";

// ── State ───────────────────────────────────────────────────────

/// Gauge: bookings currently held by the desk (all statuses).
pub const BOOKINGS_HELD: &str = "campusbook_bookings_held";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

pub fn disposition_label(disposition: SweepDisposition) -> &'static str {
    match disposition {
        SweepDisposition::Completed => "completed",
        SweepDisposition::NoShow => "no_show",
        SweepDisposition::Overdue => "overdue",
    }
}

pub fn reminder_label(kind: ReminderKind) -> &'static str {
    match kind {
        ReminderKind::Starting => "starting",
        ReminderKind::EquipmentDue => "equipment_due",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_without_port_is_noop() {
        assert!(init(None).is_ok());
    }

    #[test]
    fn disposition_labels() {
        assert_eq!(disposition_label(SweepDisposition::Completed), "completed");
        assert_eq!(disposition_label(SweepDisposition::NoShow), "no_show");
        assert_eq!(disposition_label(SweepDisposition::Overdue), "overdue");
        assert_eq!(reminder_label(ReminderKind::EquipmentDue), "equipment_due");
    }
}
