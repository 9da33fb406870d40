use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use ulid::Ulid;

use campusbook::desk::BookingDesk;
use campusbook::engine::{EngineConfig, EngineError, LifecycleService, SweepDisposition};
use campusbook::feed;
use campusbook::model::*;
use campusbook::notify::{BookingEvent, NotifyHub};

// ── Test infrastructure ──────────────────────────────────────

const T0: Ms = 20_000 * DAY;

fn start_desk(auto_confirm: bool) -> Arc<BookingDesk> {
    let service = LifecycleService::new(EngineConfig {
        auto_confirm,
        ..EngineConfig::default()
    });
    Arc::new(BookingDesk::new(service, Arc::new(NotifyHub::new())))
}

async fn recv_event(rx: &mut broadcast::Receiver<BookingEvent>) -> BookingEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

fn request(resource_id: Ulid, start: Ms, end: Ms, details: BookingDetails) -> BookingRequest {
    BookingRequest {
        resource_id,
        requester_id: Ulid::new(),
        window: TimeWindow::new(start, end).unwrap(),
        details,
    }
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_creates_across_resources() {
    let desk = start_desk(true);
    let resources: Vec<Ulid> = (0..4).map(|_| Ulid::new()).collect();

    let mut handles = Vec::new();
    for _ in 0..8 {
        for &rid in &resources {
            let desk = desk.clone();
            handles.push(tokio::spawn(async move {
                desk.create(
                    request(rid, T0 + 10 * HOUR, T0 + 11 * HOUR, BookingDetails::room(3)),
                    T0,
                )
                .await
            }));
        }
    }

    let mut created = 0;
    let mut conflicts = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => created += 1,
            Err(EngineError::SlotConflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(created, resources.len());
    assert_eq!(conflicts, 7 * resources.len());
    for rid in resources {
        assert_eq!(desk.bookings_for(rid).await.len(), 1);
    }
}

#[tokio::test]
async fn tutor_session_lifecycle_events() {
    let desk = start_desk(false);
    let tutor = Ulid::new();
    let mut rx = desk.notify.subscribe(tutor);
    let start = T0 + 3 * DAY;

    let b = desk
        .create(
            request(tutor, start, start + HOUR, BookingDetails::tutor("Organic chemistry")),
            T0,
        )
        .await
        .unwrap();
    assert_eq!(
        recv_event(&mut rx).await,
        BookingEvent::Created {
            id: b.id(),
            resource_id: tutor,
            pending: true
        }
    );

    desk.approve(b.id(), T0).await.unwrap();
    assert!(matches!(recv_event(&mut rx).await, BookingEvent::Approved { .. }));

    let to = TimeWindow::new(start + DAY, start + DAY + 90 * MINUTE).unwrap();
    desk.reschedule(b.id(), to, T0).await.unwrap();
    let event = recv_event(&mut rx).await;
    let payload: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(payload["event"], "rescheduled");
    assert_eq!(payload["to"]["start"], start + DAY);

    // Inside the 24h window measured against the new start.
    let late = start + DAY - 23 * HOUR;
    let err = desk.cancel(b.id(), late).await.unwrap_err();
    assert!(matches!(err, EngineError::PastCancellationDeadline { .. }));
    assert!(rx.try_recv().is_err());

    let done = desk.complete(b.id(), start + DAY + HOUR).await.unwrap();
    assert_eq!(done.status(), BookingStatus::Completed);
    assert!(matches!(recv_event(&mut rx).await, BookingEvent::Completed { .. }));
}

#[tokio::test]
async fn equipment_overdue_then_returned() {
    let desk = start_desk(true);
    let camera = Ulid::new();
    let mut rx = desk.notify.subscribe(camera);

    let b = desk
        .create(
            request(camera, T0, T0 + 2 * DAY, BookingDetails::equipment(Some("Film club".into()))),
            T0 - DAY,
        )
        .await
        .unwrap();
    let _created = recv_event(&mut rx).await;
    desk.check_out(b.id(), T0 + HOUR).await.unwrap();
    let _checked_out = recv_event(&mut rx).await;

    let outcomes = desk.sweep(T0 + 3 * DAY).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].disposition, SweepDisposition::Overdue);
    assert!(matches!(recv_event(&mut rx).await, BookingEvent::Overdue { .. }));
    let held = desk.get(b.id()).await.unwrap();
    assert!(feed::is_overdue(&held, T0 + 3 * DAY));
    assert!(feed::can_return(&held));

    desk.return_item(b.id(), T0 + 3 * DAY, EquipmentCondition::Poor)
        .await
        .unwrap();
    assert!(matches!(recv_event(&mut rx).await, BookingEvent::Returned { .. }));
    assert!(desk.sweep(T0 + 4 * DAY).await.is_empty());
}

#[tokio::test]
async fn snapshot_load_and_sweep() {
    let desk = start_desk(true);
    let room = Ulid::new();
    let kit = Ulid::new();
    let student = Ulid::new();
    let room_booking = Ulid::new();
    let kit_booking = Ulid::new();

    let snapshot = serde_json::json!([
        {
            "id": room_booking,
            "resource_id": room,
            "requester_id": student,
            "window": { "start": T0, "end": T0 + HOUR },
            "status": "confirmed",
            "created_at": T0 - DAY,
            "updated_at": T0 - DAY,
            "details": { "kind": "room_booking", "attendees": 1 }
        },
        {
            "id": kit_booking,
            "resource_id": kit,
            "requester_id": student,
            "window": { "start": T0, "end": T0 + DAY },
            "status": "confirmed",
            "created_at": T0 - DAY,
            "updated_at": T0 - DAY,
            "details": { "kind": "equipment_reservation" }
        }
    ]);
    let bookings: Vec<Booking> = serde_json::from_value(snapshot).unwrap();
    assert_eq!(desk.load(bookings).await.unwrap(), 2);

    let mut outcomes = desk.sweep(T0 + 2 * DAY).await;
    outcomes.sort_by_key(|o| o.booking.id());
    let mut expected = vec![
        (room_booking, SweepDisposition::Completed),
        (kit_booking, SweepDisposition::NoShow),
    ];
    expected.sort_by_key(|e| e.0);
    let got: Vec<_> = outcomes
        .iter()
        .map(|o| (o.booking.id(), o.disposition))
        .collect();
    assert_eq!(got, expected);

    let history = desk.history_for(student).await;
    let summary = feed::summarize(&history, T0 + 2 * DAY);
    assert_eq!(summary.completed_count, 1);
    assert_eq!(summary.upcoming_count, 0);
}

#[test]
fn legacy_scheduled_status_is_confirmed() {
    let raw = serde_json::json!({
        "id": Ulid::new(),
        "resource_id": Ulid::new(),
        "requester_id": Ulid::new(),
        "window": { "start": T0, "end": T0 + HOUR },
        "status": "scheduled",
        "created_at": T0,
        "updated_at": T0,
        "details": { "kind": "tutor_session", "subject": "History" }
    });
    let b: Booking = serde_json::from_value(raw).unwrap();
    assert_eq!(b.status(), BookingStatus::Confirmed);
    assert_eq!(feed::project(&b).status_label, "Scheduled");
}

#[test]
fn inverted_window_rejected_on_input() {
    let raw = serde_json::json!({ "start": T0 + HOUR, "end": T0 });
    assert!(serde_json::from_value::<TimeWindow>(raw).is_err());
}
