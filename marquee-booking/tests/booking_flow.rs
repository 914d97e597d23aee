//! End-to-end flows through the ticketing engine, including the
//! no-oversell guarantee under concurrent buyers.

use chrono::{Duration, Utc};
use marquee_booking::{BookingError, TicketingEngine, TicketingEvent};
use marquee_catalog::{Seat, SeatCatalog, SeatCategory, Show, ShowSchedule, Venue};
use marquee_core::{
    BookingStatus, CancelReason, Holder, LedgerStore, PaymentResult,
};
use marquee_store::{BusinessRules, MemoryLedger};
use std::sync::Arc;
use uuid::Uuid;

struct Stage {
    engine: TicketingEngine,
    ledger: Arc<MemoryLedger>,
    venue_id: Uuid,
    schedule_id: Uuid,
    seats: Vec<Uuid>,
}

fn stage(seat_count: i32) -> Stage {
    let mut catalog = SeatCatalog::new();
    let venue_id = Uuid::new_v4();
    catalog.add_venue(Venue {
        id: venue_id,
        name: "Integration Hall".to_string(),
        city: None,
    });

    let mut seats = Vec::new();
    for number in 1..=seat_count {
        let seat_id = Uuid::new_v4();
        catalog.add_seat(Seat {
            id: seat_id,
            venue_id,
            row: "A".to_string(),
            number,
            category: SeatCategory::Standard,
        });
        seats.push(seat_id);
    }

    let show_id = Uuid::new_v4();
    catalog.add_show(Show {
        id: show_id,
        title: "Integration Night".to_string(),
    });
    let schedule_id = Uuid::new_v4();
    catalog.add_schedule(ShowSchedule {
        id: schedule_id,
        show_id,
        venue_id,
        starts_at: Utc::now() + Duration::days(1),
    });

    let ledger = Arc::new(MemoryLedger::new());
    let engine = TicketingEngine::with_ledger(
        Arc::new(catalog),
        ledger.clone(),
        &BusinessRules::default(),
    );

    Stage {
        engine,
        ledger,
        venue_id,
        schedule_id,
        seats,
    }
}

// Scenario A: a free seat is held; an immediate rival hold loses with the
// conflicting seat reported.
#[tokio::test]
async fn test_second_hold_conflicts_with_first() {
    let stage = stage(3);
    let s1 = stage.seats[0];

    stage
        .engine
        .coordinator
        .place_hold(&[s1], stage.schedule_id, &Holder::session("alice"), Duration::minutes(5))
        .await
        .unwrap();

    let err = stage
        .engine
        .coordinator
        .place_hold(&[s1], stage.schedule_id, &Holder::session("bob"), Duration::minutes(5))
        .await
        .unwrap_err();

    match err {
        BookingError::SeatUnavailable { conflicting } => assert_eq!(conflicting, vec![s1]),
        other => panic!("expected SeatUnavailable, got {other:?}"),
    }
}

// All-or-nothing: requesting {A, B, C} while B is held creates zero holds.
#[tokio::test]
async fn test_partial_holds_are_never_left_behind() {
    let stage = stage(3);
    let b = stage.seats[1];

    stage
        .engine
        .coordinator
        .place_hold(&[b], stage.schedule_id, &Holder::session("first"), Duration::minutes(5))
        .await
        .unwrap();

    let err = stage
        .engine
        .coordinator
        .place_hold(
            &stage.seats,
            stage.schedule_id,
            &Holder::session("second"),
            Duration::minutes(5),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatUnavailable { .. }));

    // Only the original hold exists; A and C are still sellable.
    let available = stage
        .engine
        .availability
        .available_seats(stage.venue_id, stage.schedule_id)
        .await
        .unwrap();
    assert_eq!(available.len(), 2);
    assert!(available.iter().all(|s| s.id != b));
}

// Scenario B: confirming after the TTL fails; the seat can then be re-held.
#[tokio::test]
async fn test_expired_hold_cannot_confirm_but_seat_recycles() {
    let stage = stage(2);
    let s1 = stage.seats[0];
    let user_id = Uuid::new_v4();
    let t0 = Utc::now() - Duration::minutes(6);

    // A hold placed six minutes ago with a five-minute TTL.
    let held = stage
        .ledger
        .try_hold(
            &[s1],
            stage.schedule_id,
            &Holder::user("alice-sess", user_id),
            t0,
            t0 + Duration::minutes(5),
        )
        .await
        .unwrap();

    let err = stage
        .engine
        .coordinator
        .confirm_booking(
            &[held[0].id],
            user_id,
            stage.schedule_id,
            &PaymentResult::succeeded("tx-late", 4000),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ReservationExpired));

    // The lapsed hold no longer blocks a fresh one.
    let rehold = stage
        .engine
        .coordinator
        .place_hold(&[s1], stage.schedule_id, &Holder::session("carol"), Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(rehold.len(), 1);
}

// Scenario D: cancelling a confirmed booking frees its seats immediately.
#[tokio::test]
async fn test_cancelled_booking_returns_seats_to_pool() {
    let stage = stage(4);
    let picked = &stage.seats[..2];
    let user_id = Uuid::new_v4();
    let holder = Holder::user("dave-sess", user_id);

    let held = stage
        .engine
        .coordinator
        .place_hold(picked, stage.schedule_id, &holder, Duration::minutes(5))
        .await
        .unwrap();
    let ids: Vec<Uuid> = held.iter().map(|r| r.id).collect();

    let booking = stage
        .engine
        .coordinator
        .confirm_booking(
            &ids,
            user_id,
            stage.schedule_id,
            &PaymentResult::succeeded("tx-d", 9000),
        )
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);

    let before = stage
        .engine
        .availability
        .available_seats(stage.venue_id, stage.schedule_id)
        .await
        .unwrap();
    assert_eq!(before.len(), 2);

    let cancelled = stage
        .engine
        .coordinator
        .cancel_booking(booking.id, CancelReason::CustomerRequest)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let after = stage
        .engine
        .availability
        .available_seats(stage.venue_id, stage.schedule_id)
        .await
        .unwrap();
    assert_eq!(after.len(), 4, "both seats reappear immediately");

    // Cancelling again stays a no-op.
    let again = stage
        .engine
        .coordinator
        .cancel_booking(booking.id, CancelReason::CustomerRequest)
        .await
        .unwrap();
    assert_eq!(again.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_refund_reason_marks_booking_refunded() {
    let stage = stage(1);
    let user_id = Uuid::new_v4();
    let holder = Holder::user("erin-sess", user_id);

    let held = stage
        .engine
        .coordinator
        .place_hold(&stage.seats, stage.schedule_id, &holder, Duration::minutes(5))
        .await
        .unwrap();
    let booking = stage
        .engine
        .coordinator
        .confirm_booking(
            &[held[0].id],
            user_id,
            stage.schedule_id,
            &PaymentResult::succeeded("tx-r", 4500),
        )
        .await
        .unwrap();

    let refunded = stage
        .engine
        .coordinator
        .cancel_booking(booking.id, CancelReason::PaymentReversal)
        .await
        .unwrap();
    assert_eq!(refunded.status, BookingStatus::Refunded);
}

#[tokio::test]
async fn test_booking_number_is_a_durable_handle() {
    let stage = stage(2);
    let user_id = Uuid::new_v4();
    let holder = Holder::user("frank-sess", user_id);

    let held = stage
        .engine
        .coordinator
        .place_hold(&stage.seats[..1], stage.schedule_id, &holder, Duration::minutes(5))
        .await
        .unwrap();
    let booking = stage
        .engine
        .coordinator
        .confirm_booking(
            &[held[0].id],
            user_id,
            stage.schedule_id,
            &PaymentResult::succeeded("tx-f", 4000),
        )
        .await
        .unwrap();

    let fetched = stage
        .engine
        .coordinator
        .booking_by_number(&booking.booking_number)
        .await
        .unwrap();
    assert_eq!(fetched.id, booking.id);
    assert_eq!(fetched.seat_ids(), booking.seat_ids());
}

#[tokio::test]
async fn test_confirm_and_cancel_publish_notifications() {
    let stage = stage(2);
    let mut rx = stage.engine.events.subscribe();
    let user_id = Uuid::new_v4();
    let holder = Holder::user("grace-sess", user_id);

    let held = stage
        .engine
        .coordinator
        .place_hold(&stage.seats[..1], stage.schedule_id, &holder, Duration::minutes(5))
        .await
        .unwrap();
    let booking = stage
        .engine
        .coordinator
        .confirm_booking(
            &[held[0].id],
            user_id,
            stage.schedule_id,
            &PaymentResult::succeeded("tx-g", 4000),
        )
        .await
        .unwrap();
    stage
        .engine
        .coordinator
        .cancel_booking(booking.id, CancelReason::PaymentReversal)
        .await
        .unwrap();

    match rx.try_recv().unwrap() {
        TicketingEvent::BookingConfirmed(event) => {
            assert_eq!(event.booking_id, booking.id);
            assert_eq!(event.seat_ids, booking.seat_ids());
        }
        other => panic!("expected BookingConfirmed, got {other:?}"),
    }
    match rx.try_recv().unwrap() {
        TicketingEvent::BookingCancelled(event) => {
            assert_eq!(event.booking_id, booking.id);
            assert!(event.refunded);
        }
        other => panic!("expected BookingCancelled, got {other:?}"),
    }
}

// No-oversell: N concurrent buyers race for one seat; exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_holds_have_exactly_one_winner() {
    let stage = stage(1);
    let seat = stage.seats[0];
    let coordinator = stage.engine.coordinator.clone();

    let mut handles = Vec::new();
    for buyer in 0..16 {
        let coordinator = coordinator.clone();
        let schedule_id = stage.schedule_id;
        handles.push(tokio::spawn(async move {
            coordinator
                .place_hold(
                    &[seat],
                    schedule_id,
                    &Holder::session(format!("buyer-{buyer}")),
                    Duration::minutes(5),
                )
                .await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(BookingError::SeatUnavailable { conflicting }) => {
                assert_eq!(conflicting, vec![seat]);
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners, 1, "exactly one buyer may win the seat");
    assert_eq!(conflicts, 15);
}

// Racing confirms over the same reservations: one booking, one expiry error.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirms_claim_the_seat_once() {
    let stage = stage(1);
    let user_id = Uuid::new_v4();
    let holder = Holder::user("race-sess", user_id);

    let held = stage
        .engine
        .coordinator
        .place_hold(&stage.seats, stage.schedule_id, &holder, Duration::minutes(5))
        .await
        .unwrap();
    let ids: Vec<Uuid> = held.iter().map(|r| r.id).collect();

    let mut handles = Vec::new();
    for attempt in 0..4 {
        let coordinator = stage.engine.coordinator.clone();
        let ids = ids.clone();
        let schedule_id = stage.schedule_id;
        handles.push(tokio::spawn(async move {
            coordinator
                .confirm_booking(
                    &ids,
                    user_id,
                    schedule_id,
                    &PaymentResult::succeeded(format!("tx-race-{attempt}"), 4000),
                )
                .await
        }));
    }

    let mut confirmed = 0;
    let mut expired = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(BookingError::ReservationExpired) => expired += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(confirmed, 1, "the FREE -> CLAIMED transition happens once");
    assert_eq!(expired, 3);
}

// Disjoint seat sets do not contend: every buyer gets their own row.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_disjoint_holds_all_succeed() {
    let stage = stage(16);
    let coordinator = stage.engine.coordinator.clone();

    let mut handles = Vec::new();
    for (buyer, chunk) in stage.seats.chunks(2).enumerate() {
        let coordinator = coordinator.clone();
        let schedule_id = stage.schedule_id;
        let seats = chunk.to_vec();
        handles.push(tokio::spawn(async move {
            coordinator
                .place_hold(
                    &seats,
                    schedule_id,
                    &Holder::session(format!("buyer-{buyer}")),
                    Duration::minutes(5),
                )
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 2);
    }

    let capacity = stage
        .engine
        .availability
        .capacity(stage.venue_id, stage.schedule_id)
        .await
        .unwrap();
    assert_eq!(capacity.available, 0);
    assert_eq!(capacity.reserved, 16);
}
