//! Postgres ledger integration tests. They need a real database and run
//! only when DATABASE_URL is set, e.g.
//! `DATABASE_URL=postgres://localhost/marquee_test cargo test -p marquee-store`

use chrono::{Duration, Utc};
use marquee_core::{BookingDraft, BookingStatus, Holder, LedgerError, LedgerStore};
use marquee_store::{DbClient, PgLedger};
use uuid::Uuid;

async fn connect() -> Option<PgLedger> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping Postgres ledger tests");
            return None;
        }
    };

    let db = DbClient::new(&url).await.expect("connect to test database");
    db.migrate().await.expect("run migrations");
    Some(PgLedger::new(db.pool.clone()))
}

#[tokio::test]
async fn test_hold_confirm_cancel_round_trip() {
    let Some(ledger) = connect().await else { return };

    let schedule_id = Uuid::new_v4();
    let seats = [Uuid::new_v4(), Uuid::new_v4()];
    let user_id = Uuid::new_v4();
    let holder = Holder::user("pg-sess", user_id);
    let now = Utc::now();

    let held = ledger
        .try_hold(&seats, schedule_id, &holder, now, now + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(held.len(), 2);

    // A rival hold on the same seats loses deterministically.
    let err = ledger
        .try_hold(
            &seats[..1],
            schedule_id,
            &Holder::session("rival"),
            now,
            now + Duration::minutes(5),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    let ids: Vec<Uuid> = held.iter().map(|r| r.id).collect();
    let number = format!("PGT-{}", Uuid::new_v4().simple());
    let booking = ledger
        .promote(
            &ids,
            user_id,
            BookingDraft {
                booking_number: number.clone(),
                schedule_id,
                status: BookingStatus::Confirmed,
                total_amount: 9000,
                currency: "USD".to_string(),
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(booking.seat_ids(), seats.to_vec());

    let claims = ledger.claims(schedule_id, now).await.unwrap();
    assert!(claims.held.is_empty());
    assert_eq!(claims.booked.len(), 2);

    let fetched = ledger.booking_by_number(&number).await.unwrap().unwrap();
    assert_eq!(fetched.id, booking.id);

    let cancelled = ledger
        .update_booking_status(booking.id, BookingStatus::Cancelled, now)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let claims = ledger.claims(schedule_id, now).await.unwrap();
    assert!(claims.booked.is_empty());
}

#[tokio::test]
async fn test_sweep_reclaims_expired_rows() {
    let Some(ledger) = connect().await else { return };

    let schedule_id = Uuid::new_v4();
    let seat = Uuid::new_v4();
    let t0 = Utc::now();

    ledger
        .try_hold(
            &[seat],
            schedule_id,
            &Holder::session("pg-sweep"),
            t0,
            t0 + Duration::seconds(1),
        )
        .await
        .unwrap();

    let t1 = t0 + Duration::minutes(1);
    let removed = ledger.sweep_expired(t1).await.unwrap();
    assert!(removed.iter().any(|r| r.seat_id == seat));

    let claims = ledger.claims(schedule_id, t1).await.unwrap();
    assert!(!claims.held.contains(&seat));
}
