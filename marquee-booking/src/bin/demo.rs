use marquee_booking::TicketingEngine;
use marquee_catalog::{Seat, SeatCatalog, SeatCategory, Show, ShowSchedule, Venue};
use marquee_core::{CancelReason, Holder, PaymentResult};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Walks the full hold -> confirm -> cancel loop against the in-memory
/// ledger, logging every transition.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_booking=info,demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = marquee_store::Config::load()?;
    let rules = config.business_rules;

    let mut catalog = SeatCatalog::new();
    let venue_id = Uuid::new_v4();
    catalog.add_venue(Venue {
        id: venue_id,
        name: "Marquee Theatre".to_string(),
        city: Some("London".to_string()),
    });
    let mut seat_ids = Vec::new();
    for row in ["A", "B"] {
        for number in 1..=6 {
            let seat_id = Uuid::new_v4();
            catalog.add_seat(Seat {
                id: seat_id,
                venue_id,
                row: row.to_string(),
                number,
                category: if row == "A" {
                    SeatCategory::Premium
                } else {
                    SeatCategory::Standard
                },
            });
            seat_ids.push(seat_id);
        }
    }
    let show_id = Uuid::new_v4();
    catalog.add_show(Show {
        id: show_id,
        title: "An Evening at the Marquee".to_string(),
    });
    let schedule_id = Uuid::new_v4();
    catalog.add_schedule(ShowSchedule {
        id: schedule_id,
        show_id,
        venue_id,
        starts_at: chrono::Utc::now() + chrono::Duration::days(7),
    });

    let engine = TicketingEngine::in_memory(Arc::new(catalog), &rules);
    let _sweeper = engine.start_sweeper();
    let mut notifications = engine.events.subscribe();

    let capacity = engine.availability.capacity(venue_id, schedule_id).await?;
    tracing::info!(?capacity, "initial capacity");

    let user_id = Uuid::new_v4();
    let holder = Holder::user("demo-session", user_id);
    let held = engine
        .coordinator
        .place_hold(&seat_ids[..2], schedule_id, &holder, rules.hold_ttl())
        .await?;
    let reservation_ids: Vec<Uuid> = held.iter().map(|r| r.id).collect();

    let booking = engine
        .coordinator
        .confirm_booking(
            &reservation_ids,
            user_id,
            schedule_id,
            &PaymentResult::succeeded("txn-demo-001", 12000),
        )
        .await?;
    tracing::info!(booking_number = %booking.booking_number, "purchase complete");

    let capacity = engine.availability.capacity(venue_id, schedule_id).await?;
    tracing::info!(?capacity, "capacity after purchase");

    engine
        .coordinator
        .cancel_booking(booking.id, CancelReason::CustomerRequest)
        .await?;

    let capacity = engine.availability.capacity(venue_id, schedule_id).await?;
    tracing::info!(?capacity, "capacity after cancellation");

    while let Ok(event) = notifications.try_recv() {
        tracing::info!(?event, "notification");
    }

    Ok(())
}
