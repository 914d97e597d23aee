use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::{
    Booking, BookingDraft, BookingStatus, Holder, LedgerError, LedgerStore, Reservation,
    ScheduleClaims, SeatBooking,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Postgres-backed ledger. Every mutating operation runs inside one
/// transaction; hold races are decided by the unique index on
/// (seat_id, schedule_id) and promotions lock their rows with
/// `SELECT ... FOR UPDATE`, so the loser of a race always gets a typed
/// conflict instead of a duplicate claim.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage_error(err: sqlx::Error) -> LedgerError {
    LedgerError::Unavailable(err.to_string())
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    seat_id: Uuid,
    schedule_id: Uuid,
    session_id: String,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ReservationRow {
    fn into_domain(self) -> Reservation {
        Reservation {
            id: self.id,
            seat_id: self.seat_id,
            schedule_id: self.schedule_id,
            holder: Holder {
                session_id: self.session_id,
                user_id: self.user_id,
            },
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_number: String,
    user_id: Uuid,
    schedule_id: Uuid,
    status: String,
    total_amount: i32,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_domain(self, seats: Vec<SeatBooking>) -> Result<Booking, LedgerError> {
        let status = BookingStatus::parse(&self.status).ok_or_else(|| {
            LedgerError::Unavailable(format!("unknown booking status: {}", self.status))
        })?;
        Ok(Booking {
            id: self.id,
            booking_number: self.booking_number,
            user_id: self.user_id,
            schedule_id: self.schedule_id,
            seats,
            status,
            total_amount: self.total_amount,
            currency: self.currency,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeatBookingRow {
    booking_id: Uuid,
    seat_id: Uuid,
}

async fn fetch_seats(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: Uuid,
) -> Result<Vec<SeatBooking>, LedgerError> {
    let rows = sqlx::query_as::<_, SeatBookingRow>(
        "SELECT booking_id, seat_id FROM seat_bookings WHERE booking_id = $1 ORDER BY position",
    )
    .bind(booking_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(storage_error)?;

    Ok(rows
        .into_iter()
        .map(|r| SeatBooking {
            booking_id: r.booking_id,
            seat_id: r.seat_id,
        })
        .collect())
}

async fn fetch_booking_row(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: Uuid,
) -> Result<Option<BookingRow>, LedgerError> {
    sqlx::query_as::<_, BookingRow>(
        "SELECT id, booking_number, user_id, schedule_id, status, total_amount, currency, \
         created_at, updated_at FROM bookings WHERE id = $1",
    )
    .bind(booking_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(storage_error)
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn try_hold(
        &self,
        seat_ids: &[Uuid],
        schedule_id: Uuid,
        holder: &Holder,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        // Reclaim lapsed holds on the requested seats inside the same unit,
        // keeping the unique index equivalent to "unique among unexpired".
        sqlx::query(
            "DELETE FROM reservations \
             WHERE schedule_id = $1 AND seat_id = ANY($2) AND expires_at < $3",
        )
        .bind(schedule_id)
        .bind(seat_ids.to_vec())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        let mut conflicting: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT seat_id FROM seat_bookings \
             WHERE schedule_id = $1 AND seat_id = ANY($2) AND active",
        )
        .bind(schedule_id)
        .bind(seat_ids.to_vec())
        .fetch_all(&mut *tx)
        .await
        .map_err(storage_error)?;

        let mut created = Vec::with_capacity(seat_ids.len());
        if conflicting.is_empty() {
            for &seat_id in seat_ids {
                let reservation = Reservation {
                    id: Uuid::new_v4(),
                    seat_id,
                    schedule_id,
                    holder: holder.clone(),
                    created_at: now,
                    expires_at,
                };
                let inserted = sqlx::query(
                    "INSERT INTO reservations \
                     (id, seat_id, schedule_id, session_id, user_id, created_at, expires_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) \
                     ON CONFLICT (seat_id, schedule_id) DO NOTHING",
                )
                .bind(reservation.id)
                .bind(reservation.seat_id)
                .bind(reservation.schedule_id)
                .bind(&reservation.holder.session_id)
                .bind(reservation.holder.user_id)
                .bind(reservation.created_at)
                .bind(reservation.expires_at)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;

                if inserted.rows_affected() == 0 {
                    conflicting.push(seat_id);
                } else {
                    created.push(reservation);
                }
            }
        }

        if !conflicting.is_empty() {
            tx.rollback().await.map_err(storage_error)?;
            conflicting.sort();
            conflicting.dedup();
            return Err(LedgerError::Conflict(conflicting));
        }

        tx.commit().await.map_err(storage_error)?;
        Ok(created)
    }

    async fn reservation(&self, reservation_id: Uuid) -> Result<Option<Reservation>, LedgerError> {
        let row = sqlx::query_as::<_, ReservationRow>(
            "SELECT id, seat_id, schedule_id, session_id, user_id, created_at, expires_at \
             FROM reservations WHERE id = $1",
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(ReservationRow::into_domain))
    }

    async fn release(&self, reservation_id: Uuid) -> Result<Option<Reservation>, LedgerError> {
        let row = sqlx::query_as::<_, ReservationRow>(
            "DELETE FROM reservations WHERE id = $1 \
             RETURNING id, seat_id, schedule_id, session_id, user_id, created_at, expires_at",
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(ReservationRow::into_domain))
    }

    async fn promote(
        &self,
        reservation_ids: &[Uuid],
        user_id: Uuid,
        draft: BookingDraft,
        now: DateTime<Utc>,
    ) -> Result<Booking, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let rows = sqlx::query_as::<_, ReservationRow>(
            "SELECT id, seat_id, schedule_id, session_id, user_id, created_at, expires_at \
             FROM reservations WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(reservation_ids.to_vec())
        .fetch_all(&mut *tx)
        .await
        .map_err(storage_error)?;

        let reservations: Vec<Reservation> =
            rows.into_iter().map(ReservationRow::into_domain).collect();

        let mut gone: Vec<Uuid> = reservation_ids
            .iter()
            .copied()
            .filter(|id| !reservations.iter().any(|r| r.id == *id))
            .collect();
        gone.extend(reservations.iter().filter(|r| r.is_expired(now)).map(|r| r.id));
        if !gone.is_empty() {
            return Err(LedgerError::ReservationGone(gone));
        }

        let foreign: Vec<Uuid> = reservations
            .iter()
            .filter(|r| r.schedule_id != draft.schedule_id)
            .map(|r| r.id)
            .collect();
        if !foreign.is_empty() {
            return Err(LedgerError::WrongSchedule(foreign));
        }

        let same_party = reservations
            .windows(2)
            .all(|pair| pair[0].holder.same_party(&pair[1].holder));
        let owned = reservations.iter().all(|r| r.holder.owned_by(user_id));
        if !same_party || !owned {
            return Err(LedgerError::HolderMismatch);
        }

        // Keep the caller's reservation order for the seat entries.
        let mut ordered = Vec::with_capacity(reservation_ids.len());
        for id in reservation_ids {
            if let Some(r) = reservations.iter().find(|r| r.id == *id) {
                ordered.push(r.clone());
            }
        }

        let booking_id = Uuid::new_v4();
        let insert = sqlx::query(
            "INSERT INTO bookings \
             (id, booking_number, user_id, schedule_id, status, total_amount, currency, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
        )
        .bind(booking_id)
        .bind(&draft.booking_number)
        .bind(user_id)
        .bind(draft.schedule_id)
        .bind(draft.status.as_str())
        .bind(draft.total_amount)
        .bind(&draft.currency)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            if let sqlx::Error::Database(db) = &err {
                if db.constraint() == Some("bookings_number_key") {
                    return Err(LedgerError::DuplicateNumber(draft.booking_number));
                }
            }
            return Err(storage_error(err));
        }

        let mut seats = Vec::with_capacity(ordered.len());
        for (position, reservation) in ordered.iter().enumerate() {
            sqlx::query(
                "INSERT INTO seat_bookings (booking_id, seat_id, schedule_id, active, position) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(booking_id)
            .bind(reservation.seat_id)
            .bind(draft.schedule_id)
            .bind(draft.status.is_blocking())
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

            seats.push(SeatBooking {
                booking_id,
                seat_id: reservation.seat_id,
            });
        }

        sqlx::query("DELETE FROM reservations WHERE id = ANY($1)")
            .bind(reservation_ids.to_vec())
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        Ok(Booking {
            id: booking_id,
            booking_number: draft.booking_number,
            user_id,
            schedule_id: draft.schedule_id,
            seats,
            status: draft.status,
            total_amount: draft.total_amount,
            currency: draft.currency,
            created_at: now,
            updated_at: now,
        })
    }

    async fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        let Some(row) = fetch_booking_row(&mut tx, booking_id).await? else {
            return Ok(None);
        };
        let seats = fetch_seats(&mut tx, booking_id).await?;
        tx.commit().await.map_err(storage_error)?;
        Ok(Some(row.into_domain(seats)?))
    }

    async fn booking_by_number(&self, booking_number: &str) -> Result<Option<Booking>, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, booking_number, user_id, schedule_id, status, total_amount, currency, \
             created_at, updated_at FROM bookings WHERE booking_number = $1",
        )
        .bind(booking_number)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        let Some(row) = row else { return Ok(None) };
        let seats = fetch_seats(&mut tx, row.id).await?;
        tx.commit().await.map_err(storage_error)?;
        Ok(Some(row.into_domain(seats)?))
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, booking_number, user_id, schedule_id, status, total_amount, currency, \
             created_at, updated_at FROM bookings WHERE id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?
        .ok_or(LedgerError::BookingNotFound(booking_id))?;

        let was_blocking = BookingStatus::parse(&row.status)
            .ok_or_else(|| LedgerError::Unavailable(format!("unknown booking status: {}", row.status)))?
            .is_blocking();

        if !was_blocking && status.is_blocking() {
            // Reinstating claims must not steal seats taken in the meantime.
            let mut conflicting: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(
                "SELECT sb.seat_id FROM seat_bookings sb \
                 WHERE sb.schedule_id = $1 AND sb.active AND sb.booking_id <> $2 \
                   AND sb.seat_id IN (SELECT seat_id FROM seat_bookings WHERE booking_id = $2) \
                 UNION \
                 SELECT r.seat_id FROM reservations r \
                 WHERE r.schedule_id = $1 AND r.expires_at >= $3 \
                   AND r.seat_id IN (SELECT seat_id FROM seat_bookings WHERE booking_id = $2)",
            )
            .bind(row.schedule_id)
            .bind(booking_id)
            .bind(now)
            .fetch_all(&mut *tx)
            .await
            .map_err(storage_error)?;

            if !conflicting.is_empty() {
                conflicting.sort();
                return Err(LedgerError::Conflict(conflicting));
            }
        }

        sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(booking_id)
            .bind(status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        sqlx::query("UPDATE seat_bookings SET active = $2 WHERE booking_id = $1")
            .bind(booking_id)
            .bind(status.is_blocking())
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        let seats = fetch_seats(&mut tx, booking_id).await?;
        tx.commit().await.map_err(storage_error)?;

        let mut booking = row.into_domain(seats)?;
        booking.update_status(status, now);
        Ok(booking)
    }

    async fn claims(
        &self,
        schedule_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ScheduleClaims, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        // Both reads come from one snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        let held = sqlx::query_scalar::<_, Uuid>(
            "SELECT seat_id FROM reservations WHERE schedule_id = $1 AND expires_at >= $2",
        )
        .bind(schedule_id)
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(storage_error)?;

        let booked = sqlx::query_scalar::<_, Uuid>(
            "SELECT seat_id FROM seat_bookings WHERE schedule_id = $1 AND active",
        )
        .bind(schedule_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        Ok(ScheduleClaims {
            held: held.into_iter().collect(),
            booked: booked.into_iter().collect(),
        })
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, LedgerError> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            "DELETE FROM reservations WHERE expires_at < $1 \
             RETURNING id, seat_id, schedule_id, session_id, user_id, created_at, expires_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(ReservationRow::into_domain).collect())
    }
}
