use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::{
    Booking, BookingDraft, BookingStatus, Holder, LedgerError, LedgerStore, Reservation,
    ScheduleClaims, SeatBooking,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct LedgerInner {
    reservations: HashMap<Uuid, Reservation>,
    /// (schedule_id, seat_id) -> reservation id, unexpired rows only.
    active_holds: HashMap<(Uuid, Uuid), Uuid>,
    bookings: HashMap<Uuid, Booking>,
    /// (schedule_id, seat_id) -> booking id, blocking statuses only.
    claimed_seats: HashMap<(Uuid, Uuid), Uuid>,
    numbers: HashMap<String, Uuid>,
}

/// In-process ledger. One mutex serializes every check-and-act, so each
/// operation is linearizable and all-or-nothing; critical sections never
/// await and touch only a handful of map entries.
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    fn locked(&self) -> Result<MutexGuard<'_, LedgerInner>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger mutex poisoned".to_string()))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerInner {
    /// Is the seat free right now? Reclaims an expired hold on the way.
    fn seat_free(&mut self, schedule_id: Uuid, seat_id: Uuid, now: DateTime<Utc>) -> bool {
        let key = (schedule_id, seat_id);

        if self.claimed_seats.contains_key(&key) {
            return false;
        }

        if let Some(reservation_id) = self.active_holds.get(&key).copied() {
            let expired = self
                .reservations
                .get(&reservation_id)
                .map_or(true, |r| r.is_expired(now));
            if !expired {
                return false;
            }
            self.active_holds.remove(&key);
            self.reservations.remove(&reservation_id);
        }

        true
    }

    fn remove_reservation(&mut self, reservation_id: Uuid) -> Option<Reservation> {
        let reservation = self.reservations.remove(&reservation_id)?;
        let key = (reservation.schedule_id, reservation.seat_id);
        if self.active_holds.get(&key) == Some(&reservation_id) {
            self.active_holds.remove(&key);
        }
        Some(reservation)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn try_hold(
        &self,
        seat_ids: &[Uuid],
        schedule_id: Uuid,
        holder: &Holder,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, LedgerError> {
        let mut inner = self.locked()?;

        let mut conflicting: Vec<Uuid> = seat_ids
            .iter()
            .copied()
            .filter(|&seat_id| !inner.seat_free(schedule_id, seat_id, now))
            .collect();
        if !conflicting.is_empty() {
            conflicting.sort();
            return Err(LedgerError::Conflict(conflicting));
        }

        let mut created = Vec::with_capacity(seat_ids.len());
        for &seat_id in seat_ids {
            let reservation = Reservation {
                id: Uuid::new_v4(),
                seat_id,
                schedule_id,
                holder: holder.clone(),
                created_at: now,
                expires_at,
            };
            inner
                .active_holds
                .insert((schedule_id, seat_id), reservation.id);
            inner.reservations.insert(reservation.id, reservation.clone());
            created.push(reservation);
        }

        Ok(created)
    }

    async fn reservation(&self, reservation_id: Uuid) -> Result<Option<Reservation>, LedgerError> {
        Ok(self.locked()?.reservations.get(&reservation_id).cloned())
    }

    async fn release(&self, reservation_id: Uuid) -> Result<Option<Reservation>, LedgerError> {
        Ok(self.locked()?.remove_reservation(reservation_id))
    }

    async fn promote(
        &self,
        reservation_ids: &[Uuid],
        user_id: Uuid,
        draft: BookingDraft,
        now: DateTime<Utc>,
    ) -> Result<Booking, LedgerError> {
        let mut inner = self.locked()?;

        let mut gone = Vec::new();
        let mut foreign = Vec::new();
        let mut consumed = Vec::with_capacity(reservation_ids.len());
        for &reservation_id in reservation_ids {
            match inner.reservations.get(&reservation_id) {
                None => gone.push(reservation_id),
                Some(r) if r.is_expired(now) => gone.push(reservation_id),
                Some(r) if r.schedule_id != draft.schedule_id => foreign.push(reservation_id),
                Some(r) => consumed.push(r.clone()),
            }
        }
        if !gone.is_empty() {
            return Err(LedgerError::ReservationGone(gone));
        }
        if !foreign.is_empty() {
            return Err(LedgerError::WrongSchedule(foreign));
        }

        let same_party = consumed
            .windows(2)
            .all(|pair| pair[0].holder.same_party(&pair[1].holder));
        let owned = consumed.iter().all(|r| r.holder.owned_by(user_id));
        if !same_party || !owned {
            return Err(LedgerError::HolderMismatch);
        }

        if inner.numbers.contains_key(&draft.booking_number) {
            return Err(LedgerError::DuplicateNumber(draft.booking_number));
        }

        let booking_id = Uuid::new_v4();
        let seats: Vec<SeatBooking> = consumed
            .iter()
            .map(|r| SeatBooking {
                booking_id,
                seat_id: r.seat_id,
            })
            .collect();

        let booking = Booking {
            id: booking_id,
            booking_number: draft.booking_number.clone(),
            user_id,
            schedule_id: draft.schedule_id,
            seats,
            status: draft.status,
            total_amount: draft.total_amount,
            currency: draft.currency,
            created_at: now,
            updated_at: now,
        };

        for reservation in &consumed {
            inner.remove_reservation(reservation.id);
            if booking.status.is_blocking() {
                inner
                    .claimed_seats
                    .insert((booking.schedule_id, reservation.seat_id), booking_id);
            }
        }
        inner.numbers.insert(booking.booking_number.clone(), booking_id);
        inner.bookings.insert(booking_id, booking.clone());

        Ok(booking)
    }

    async fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, LedgerError> {
        Ok(self.locked()?.bookings.get(&booking_id).cloned())
    }

    async fn booking_by_number(&self, booking_number: &str) -> Result<Option<Booking>, LedgerError> {
        let inner = self.locked()?;
        Ok(inner
            .numbers
            .get(booking_number)
            .and_then(|id| inner.bookings.get(id))
            .cloned())
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, LedgerError> {
        let mut inner = self.locked()?;

        let (schedule_id, seat_ids, was_blocking) = match inner.bookings.get(&booking_id) {
            Some(b) => (b.schedule_id, b.seat_ids(), b.status.is_blocking()),
            None => return Err(LedgerError::BookingNotFound(booking_id)),
        };

        if !was_blocking && status.is_blocking() {
            // Reinstating claims must not steal seats taken in the meantime.
            let mut conflicting: Vec<Uuid> = seat_ids
                .iter()
                .copied()
                .filter(|&seat_id| !inner.seat_free(schedule_id, seat_id, now))
                .collect();
            if !conflicting.is_empty() {
                conflicting.sort();
                return Err(LedgerError::Conflict(conflicting));
            }
        }

        for &seat_id in &seat_ids {
            let key = (schedule_id, seat_id);
            if status.is_blocking() {
                inner.claimed_seats.insert(key, booking_id);
            } else if inner.claimed_seats.get(&key) == Some(&booking_id) {
                inner.claimed_seats.remove(&key);
            }
        }

        let booking = inner
            .bookings
            .get_mut(&booking_id)
            .ok_or(LedgerError::BookingNotFound(booking_id))?;
        booking.update_status(status, now);
        Ok(booking.clone())
    }

    async fn claims(
        &self,
        schedule_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ScheduleClaims, LedgerError> {
        let inner = self.locked()?;

        let mut snapshot = ScheduleClaims::default();
        for (&(claim_schedule, seat_id), reservation_id) in &inner.active_holds {
            if claim_schedule != schedule_id {
                continue;
            }
            let live = inner
                .reservations
                .get(reservation_id)
                .map_or(false, |r| !r.is_expired(now));
            if live {
                snapshot.held.insert(seat_id);
            }
        }
        for &(claim_schedule, seat_id) in inner.claimed_seats.keys() {
            if claim_schedule == schedule_id {
                snapshot.booked.insert(seat_id);
            }
        }

        Ok(snapshot)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, LedgerError> {
        let mut inner = self.locked()?;

        let expired_ids: Vec<Uuid> = inner
            .reservations
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.id)
            .collect();

        let mut removed = Vec::with_capacity(expired_ids.len());
        for reservation_id in expired_ids {
            if let Some(reservation) = inner.remove_reservation(reservation_id) {
                removed.push(reservation);
            }
        }

        Ok(removed)
    }
}
