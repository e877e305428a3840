//! A single row of seats and its lock.
//!
//! All mutation of a row's seats happens inside one critical section guarded
//! by the row's mutex. The lock never spans rows. Hold search is first-fit:
//! a single left-to-right pass keeps a running count of consecutive
//! available seats and takes the leftmost window that reaches the requested
//! size.
//!
//! Availability counting skips the lock and reads the seats'
//! atomic status cells, so the count is an estimate while holds or
//! reservations are in flight.

use crate::error::{SeatingError, SeatingResult};
use crate::seat::Seat;
use crate::types::{ReservationRejection, RowIndex, SeatId, SeatStatus};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Lock-guarded part of a row: who last held each seat, by position.
#[derive(Debug)]
struct RowLedger {
    holders: Vec<Option<Arc<str>>>,
}

/// An ordered row of seats with a single exclusive lock.
#[derive(Debug)]
pub struct SeatRow {
    index: RowIndex,
    seats: Vec<Seat>,
    positions: HashMap<SeatId, usize>,
    ledger: Mutex<RowLedger>,
}

impl SeatRow {
    /// Creates row `index` with `seats_per_row` free seats numbered from zero.
    #[must_use]
    pub fn new(index: RowIndex, seats_per_row: usize) -> Self {
        let seats: Vec<Seat> = (0..seats_per_row)
            .map(|seat| Seat::new(SeatId::new(index, seat)))
            .collect();
        let positions = seats
            .iter()
            .enumerate()
            .map(|(position, seat)| (seat.id(), position))
            .collect();

        Self {
            index,
            seats,
            positions,
            ledger: Mutex::new(RowLedger {
                holders: vec![None; seats_per_row],
            }),
        }
    }

    /// Row index within the venue
    #[must_use]
    pub const fn index(&self) -> RowIndex {
        self.index
    }

    /// Number of seats in the row
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Whether the row has no seats at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Seats in adjacency order
    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Counts seats available at `time` without taking the row lock.
    ///
    /// May over- or under-count while other callers hold or reserve seats in
    /// this row.
    #[must_use]
    pub fn num_seats_available(&self, time: DateTime<Utc>) -> usize {
        self.seats
            .iter()
            .filter(|seat| seat.is_available_at(time))
            .count()
    }

    /// Status of every seat at `time`, in row order. Lock-free like
    /// [`SeatRow::num_seats_available`].
    #[must_use]
    pub fn seat_map_at(&self, time: DateTime<Utc>) -> Vec<SeatStatus> {
        self.seats.iter().map(|seat| seat.status_at(time)).collect()
    }

    /// Email of the customer who last held `seat_id`, if it belongs to this
    /// row and was ever held. Takes the row lock.
    #[must_use]
    pub fn last_held_by(&self, seat_id: SeatId) -> Option<String> {
        let position = *self.positions.get(&seat_id)?;
        self.ledger.lock().holders[position]
            .as_deref()
            .map(str::to_owned)
    }

    /// Holds `num_seats` contiguous seats if the row lock is free right now.
    ///
    /// Returns `None` without waiting when another caller owns the lock, and
    /// `None` when no window of `num_seats` available seats exists.
    #[must_use]
    pub fn hold_seats_non_blocking(
        &self,
        num_seats: usize,
        customer_email: &str,
        time: DateTime<Utc>,
        hold_for: TimeDelta,
    ) -> Option<Vec<SeatId>> {
        let Some(mut ledger) = self.ledger.try_lock() else {
            tracing::trace!(row = self.index, "Row busy, skipping non-blocking hold");
            return None;
        };
        self.hold_locked(&mut ledger, num_seats, customer_email, time, hold_for)
    }

    /// Holds `num_seats` contiguous seats, waiting as long as it takes for
    /// the row lock.
    #[must_use]
    pub fn hold_seats_blocking(
        &self,
        num_seats: usize,
        customer_email: &str,
        time: DateTime<Utc>,
        hold_for: TimeDelta,
    ) -> Option<Vec<SeatId>> {
        let mut ledger = self.ledger.lock();
        self.hold_locked(&mut ledger, num_seats, customer_email, time, hold_for)
    }

    /// Like [`SeatRow::hold_seats_blocking`] but gives up on the lock after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::LockTimeout`] if the row lock is not acquired
    /// within `timeout`.
    pub fn hold_seats_within(
        &self,
        num_seats: usize,
        customer_email: &str,
        time: DateTime<Utc>,
        hold_for: TimeDelta,
        timeout: Duration,
    ) -> SeatingResult<Option<Vec<SeatId>>> {
        let mut ledger = self.lock_within(timeout)?;
        Ok(self.hold_locked(&mut ledger, num_seats, customer_email, time, hold_for))
    }

    /// Reserves `seat_ids` for `customer_email`, waiting for the row lock.
    ///
    /// Every seat must belong to this row, be unreserved and have been last
    /// held by `customer_email`. Hold expiry is not re-checked here. Either
    /// all seats are reserved and `true` is returned, or nothing changes.
    #[must_use]
    pub fn reserve_seats_blocking(&self, seat_ids: &[SeatId], customer_email: &str) -> bool {
        let ledger = self.ledger.lock();
        self.reserve_locked(&ledger, seat_ids, customer_email).is_ok()
    }

    /// Like [`SeatRow::reserve_seats_blocking`] but gives up on the lock
    /// after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::LockTimeout`] if the row lock is not acquired
    /// within `timeout`.
    pub fn reserve_seats_within(
        &self,
        seat_ids: &[SeatId],
        customer_email: &str,
        timeout: Duration,
    ) -> SeatingResult<bool> {
        let ledger = self.lock_within(timeout)?;
        Ok(self.reserve_locked(&ledger, seat_ids, customer_email).is_ok())
    }

    /// Holds seats, waiting for the lock indefinitely or up to `timeout`.
    pub(crate) fn hold_seats_waiting(
        &self,
        num_seats: usize,
        customer_email: &str,
        time: DateTime<Utc>,
        hold_for: TimeDelta,
        timeout: Option<Duration>,
    ) -> SeatingResult<Option<Vec<SeatId>>> {
        match timeout {
            Some(timeout) => self.hold_seats_within(num_seats, customer_email, time, hold_for, timeout),
            None => Ok(self.hold_seats_blocking(num_seats, customer_email, time, hold_for)),
        }
    }

    /// Reserves seats, waiting for the lock indefinitely or up to `timeout`,
    /// and reports why a refused reservation was refused.
    pub(crate) fn reserve_seats_waiting(
        &self,
        seat_ids: &[SeatId],
        customer_email: &str,
        timeout: Option<Duration>,
    ) -> SeatingResult<Result<(), ReservationRejection>> {
        let ledger = match timeout {
            Some(timeout) => self.lock_within(timeout)?,
            None => self.ledger.lock(),
        };
        Ok(self.reserve_locked(&ledger, seat_ids, customer_email))
    }

    fn lock_within(&self, timeout: Duration) -> SeatingResult<MutexGuard<'_, RowLedger>> {
        self.ledger.try_lock_for(timeout).ok_or_else(|| {
            tracing::warn!(row = self.index, ?timeout, "Gave up waiting for row lock");
            SeatingError::LockTimeout {
                row: self.index,
                timeout,
            }
        })
    }

    fn hold_locked(
        &self,
        ledger: &mut RowLedger,
        num_seats: usize,
        customer_email: &str,
        time: DateTime<Utc>,
        hold_for: TimeDelta,
    ) -> Option<Vec<SeatId>> {
        if num_seats == 0 || num_seats > self.seats.len() {
            return None;
        }
        let Some(held_until) = time.checked_add_signed(hold_for) else {
            tracing::warn!(row = self.index, %time, ?hold_for, "Hold expiry out of range");
            return None;
        };

        let mut run = 0;
        for (position, seat) in self.seats.iter().enumerate() {
            if !seat.is_available_at(time) {
                run = 0;
                continue;
            }
            run += 1;
            if run == num_seats {
                let window = position + 1 - num_seats..=position;
                let holder: Arc<str> = Arc::from(customer_email);
                for held in window.clone() {
                    self.seats[held].mark_held(held_until);
                    ledger.holders[held] = Some(Arc::clone(&holder));
                }
                tracing::debug!(
                    row = self.index,
                    first_seat = *window.start(),
                    num_seats,
                    %held_until,
                    "Held seats"
                );
                return Some(self.seats[window].iter().map(Seat::id).collect());
            }
        }

        None
    }

    fn reserve_locked(
        &self,
        ledger: &RowLedger,
        seat_ids: &[SeatId],
        customer_email: &str,
    ) -> Result<(), ReservationRejection> {
        match self.reservable_positions(ledger, seat_ids, customer_email) {
            Ok(positions) => {
                for position in positions {
                    self.seats[position].mark_reserved();
                }
                tracing::debug!(row = self.index, num_seats = seat_ids.len(), "Reserved seats");
                Ok(())
            },
            Err(rejection) => {
                tracing::debug!(row = self.index, %rejection, "Reservation refused");
                Err(rejection)
            },
        }
    }

    /// Validates every seat before anything is mutated.
    fn reservable_positions(
        &self,
        ledger: &RowLedger,
        seat_ids: &[SeatId],
        customer_email: &str,
    ) -> Result<Vec<usize>, ReservationRejection> {
        // nothing held, nothing to reserve
        if seat_ids.is_empty() {
            return Err(ReservationRejection::NotHolder);
        }

        seat_ids
            .iter()
            .map(|seat_id| {
                let position = *self
                    .positions
                    .get(seat_id)
                    .ok_or(ReservationRejection::WrongRow)?;
                if self.seats[position].is_reserved() {
                    return Err(ReservationRejection::AlreadyReserved);
                }
                if ledger.holders[position].as_deref() != Some(customer_email) {
                    return Err(ReservationRejection::NotHolder);
                }
                Ok(position)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Barrier;
    use std::thread;

    const EMAIL: &str = "example@example.com";
    const NUM_SEATS: usize = 100;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_735_689_600 + secs, 0).unwrap()
    }

    fn hold_for() -> TimeDelta {
        TimeDelta::seconds(999)
    }

    #[test]
    fn new_row_is_fully_available() {
        let row = SeatRow::new(3, NUM_SEATS);
        assert_eq!(row.len(), NUM_SEATS);
        assert_eq!(row.num_seats_available(at(0)), NUM_SEATS);
        assert!(row.seats().iter().all(|seat| seat.id().row() == 3));
    }

    #[test]
    fn hold_takes_leftmost_window_in_row_order() {
        let row = SeatRow::new(0, 10);

        let first = row.hold_seats_blocking(3, EMAIL, at(0), hold_for()).unwrap();
        let second = row.hold_seats_blocking(2, EMAIL, at(0), hold_for()).unwrap();

        assert_eq!(first, (0..3).map(|s| SeatId::new(0, s)).collect::<Vec<_>>());
        assert_eq!(second, vec![SeatId::new(0, 3), SeatId::new(0, 4)]);
        assert_eq!(row.num_seats_available(at(0)), 5);
        assert_eq!(row.last_held_by(SeatId::new(0, 4)).as_deref(), Some(EMAIL));
    }

    #[test]
    fn run_of_free_seats_resets_at_held_seat() {
        let row = SeatRow::new(0, 6);
        row.hold_seats_blocking(2, "a@x.com", at(0), TimeDelta::seconds(10))
            .unwrap();
        row.hold_seats_blocking(2, "b@x.com", at(0), TimeDelta::seconds(100))
            .unwrap();

        // seats 0-1 expired, 2-3 still held, 4-5 never held
        assert_eq!(row.num_seats_available(at(20)), 4);
        assert!(row.hold_seats_blocking(3, "c@x.com", at(20), hold_for()).is_none());

        let seats = row.hold_seats_blocking(2, "c@x.com", at(20), hold_for()).unwrap();
        assert_eq!(seats, vec![SeatId::new(0, 0), SeatId::new(0, 1)]);
    }

    #[test]
    fn oversized_or_empty_requests_never_succeed() {
        let row = SeatRow::new(0, 20);
        assert!(row.hold_seats_blocking(25, EMAIL, at(0), hold_for()).is_none());
        assert!(row.hold_seats_non_blocking(0, EMAIL, at(0), hold_for()).is_none());
        assert_eq!(row.num_seats_available(at(0)), 20);
    }

    #[test]
    fn non_blocking_hold_gives_up_on_a_busy_row() {
        let row = SeatRow::new(0, NUM_SEATS);
        let guard = row.ledger.lock();

        thread::scope(|scope| {
            let attempts: Vec<_> = (0..NUM_SEATS / 5)
                .map(|_| scope.spawn(|| row.hold_seats_non_blocking(5, EMAIL, at(0), hold_for())))
                .collect();
            for attempt in attempts {
                assert!(attempt.join().unwrap().is_none());
            }
        });

        drop(guard);
        assert_eq!(row.num_seats_available(at(0)), NUM_SEATS);
        assert!(row.hold_seats_non_blocking(5, EMAIL, at(0), hold_for()).is_some());
    }

    #[test]
    fn oversubscribed_non_blocking_holds_stay_consistent() {
        const CONTENDERS: usize = NUM_SEATS / 5 + 10;

        let row = SeatRow::new(0, NUM_SEATS);
        let barrier = Barrier::new(CONTENDERS);

        let successes = thread::scope(|scope| {
            let attempts: Vec<_> = (0..CONTENDERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        row.hold_seats_non_blocking(5, EMAIL, at(0), hold_for())
                    })
                })
                .collect();
            attempts
                .into_iter()
                .filter_map(|attempt| attempt.join().unwrap())
                .count()
        });

        // 150 seats asked of 100: at least ten requests must come back empty
        assert!(successes <= NUM_SEATS / 5);
        assert!(CONTENDERS - successes >= 10);

        let available = row.num_seats_available(at(0));
        assert!(available < NUM_SEATS);
        assert_eq!(available, NUM_SEATS - successes * 5);
    }

    #[test]
    fn all_blocking_holds_succeed() {
        let row = SeatRow::new(0, NUM_SEATS);
        let barrier = Barrier::new(NUM_SEATS / 5);

        thread::scope(|scope| {
            let attempts: Vec<_> = (0..NUM_SEATS / 5)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        row.hold_seats_blocking(5, EMAIL, at(0), hold_for())
                    })
                })
                .collect();
            for attempt in attempts {
                assert_eq!(attempt.join().unwrap().map(|seats| seats.len()), Some(5));
            }
        });

        assert_eq!(row.num_seats_available(at(0)), 0);
    }

    #[test]
    fn reserved_seats_do_not_become_available() {
        let row = SeatRow::new(0, NUM_SEATS);

        thread::scope(|scope| {
            for count in 0..NUM_SEATS / 5 {
                let row = &row;
                scope.spawn(move || {
                    let seat_ids = row.hold_seats_blocking(5, EMAIL, at(0), hold_for()).unwrap();
                    if count % 2 == 0 {
                        assert!(row.reserve_seats_blocking(&seat_ids, EMAIL));
                    }
                });
            }
        });

        assert_eq!(row.num_seats_available(at(0)), 0);
        assert_eq!(row.num_seats_available(at(999 + 5)), NUM_SEATS / 2);
    }

    #[test]
    fn cannot_reserve_seats_from_wrong_row() {
        let row = SeatRow::new(0, NUM_SEATS);
        let seat_ids = row.hold_seats_blocking(5, EMAIL, at(0), hold_for()).unwrap();
        let bad_clones: Vec<SeatId> = seat_ids
            .iter()
            .map(|id| SeatId::new(id.row() + 1, id.seat()))
            .collect();

        assert!(!row.reserve_seats_blocking(&bad_clones, EMAIL));
        assert_eq!(row.num_seats_available(at(2_000)), NUM_SEATS);
    }

    #[test]
    fn cannot_reserve_seats_with_wrong_email() {
        let row = SeatRow::new(0, NUM_SEATS);
        let seat_ids = row.hold_seats_blocking(5, EMAIL, at(0), hold_for()).unwrap();

        assert!(!row.reserve_seats_blocking(&seat_ids, "BAD EMAIL"));
        assert!(row.reserve_seats_blocking(&seat_ids, EMAIL));
    }

    #[test]
    fn cannot_reserve_unheld_seats() {
        let row = SeatRow::new(0, NUM_SEATS);
        let seat_ids: Vec<SeatId> = (0..5).map(|seat| SeatId::new(0, seat)).collect();

        assert!(!row.reserve_seats_blocking(&seat_ids, EMAIL));
        assert!(!row.reserve_seats_blocking(&[], EMAIL));
    }

    #[test]
    fn reservation_is_all_or_nothing() {
        let row = SeatRow::new(0, 10);
        let mine = row.hold_seats_blocking(3, EMAIL, at(0), hold_for()).unwrap();
        let theirs = row.hold_seats_blocking(2, "other@x.com", at(0), hold_for()).unwrap();

        let mixed: Vec<SeatId> = mine.iter().chain(theirs.iter()).copied().collect();
        assert!(!row.reserve_seats_blocking(&mixed, EMAIL));
        assert!(row.seats().iter().all(|seat| !seat.is_reserved()));

        assert!(row.reserve_seats_blocking(&mine, EMAIL));
        assert!(!row.reserve_seats_blocking(&mine, EMAIL));
    }

    #[test]
    fn ownership_alone_gates_reservation() {
        let row = SeatRow::new(0, 4);
        let seat_ids = row
            .hold_seats_blocking(2, EMAIL, at(0), TimeDelta::seconds(1))
            .unwrap();

        // the hold has long expired, but nobody else took the seats
        assert_eq!(row.num_seats_available(at(60)), 4);
        assert!(row.reserve_seats_blocking(&seat_ids, EMAIL));
        assert_eq!(row.num_seats_available(at(60)), 2);
    }

    #[test]
    fn bounded_acquisition_times_out_on_a_busy_row() {
        let row = SeatRow::new(5, 10);
        let guard = row.ledger.lock();

        thread::scope(|scope| {
            let held = scope
                .spawn(|| {
                    row.hold_seats_within(2, EMAIL, at(0), hold_for(), Duration::from_millis(20))
                })
                .join()
                .unwrap();
            assert_eq!(
                held,
                Err(SeatingError::LockTimeout {
                    row: 5,
                    timeout: Duration::from_millis(20)
                })
            );

            let reserved = scope
                .spawn(|| row.reserve_seats_within(&[SeatId::new(5, 0)], EMAIL, Duration::from_millis(20)))
                .join()
                .unwrap();
            assert!(matches!(reserved, Err(SeatingError::LockTimeout { row: 5, .. })));
        });

        drop(guard);
        let held = row
            .hold_seats_within(2, EMAIL, at(0), hold_for(), Duration::from_millis(20))
            .unwrap()
            .unwrap();
        assert_eq!(row.reserve_seats_within(&held, EMAIL, Duration::from_millis(20)), Ok(true));
    }

    #[test]
    fn seat_map_reflects_holds_and_sales() {
        let row = SeatRow::new(0, 4);
        let sold = row.hold_seats_blocking(1, EMAIL, at(0), hold_for()).unwrap();
        assert!(row.reserve_seats_blocking(&sold, EMAIL));
        row.hold_seats_blocking(2, EMAIL, at(0), hold_for()).unwrap();

        assert_eq!(
            row.seat_map_at(at(1)),
            vec![
                SeatStatus::Reserved,
                SeatStatus::Held,
                SeatStatus::Held,
                SeatStatus::Available
            ]
        );
    }
}
