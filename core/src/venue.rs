//! Venue-wide seating: every row plus the hold registry.
//!
//! Hold requests fan out across rows in a fixed order. The first pass uses
//! non-blocking attempts and skips any row whose lock is taken; if no row
//! satisfies the request, a second pass waits for each row's lock in turn so
//! transient contention cannot produce a false "no seats". Reservations look
//! the hold up in the registry and hand it to the owning row.

use crate::environment::Clock;
use crate::error::{SeatingError, SeatingResult};
use crate::metrics;
use crate::row::SeatRow;
use crate::tracker::HeldSeatsTracker;
use crate::types::{HoldId, ReservationOutcome, ReservationRejection, SeatHold, SeatId, SeatStatus};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const DEFAULT_NUM_ROWS: usize = 30;
const DEFAULT_SEATS_PER_ROW: usize = 20;
const DEFAULT_HOLD_SECONDS: u32 = 15 * 60;

/// Venue dimensions and hold policy, fixed at construction.
///
/// # Example
///
/// ```
/// use box_office_core::venue::VenueConfig;
/// use std::time::Duration;
///
/// let config = VenueConfig::new(10, 12)
///     .with_hold_duration_seconds(120)
///     .with_lock_timeout(Some(Duration::from_millis(250)));
///
/// assert_eq!(config.capacity(), 120);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Number of rows
    pub num_rows: usize,
    /// Seats in every row
    pub seats_per_row: usize,
    /// How long a hold lasts, in seconds
    pub hold_duration_seconds: u32,
    /// Soft capacity of the hold registry
    pub max_tracked_holds: usize,
    /// Upper bound on waiting for a row lock; `None` waits indefinitely
    pub lock_timeout: Option<Duration>,
}

impl VenueConfig {
    /// A venue of `num_rows` × `seats_per_row` with default hold policy and
    /// one tracked hold per seat.
    #[must_use]
    pub const fn new(num_rows: usize, seats_per_row: usize) -> Self {
        Self {
            num_rows,
            seats_per_row,
            hold_duration_seconds: DEFAULT_HOLD_SECONDS,
            max_tracked_holds: num_rows.saturating_mul(seats_per_row),
            lock_timeout: None,
        }
    }

    /// Set the hold duration
    #[must_use]
    pub const fn with_hold_duration_seconds(mut self, seconds: u32) -> Self {
        self.hold_duration_seconds = seconds;
        self
    }

    /// Set the soft capacity of the hold registry
    #[must_use]
    pub const fn with_max_tracked_holds(mut self, max_tracked_holds: usize) -> Self {
        self.max_tracked_holds = max_tracked_holds;
        self
    }

    /// Bound (or unbound, with `None`) waits on row locks
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Total number of seats
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.num_rows.saturating_mul(self.seats_per_row)
    }

    /// Hold duration as a time delta
    #[must_use]
    pub fn hold_duration(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.hold_duration_seconds))
    }

    /// Checks that every dimension and limit is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> SeatingResult<()> {
        let zero_field = [
            ("num_rows", self.num_rows == 0),
            ("seats_per_row", self.seats_per_row == 0),
            ("hold_duration_seconds", self.hold_duration_seconds == 0),
            ("max_tracked_holds", self.max_tracked_holds == 0),
        ]
        .into_iter()
        .find_map(|(field, is_zero)| is_zero.then_some(field));

        match zero_field {
            Some(field) => Err(SeatingError::InvalidConfig(format!("{field} must be greater than zero"))),
            None => Ok(()),
        }
    }
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_ROWS, DEFAULT_SEATS_PER_ROW)
    }
}

/// All seats in a venue, the hold registry and the hold-id counter.
pub struct VenueSeating {
    rows: Vec<SeatRow>,
    hold_duration: TimeDelta,
    lock_timeout: Option<Duration>,
    next_hold_id: AtomicU64,
    tracker: HeldSeatsTracker,
    clock: Arc<dyn Clock>,
}

impl VenueSeating {
    /// Builds an empty venue from `config`, reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: &VenueConfig, clock: Arc<dyn Clock>) -> SeatingResult<Self> {
        config.validate()?;

        let rows = (0..config.num_rows)
            .map(|row| SeatRow::new(row, config.seats_per_row))
            .collect();

        tracing::info!(
            num_rows = config.num_rows,
            seats_per_row = config.seats_per_row,
            hold_duration_seconds = config.hold_duration_seconds,
            max_tracked_holds = config.max_tracked_holds,
            lock_timeout = ?config.lock_timeout,
            "Venue seating initialized"
        );

        Ok(Self {
            rows,
            hold_duration: config.hold_duration(),
            lock_timeout: config.lock_timeout,
            next_hold_id: AtomicU64::new(0),
            tracker: HeldSeatsTracker::new(config.max_tracked_holds),
            clock,
        })
    }

    /// Rows in venue order
    #[must_use]
    pub fn rows(&self) -> &[SeatRow] {
        &self.rows
    }

    /// Row `index`, if it exists
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&SeatRow> {
        self.rows.get(index)
    }

    /// Total number of seats
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.rows.iter().map(SeatRow::len).sum()
    }

    /// How long new holds last
    #[must_use]
    pub const fn hold_duration(&self) -> TimeDelta {
        self.hold_duration
    }

    /// The hold registry
    #[must_use]
    pub const fn tracker(&self) -> &HeldSeatsTracker {
        &self.tracker
    }

    /// Seats available right now, per the injected clock.
    #[must_use]
    pub fn num_seats_available(&self) -> usize {
        self.num_seats_available_at(self.clock.now())
    }

    /// Seats available at `time`: the sum of every row's lock-free count.
    #[must_use]
    pub fn num_seats_available_at(&self, time: DateTime<Utc>) -> usize {
        self.rows
            .iter()
            .map(|row| row.num_seats_available(time))
            .sum()
    }

    /// Status of every seat at `time`, one vector per row.
    #[must_use]
    pub fn seat_map_at(&self, time: DateTime<Utc>) -> Vec<Vec<SeatStatus>> {
        self.rows.iter().map(|row| row.seat_map_at(time)).collect()
    }

    /// Finds and holds `num_seats` contiguous seats in one row for
    /// `customer_email`, as of now.
    ///
    /// `Ok(None)` means no row currently has a large enough free block.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::LockTimeout`] only when a lock timeout is
    /// configured and a row lock could not be acquired in time.
    pub fn find_and_hold_seats(
        &self,
        num_seats: usize,
        customer_email: &str,
    ) -> SeatingResult<Option<SeatHold>> {
        self.find_and_hold_seats_at(num_seats, customer_email, self.clock.now())
    }

    /// [`VenueSeating::find_and_hold_seats`] with an explicit hold time.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::LockTimeout`] only when a lock timeout is
    /// configured and a row lock could not be acquired in time.
    pub fn find_and_hold_seats_at(
        &self,
        num_seats: usize,
        customer_email: &str,
        now: DateTime<Utc>,
    ) -> SeatingResult<Option<SeatHold>> {
        let Some(held_until) = now.checked_add_signed(self.hold_duration) else {
            tracing::warn!(%now, "Hold expiry out of range");
            metrics::record_hold_unavailable();
            return Ok(None);
        };

        for row in &self.rows {
            if let Some(seat_ids) =
                row.hold_seats_non_blocking(num_seats, customer_email, now, self.hold_duration)
            {
                return self.register_hold(seat_ids, held_until, now).map(Some);
            }
        }

        tracing::debug!(num_seats, "No seats on the optimistic pass, waiting for row locks");
        for row in &self.rows {
            if let Some(seat_ids) = row.hold_seats_waiting(
                num_seats,
                customer_email,
                now,
                self.hold_duration,
                self.lock_timeout,
            )? {
                return self.register_hold(seat_ids, held_until, now).map(Some);
            }
        }

        tracing::debug!(num_seats, "No row can satisfy the hold");
        metrics::record_hold_unavailable();
        Ok(None)
    }

    /// Reserves the seats of hold `hold_id` for `customer_email`, as of now.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::LockTimeout`] only when a lock timeout is
    /// configured and the owning row's lock could not be acquired in time.
    pub fn reserve_seats(
        &self,
        hold_id: HoldId,
        customer_email: &str,
    ) -> SeatingResult<ReservationOutcome> {
        self.reserve_seats_at(hold_id, customer_email, self.clock.now())
    }

    /// [`VenueSeating::reserve_seats`] with an explicit lookup time.
    ///
    /// The registry entry is left in place on success and expires lazily.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::LockTimeout`] only when a lock timeout is
    /// configured and the owning row's lock could not be acquired in time.
    pub fn reserve_seats_at(
        &self,
        hold_id: HoldId,
        customer_email: &str,
        now: DateTime<Utc>,
    ) -> SeatingResult<ReservationOutcome> {
        let Some(hold) = self.tracker.get_seat_hold(hold_id, now) else {
            return Ok(Self::refuse(hold_id, ReservationRejection::HoldNotFound));
        };
        let Some(row) = self.rows.get(hold.row()) else {
            return Ok(Self::refuse(hold_id, ReservationRejection::WrongRow));
        };

        match row.reserve_seats_waiting(hold.seat_ids(), customer_email, self.lock_timeout)? {
            Ok(()) => {
                tracing::debug!(%hold_id, row = hold.row(), num_seats = hold.len(), "Reservation confirmed");
                metrics::record_reservation_succeeded();
                Ok(ReservationOutcome::Success)
            },
            Err(rejection) => Ok(Self::refuse(hold_id, rejection)),
        }
    }

    fn register_hold(
        &self,
        seat_ids: Vec<SeatId>,
        held_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SeatingResult<SeatHold> {
        let id = HoldId::new(self.next_hold_id.fetch_add(1, Ordering::Relaxed));
        let hold = SeatHold::new(id, seat_ids, held_until)?;

        self.tracker.add_seat_hold(hold.clone(), now);
        metrics::record_hold_placed(hold.len());
        tracing::debug!(hold_id = %id, row = hold.row(), num_seats = hold.len(), %held_until, "Seat hold registered");
        Ok(hold)
    }

    fn refuse(hold_id: HoldId, rejection: ReservationRejection) -> ReservationOutcome {
        tracing::debug!(%hold_id, %rejection, "Reservation failed");
        metrics::record_reservation_rejected(rejection);
        ReservationOutcome::Fail
    }
}

impl fmt::Debug for VenueSeating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueSeating")
            .field("num_rows", &self.rows.len())
            .field("capacity", &self.capacity())
            .field("hold_duration", &self.hold_duration)
            .field("lock_timeout", &self.lock_timeout)
            .field("tracked_holds", &self.tracker.len())
            .finish_non_exhaustive()
    }
}
