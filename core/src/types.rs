//! Value types shared by the seating core.
//!
//! Seat coordinates, hold identifiers, the immutable [`SeatHold`] record and
//! the outcome enums returned to callers.

use crate::error::{SeatingError, SeatingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Zero-based index of a row within the venue.
pub type RowIndex = usize;

/// Position of a seat in the venue: `(row, seat)`, compared by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatId {
    row: RowIndex,
    seat: usize,
}

impl SeatId {
    /// Creates the id of seat `seat` in row `row`
    #[must_use]
    pub const fn new(row: RowIndex, seat: usize) -> Self {
        Self { row, seat }
    }

    /// Row this seat belongs to
    #[must_use]
    pub const fn row(&self) -> RowIndex {
        self.row
    }

    /// Position of the seat within its row
    #[must_use]
    pub const fn seat(&self) -> usize {
        self.seat
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.seat)
    }
}

/// Identifier of a seat hold, issued from a monotonic counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoldId(u64);

impl HoldId {
    /// Wraps a raw hold number
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw hold number
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Seat Hold
// ============================================================================

/// A time-bounded claim on contiguous seats in a single row.
///
/// Immutable once built. The row is stored once at the hold level; the
/// constructor rejects seat lists that are empty or span several rows, so
/// the reservation path can rely on [`SeatHold::row`] without re-checking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeatHold {
    id: HoldId,
    row: RowIndex,
    seat_ids: Vec<SeatId>,
    held_until: DateTime<Utc>,
}

impl SeatHold {
    /// Builds a hold over `seat_ids`, which must be non-empty and share a row.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::EmptyHold`] for an empty seat list and
    /// [`SeatingError::MixedRows`] when the seats do not share a row.
    pub fn new(id: HoldId, seat_ids: Vec<SeatId>, held_until: DateTime<Utc>) -> SeatingResult<Self> {
        let first = seat_ids.first().ok_or(SeatingError::EmptyHold(id))?.row();

        if let Some(other) = seat_ids.iter().map(SeatId::row).find(|row| *row != first) {
            return Err(SeatingError::MixedRows {
                hold_id: id,
                first,
                other,
            });
        }

        Ok(Self {
            id,
            row: first,
            seat_ids,
            held_until,
        })
    }

    /// Hold identifier
    #[must_use]
    pub const fn id(&self) -> HoldId {
        self.id
    }

    /// Row owning every seat in the hold
    #[must_use]
    pub const fn row(&self) -> RowIndex {
        self.row
    }

    /// Held seats in row order
    #[must_use]
    pub fn seat_ids(&self) -> &[SeatId] {
        &self.seat_ids
    }

    /// Number of held seats
    #[must_use]
    pub fn len(&self) -> usize {
        self.seat_ids.len()
    }

    /// Whether the hold covers no seats
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seat_ids.is_empty()
    }

    /// Last instant at which the hold is still valid
    #[must_use]
    pub const fn held_until(&self) -> DateTime<Utc> {
        self.held_until
    }

    /// Whether the hold can still be used at `now` (valid through `held_until`)
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.held_until >= now
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result code of a reservation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationOutcome {
    /// Every held seat is now reserved for the customer
    Success,
    /// Nothing was reserved
    Fail,
}

impl ReservationOutcome {
    /// `true` for [`ReservationOutcome::Success`]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Wire code (`SUCCESS` / `FAIL`)
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
        }
    }
}

impl From<bool> for ReservationOutcome {
    fn from(reserved: bool) -> Self {
        if reserved { Self::Success } else { Self::Fail }
    }
}

impl fmt::Display for ReservationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Why a reservation was refused. Used for logging and metric labels only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReservationRejection {
    /// Hold id unknown or already expired
    HoldNotFound,
    /// A seat id is not part of the row asked to reserve it
    WrongRow,
    /// A seat was already sold
    AlreadyReserved,
    /// A seat is held by someone else, or was never held
    NotHolder,
}

impl ReservationRejection {
    /// Stable label for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HoldNotFound => "hold_not_found",
            Self::WrongRow => "wrong_row",
            Self::AlreadyReserved => "already_reserved",
            Self::NotHolder => "not_holder",
        }
    }
}

impl fmt::Display for ReservationRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable status of a seat at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatStatus {
    /// Free to be held
    Available,
    /// Covered by an unexpired hold
    Held,
    /// Sold
    Reserved,
}

impl SeatStatus {
    /// Single-character rendering used by seat maps
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Available => '.',
            Self::Held => 'h',
            Self::Reserved => 'R',
        }
    }
}
