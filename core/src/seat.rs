//! A single seating position.
//!
//! The `reserved` flag and the hold expiry are atomics so that availability
//! can be counted without taking the row lock. They are only ever written
//! from inside the owning row's critical section; the holder's email lives
//! in the row's lock-guarded ledger (see [`crate::row`]).

use crate::types::{SeatId, SeatStatus};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

const NEVER_HELD: i64 = i64::MIN;

/// Nanoseconds since the epoch, clamped to the range `i64` can hold and kept
/// clear of `NEVER_HELD`.
fn epoch_nanos(time: DateTime<Utc>) -> i64 {
    time.timestamp_nanos_opt().unwrap_or(if time.timestamp() < 0 {
        NEVER_HELD + 1
    } else {
        i64::MAX
    })
}

/// One seat and its current status.
#[derive(Debug)]
pub struct Seat {
    id: SeatId,
    reserved: AtomicBool,
    /// Hold expiry in nanoseconds since the epoch, `NEVER_HELD` if unset
    held_until: AtomicI64,
}

impl Seat {
    /// Creates an unreserved, never-held seat
    #[must_use]
    pub const fn new(id: SeatId) -> Self {
        Self {
            id,
            reserved: AtomicBool::new(false),
            held_until: AtomicI64::new(NEVER_HELD),
        }
    }

    /// Seat coordinates
    #[must_use]
    pub const fn id(&self) -> SeatId {
        self.id
    }

    /// Whether the seat has been sold
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.reserved.load(Ordering::Acquire)
    }

    /// Expiry of the most recent hold, if the seat was ever held
    #[must_use]
    pub fn held_until(&self) -> Option<DateTime<Utc>> {
        match self.held_until.load(Ordering::Acquire) {
            NEVER_HELD => None,
            nanos => Some(DateTime::from_timestamp_nanos(nanos)),
        }
    }

    /// Available iff not reserved and either never held or the hold ended before `time`.
    #[must_use]
    pub fn is_available_at(&self, time: DateTime<Utc>) -> bool {
        if self.is_reserved() {
            return false;
        }
        match self.held_until.load(Ordering::Acquire) {
            NEVER_HELD => true,
            nanos => nanos < epoch_nanos(time),
        }
    }

    /// Status of the seat as seen at `time`
    #[must_use]
    pub fn status_at(&self, time: DateTime<Utc>) -> SeatStatus {
        if self.is_reserved() {
            SeatStatus::Reserved
        } else if self.is_available_at(time) {
            SeatStatus::Available
        } else {
            SeatStatus::Held
        }
    }

    /// Caller must hold the row lock.
    pub(crate) fn mark_held(&self, until: DateTime<Utc>) {
        self.held_until
            .store(epoch_nanos(until), Ordering::Release);
    }

    /// Caller must hold the row lock. Never reverted.
    pub(crate) fn mark_reserved(&self) {
        self.reserved.store(true, Ordering::Release);
    }
}
