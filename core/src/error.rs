//! Error types for the seating core.
//!
//! Business outcomes (no seats, expired hold, wrong customer) are ordinary
//! values and never appear here. `SeatingError` covers malformed input at
//! construction time and the one runtime failure allowed to escape: giving up
//! on a row lock during a bounded wait.

use crate::types::{HoldId, RowIndex};
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the seating core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeatingError {
    /// Venue configuration rejected by [`VenueConfig::validate`](crate::venue::VenueConfig::validate)
    #[error("Invalid venue configuration: {0}")]
    InvalidConfig(String),

    /// A hold must cover at least one seat
    #[error("Seat hold {0} has no seats")]
    EmptyHold(HoldId),

    /// Every seat in a hold must belong to the same row
    #[error("Seat hold {hold_id} spans rows {first} and {other}")]
    MixedRows {
        /// Hold being built
        hold_id: HoldId,
        /// Row of the first seat
        first: RowIndex,
        /// First row that differed
        other: RowIndex,
    },

    /// Row lock could not be acquired within the configured bound
    #[error("Timed out after {timeout:?} waiting for the lock on row {row}")]
    LockTimeout {
        /// Contended row
        row: RowIndex,
        /// Bound that elapsed
        timeout: Duration,
    },
}

/// Convenience alias for results carrying a [`SeatingError`].
pub type SeatingResult<T> = Result<T, SeatingError>;
