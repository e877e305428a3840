//! # Box Office Core
//!
//! Concurrent seat holding and reservation for a fixed-size venue.
//!
//! Customers ask for a number of contiguous seats in a single row. A
//! successful request places a time-bounded *hold* on the seats; the customer
//! then converts the hold into a permanent *reservation* before it expires.
//!
//! ## Components
//!
//! - [`Seat`](seat::Seat): status of one seating position
//! - [`SeatRow`](row::SeatRow): ordered seats behind one exclusive lock
//! - [`HeldSeatsTracker`](tracker::HeldSeatsTracker): hold registry with lazy
//!   expiry and single-flight background cleanup
//! - [`VenueSeating`](venue::VenueSeating): all rows plus the registry
//!
//! ## Concurrency
//!
//! - One lock per row, never held across rows, no global lock
//! - Hold search tries every row without waiting first, then waits on each
//!   row's lock in turn
//! - Expiry is lazy: stored timestamps are compared against the caller's
//!   "now", read through an injected [`Clock`](environment::Clock)
//!
//! ## Example
//!
//! ```
//! use box_office_core::environment::SystemClock;
//! use box_office_core::types::ReservationOutcome;
//! use box_office_core::venue::{VenueConfig, VenueSeating};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), box_office_core::SeatingError> {
//! let venue = VenueSeating::new(&VenueConfig::new(2, 10), Arc::new(SystemClock))?;
//!
//! if let Some(hold) = venue.find_and_hold_seats(4, "fan@example.com")? {
//!     let outcome = venue.reserve_seats(hold.id(), "fan@example.com")?;
//!     assert_eq!(outcome, ReservationOutcome::Success);
//! }
//! assert_eq!(venue.num_seats_available(), 16);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod metrics;
pub mod row;
pub mod seat;
pub mod tracker;
pub mod types;
pub mod venue;

pub use chrono::{DateTime, TimeDelta, Utc};
pub use error::{SeatingError, SeatingResult};
pub use row::SeatRow;
pub use seat::Seat;
pub use tracker::HeldSeatsTracker;
pub use types::{HoldId, ReservationOutcome, ReservationRejection, RowIndex, SeatHold, SeatId, SeatStatus};
pub use venue::{VenueConfig, VenueSeating};

/// Environment module - injected dependencies
///
/// The core never reads the wall clock directly; everything time-dependent
/// goes through [`Clock`](environment::Clock) or takes an explicit instant.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
