//! # Box Office Testing
//!
//! Testing utilities and helpers for the box office seating core.
//!
//! This crate provides:
//! - Clock implementations for deterministic time
//! - A Given-When-Then harness for venue scenarios ([`VenueTest`])
//! - proptest strategies for hold requests
//!
//! ## Example
//!
//! ```
//! use box_office_testing::{ManualClock, test_clock};
//! use box_office_core::environment::Clock;
//! use chrono::TimeDelta;
//!
//! let clock = ManualClock::new(test_clock().now());
//! let start = clock.now();
//! clock.advance(TimeDelta::seconds(90));
//! assert_eq!(clock.now() - start, TimeDelta::seconds(90));
//! ```

use box_office_core::environment::Clock;
use chrono::{DateTime, Utc};


pub use venue_test::{VenueRun, VenueTest};

/// Clock implementations for tests
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeDelta;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use box_office_testing::mocks::FixedClock;
    /// use box_office_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the venue under test.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `start`
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(start)),
            }
        }

        /// Move the clock forward (or backward, for a negative delta)
        pub fn advance(&self, delta: TimeDelta) {
            let mut time = self.time.lock();
            *time += delta;
        }

        /// Jump to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock() = time;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Distinct customer email for the `n`th simulated customer
    #[must_use]
    pub fn customer_email(n: usize) -> String {
        format!("customer-{n}@example.com")
    }

    /// Install a `fmt` subscriber honouring `RUST_LOG`, once per process.
    ///
    /// Safe to call from every test; later calls are ignored.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// A hold request: seats wanted and the customer number making it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HoldRequest {
        /// Seats wanted
        pub num_seats: usize,
        /// Customer number, see [`crate::helpers::customer_email`]
        pub customer: usize,
        /// Seconds after the start of the test at which the request is made
        pub offset_secs: i64,
    }

    /// Requests for between one and `max_seats` seats from a handful of
    /// customers, spread over the first `max_offset_secs` seconds.
    pub fn hold_request(max_seats: usize, max_offset_secs: i64) -> impl Strategy<Value = HoldRequest> {
        (1..=max_seats, 0..8usize, 0..=max_offset_secs).prop_map(|(num_seats, customer, offset_secs)| {
            HoldRequest {
                num_seats,
                customer,
                offset_secs,
            }
        })
    }

    /// Sequences of up to `max_len` hold requests, ordered by time.
    pub fn hold_requests(
        max_seats: usize,
        max_offset_secs: i64,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<HoldRequest>> {
        prop::collection::vec(hold_request(max_seats, max_offset_secs), 1..=max_len).prop_map(
            |mut requests| {
                requests.sort_by_key(|request| request.offset_secs);
                requests
            },
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(test_clock().now());
        let handle = clock.clone();

        handle.advance(TimeDelta::minutes(15));
        assert_eq!(clock.now(), test_clock().now() + TimeDelta::minutes(15));

        clock.set(test_clock().now());
        assert_eq!(handle.now(), test_clock().now());
    }
}
