//! Ticket rush simulation.
//!
//! Every simulated customer asks for one seat at the same moment on the
//! blocking pool. Three out of four customers who get a hold go on to buy.

use anyhow::Context;
use box_office_core::{ReservationOutcome, SeatingResult, VenueSeating};
use std::sync::Arc;
use std::time::Instant;

/// What happened during a rush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RushSummary {
    /// Customers that took part
    pub customers: usize,
    /// Customers who got a hold
    pub held: usize,
    /// Customers who turned their hold into a reservation
    pub reserved: usize,
    /// Customers turned away with no seat
    pub turned_away: usize,
}

/// Email of the `n`th rush customer
#[must_use]
pub fn rush_email(n: usize) -> String {
    format!("fan-{n}@example.com")
}

const fn buys(customer: usize) -> bool {
    customer % 4 != 3
}

fn serve(venue: &VenueSeating, customer: usize) -> SeatingResult<(bool, bool)> {
    let email = rush_email(customer);
    let Some(hold) = venue.find_and_hold_seats(1, &email)? else {
        return Ok((false, false));
    };
    if !buys(customer) {
        return Ok((true, false));
    }
    let outcome = venue.reserve_seats(hold.id(), &email)?;
    Ok((true, outcome == ReservationOutcome::Success))
}

/// Run `customers` concurrent single-seat customers against `venue`.
///
/// # Errors
///
/// Returns an error if a customer task panics or a row lock times out.
pub async fn ticket_rush(venue: Arc<VenueSeating>, customers: usize) -> anyhow::Result<RushSummary> {
    tracing::info!(customers, "Ticket rush starting");
    let started = Instant::now();

    let tasks: Vec<_> = (0..customers)
        .map(|customer| {
            let venue = Arc::clone(&venue);
            tokio::task::spawn_blocking(move || serve(&venue, customer))
        })
        .collect();

    let mut summary = RushSummary {
        customers,
        ..RushSummary::default()
    };
    for result in futures::future::join_all(tasks).await {
        let (held, reserved) = result.context("rush customer task failed")??;
        summary.held += usize::from(held);
        summary.reserved += usize::from(reserved);
        summary.turned_away += usize::from(!held);
    }

    let elapsed = started.elapsed();
    metrics::histogram!("box_office_demo_rush_duration_seconds").record(elapsed.as_secs_f64());
    tracing::info!(
        held = summary.held,
        reserved = summary.reserved,
        turned_away = summary.turned_away,
        elapsed_ms = elapsed.as_millis(),
        "Ticket rush finished"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use box_office_core::VenueConfig;
    use box_office_testing::test_clock;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rush_sells_out_without_overselling() {
        let venue = Arc::new(VenueSeating::new(&VenueConfig::new(4, 10), Arc::new(test_clock())).unwrap());

        let summary = ticket_rush(Arc::clone(&venue), 60).await.unwrap();

        assert_eq!(summary.customers, 60);
        assert_eq!(summary.held, 40);
        assert_eq!(summary.turned_away, 20);
        assert!(summary.reserved <= summary.held);
        assert_eq!(venue.num_seats_available(), 0);
    }

    #[tokio::test]
    async fn small_rush_leaves_seats() {
        let venue = Arc::new(VenueSeating::new(&VenueConfig::new(2, 10), Arc::new(test_clock())).unwrap());

        let summary = ticket_rush(Arc::clone(&venue), 8).await.unwrap();

        assert_eq!(summary.held, 8);
        assert_eq!(summary.reserved, 6);
        assert_eq!(venue.num_seats_available(), 12);
    }
}
