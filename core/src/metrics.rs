//! Seating metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding process installs a recorder.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `box_office_holds_total{outcome}` - Hold requests by outcome (held, unavailable)
//! - `box_office_held_seats_total` - Seats placed on hold
//! - `box_office_reservations_total{outcome}` - Reservations by outcome
//!   (success, or the rejection reason)
//! - `box_office_hold_cleanups_total` - Completed cleanup passes
//! - `box_office_holds_purged_total` - Expired holds removed by cleanup
//!
//! ## Gauges
//! - `box_office_tracked_holds` - Entries in the hold registry, expired ones included

use crate::types::ReservationRejection;
use metrics::{describe_counter, describe_gauge};

/// Registers descriptions for every seating metric.
///
/// Call once at startup, after installing a recorder.
pub fn register_metrics() {
    describe_counter!(
        "box_office_holds_total",
        "Hold requests by outcome (held, unavailable)"
    );
    describe_counter!(
        "box_office_held_seats_total",
        "Total number of seats placed on hold"
    );
    describe_counter!(
        "box_office_reservations_total",
        "Reservation requests by outcome (success or rejection reason)"
    );
    describe_counter!(
        "box_office_hold_cleanups_total",
        "Completed cleanup passes over the hold registry"
    );
    describe_counter!(
        "box_office_holds_purged_total",
        "Expired holds removed from the registry"
    );
    describe_gauge!(
        "box_office_tracked_holds",
        "Entries currently stored in the hold registry"
    );

    tracing::info!("Seating metrics registered");
}

/// Record a successful hold of `num_seats` seats.
pub fn record_hold_placed(num_seats: usize) {
    metrics::counter!("box_office_holds_total", "outcome" => "held").increment(1);
    metrics::counter!("box_office_held_seats_total").increment(num_seats as u64);
}

/// Record a hold request no row could satisfy.
pub fn record_hold_unavailable() {
    metrics::counter!("box_office_holds_total", "outcome" => "unavailable").increment(1);
}

/// Record a completed reservation.
pub fn record_reservation_succeeded() {
    metrics::counter!("box_office_reservations_total", "outcome" => "success").increment(1);
}

/// Record a refused reservation.
pub fn record_reservation_rejected(rejection: ReservationRejection) {
    metrics::counter!("box_office_reservations_total", "outcome" => rejection.as_str()).increment(1);
}

/// Record the current size of the hold registry.
#[allow(clippy::cast_precision_loss)]
pub fn record_tracked_holds(tracked: usize) {
    metrics::gauge!("box_office_tracked_holds").set(tracked as f64);
}

/// Record a finished cleanup pass.
#[allow(clippy::cast_precision_loss)]
pub fn record_hold_cleanup(removed: usize, remaining: usize) {
    metrics::counter!("box_office_hold_cleanups_total").increment(1);
    metrics::counter!("box_office_holds_purged_total").increment(removed as u64);
    metrics::gauge!("box_office_tracked_holds").set(remaining as f64);
}
