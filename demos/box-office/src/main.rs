//! Box Office Demo
//!
//! Command-line demonstration of the seating core showing:
//! - A single customer holding and buying a block of seats
//! - A concurrent ticket rush that oversubscribes the venue
//! - The seat map now and once every hold has lapsed
//! - The seating metrics in Prometheus text format
//!
//! # Usage
//!
//! ```bash
//! BOX_OFFICE_NUM_ROWS=10 BOX_OFFICE_SEATS_PER_ROW=12 cargo run --bin box-office
//! ```

mod config;
mod rush;

use anyhow::Context;
use box_office_core::environment::{Clock, SystemClock};
use box_office_core::metrics::register_metrics;
use box_office_core::{SeatStatus, VenueSeating};
use chrono::{DateTime, TimeDelta, Utc};
use config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FIRST_CUSTOMER: &str = "first-in-line@example.com";
const FIRST_BLOCK: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    register_metrics();

    println!("\n🎫 ============================================");
    println!("   Box Office - Live Demo");
    println!("============================================\n");

    let clock = SystemClock;
    let venue = Arc::new(
        VenueSeating::new(&config.venue, Arc::new(clock)).context("invalid venue configuration")?,
    );
    println!(
        "⚙️  Venue: {} rows × {} seats, holds last {}s",
        config.venue.num_rows, config.venue.seats_per_row, config.venue.hold_duration_seconds
    );
    println!("   Seats available: {}\n", venue.num_seats_available());

    println!("📋 Scenario 1: one customer buys {FIRST_BLOCK} seats");
    match venue.find_and_hold_seats(FIRST_BLOCK, FIRST_CUSTOMER)? {
        Some(hold) => {
            let seats: Vec<String> = hold.seat_ids().iter().map(ToString::to_string).collect();
            println!("   ✓ Hold {} on seats {} until {}", hold.id(), seats.join(", "), hold.held_until());
            let outcome = venue.reserve_seats(hold.id(), FIRST_CUSTOMER)?;
            println!("   ✓ Reservation: {outcome}");
        },
        None => println!("   ✗ No row has {FIRST_BLOCK} seats together"),
    }
    println!("   Seats available: {}\n", venue.num_seats_available());

    println!("📋 Scenario 2: ticket rush with {} customers", config.rush_customers);
    let summary = rush::ticket_rush(Arc::clone(&venue), config.rush_customers).await?;
    println!(
        "   ✓ {} held, {} reserved, {} turned away\n",
        summary.held, summary.reserved, summary.turned_away
    );

    let now = clock.now();
    let tomorrow = now + TimeDelta::days(1);
    println!(
        "🗺️  Seat map now ({} = free, {} = held, {} = sold)",
        SeatStatus::Available.symbol(),
        SeatStatus::Held.symbol(),
        SeatStatus::Reserved.symbol()
    );
    print_seat_map(&venue, now);
    println!("\n   Seats available now:      {}", venue.num_seats_available_at(now));
    println!("   Seats available tomorrow: {}\n", venue.num_seats_available_at(tomorrow));

    println!("📈 Metrics");
    println!("{}", prometheus.render());

    Ok(())
}

fn print_seat_map(venue: &VenueSeating, time: DateTime<Utc>) {
    for (row, statuses) in venue.seat_map_at(time).iter().enumerate() {
        let line: String = statuses.iter().map(|status| status.symbol()).collect();
        println!("   {row:>3} | {line}");
    }
}
