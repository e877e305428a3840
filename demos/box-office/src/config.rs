//! Configuration management for the box office demo.
//!
//! Loads configuration from environment variables with sensible defaults.

use box_office_core::VenueConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,box_office_core=debug";

/// Demo configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Venue dimensions and hold policy
    pub venue: VenueConfig,
    /// Customers in the ticket rush (default: 1.5 × capacity)
    pub rush_customers: usize,
    /// Tracing filter directives
    pub log_filter: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Unset or unparsable variables fall back to their defaults:
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BOX_OFFICE_NUM_ROWS` | 30 |
    /// | `BOX_OFFICE_SEATS_PER_ROW` | 20 |
    /// | `BOX_OFFICE_HOLD_SECONDS` | 900 |
    /// | `BOX_OFFICE_MAX_TRACKED_HOLDS` | rows × seats |
    /// | `BOX_OFFICE_LOCK_TIMEOUT_MS` | unset (wait indefinitely) |
    /// | `BOX_OFFICE_RUSH_CUSTOMERS` | 1.5 × capacity |
    /// | `RUST_LOG` | `info,box_office_core=debug` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = VenueConfig::default();
        let num_rows = parsed(&lookup, "BOX_OFFICE_NUM_ROWS").unwrap_or(defaults.num_rows);
        let seats_per_row = parsed(&lookup, "BOX_OFFICE_SEATS_PER_ROW").unwrap_or(defaults.seats_per_row);

        let mut venue = VenueConfig::new(num_rows, seats_per_row)
            .with_hold_duration_seconds(
                parsed(&lookup, "BOX_OFFICE_HOLD_SECONDS").unwrap_or(defaults.hold_duration_seconds),
            )
            .with_lock_timeout(parsed(&lookup, "BOX_OFFICE_LOCK_TIMEOUT_MS").map(Duration::from_millis));
        if let Some(max_tracked_holds) = parsed(&lookup, "BOX_OFFICE_MAX_TRACKED_HOLDS") {
            venue = venue.with_max_tracked_holds(max_tracked_holds);
        }

        let capacity = venue.capacity();
        Self {
            rush_customers: parsed(&lookup, "BOX_OFFICE_RUSH_CUSTOMERS")
                .unwrap_or_else(|| capacity.saturating_add(capacity / 2)),
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            venue,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_describe_the_standard_house() {
        let config = Config::default();
        assert_eq!(config.venue, VenueConfig::default());
        assert_eq!(config.rush_customers, 900);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn variables_override_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("BOX_OFFICE_NUM_ROWS", "4"),
            ("BOX_OFFICE_SEATS_PER_ROW", " 10 "),
            ("BOX_OFFICE_HOLD_SECONDS", "120"),
            ("BOX_OFFICE_LOCK_TIMEOUT_MS", "250"),
            ("BOX_OFFICE_RUSH_CUSTOMERS", "7"),
            ("RUST_LOG", "warn"),
        ]));

        assert_eq!(config.venue.capacity(), 40);
        assert_eq!(config.venue.max_tracked_holds, 40);
        assert_eq!(config.venue.hold_duration_seconds, 120);
        assert_eq!(config.venue.lock_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.rush_customers, 7);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn unparsable_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("BOX_OFFICE_NUM_ROWS", "lots"),
            ("BOX_OFFICE_MAX_TRACKED_HOLDS", "-3"),
        ]));

        assert_eq!(config.venue.num_rows, 30);
        assert_eq!(config.venue.max_tracked_holds, 600);
    }

    #[test]
    fn zero_rows_load_but_fail_validation() {
        let config = Config::from_lookup(lookup_from(&[("BOX_OFFICE_NUM_ROWS", "0")]));
        assert!(config.venue.validate().is_err());
    }
}
