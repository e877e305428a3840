//! Registry of live seat holds.
//!
//! Holds are looked up lazily: an entry whose `held_until` has passed is
//! reported as absent but stays in the map until a cleanup pass removes it.
//! Cleanup is opportunistic. When an insertion finds the map at 80% of the
//! configured soft capacity it dispatches a background pass, and at most one
//! pass runs at a time. Insertions never wait for it, so the map can briefly
//! exceed its soft capacity.

use crate::metrics;
use crate::types::{HoldId, SeatHold};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks seat holds by id with lazy expiry and single-flight cleanup.
///
/// Cloning is cheap and yields a handle onto the same registry.
#[derive(Debug, Clone)]
pub struct HeldSeatsTracker {
    holds: Arc<DashMap<HoldId, SeatHold>>,
    max_tracked_holds: usize,
    cleanup_running: Arc<AtomicBool>,
}

impl HeldSeatsTracker {
    /// Creates an empty tracker with the given soft capacity.
    #[must_use]
    pub fn new(max_tracked_holds: usize) -> Self {
        Self {
            holds: Arc::new(DashMap::with_capacity(max_tracked_holds)),
            max_tracked_holds,
            cleanup_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Soft capacity the cleanup threshold is derived from
    #[must_use]
    pub const fn max_tracked_holds(&self) -> usize {
        self.max_tracked_holds
    }

    /// Number of entries currently stored, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.holds.len()
    }

    /// Whether no entries are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holds.is_empty()
    }

    /// Whether a cleanup pass currently owns the cleanup token
    #[must_use]
    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup_running.load(Ordering::Acquire)
    }

    /// Registers `hold`, first dispatching a background cleanup if the map
    /// is at or above 80% of its soft capacity.
    pub fn add_seat_hold(&self, hold: SeatHold, now: DateTime<Utc>) {
        if self.near_capacity() {
            self.spawn_cleanup(now);
        }
        self.holds.insert(hold.id(), hold);
        metrics::record_tracked_holds(self.holds.len());
    }

    /// Returns the hold with `id` if it is stored and still live at `now`.
    ///
    /// Expired entries are reported as absent and left for cleanup.
    #[must_use]
    pub fn get_seat_hold(&self, id: HoldId, now: DateTime<Utc>) -> Option<SeatHold> {
        self.holds
            .get(&id)
            .and_then(|entry| entry.is_live_at(now).then(|| entry.value().clone()))
    }

    /// Removes every hold that expired before `now`, on the calling thread.
    ///
    /// Returns `None` without doing anything if another cleanup pass owns
    /// the token, otherwise the number of entries removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Option<usize> {
        let token = CleanupToken::try_acquire(&self.cleanup_running)?;
        let removed = purge(&self.holds, now);
        drop(token);
        Some(removed)
    }

    fn near_capacity(&self) -> bool {
        self.holds.len().saturating_mul(5) >= self.max_tracked_holds.saturating_mul(4)
    }

    fn spawn_cleanup(&self, now: DateTime<Utc>) {
        let Some(token) = CleanupToken::try_acquire(&self.cleanup_running) else {
            tracing::trace!("Hold cleanup already in flight");
            return;
        };

        let holds = Arc::clone(&self.holds);
        let task = move || {
            let _token = token;
            purge(&holds, now);
        };

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            drop(runtime.spawn_blocking(task));
        } else if let Err(error) = std::thread::Builder::new()
            .name("hold-cleanup".to_string())
            .spawn(task)
        {
            // the closure and its token were dropped, so the next trigger can retry
            tracing::warn!(%error, "Failed to spawn hold cleanup thread");
        }
    }
}

/// Scans the map and removes holds that expired before `now`.
///
/// Expired keys are collected under shard read locks, then removed one at a
/// time, so concurrent lookups and inserts are never held up for a full pass.
fn purge(holds: &DashMap<HoldId, SeatHold>, now: DateTime<Utc>) -> usize {
    let expired: Vec<HoldId> = holds
        .iter()
        .filter(|entry| entry.held_until() < now)
        .map(|entry| *entry.key())
        .collect();

    let removed = expired
        .into_iter()
        .filter(|id| holds.remove_if(id, |_, hold| hold.held_until() < now).is_some())
        .count();

    tracing::info!(removed, remaining = holds.len(), "Purged expired seat holds");
    metrics::record_hold_cleanup(removed, holds.len());
    removed
}

/// Single-owner cleanup token. Released on drop, including during unwinding.
struct CleanupToken(Arc<AtomicBool>);

impl CleanupToken {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for CleanupToken {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
