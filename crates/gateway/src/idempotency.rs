//! Single-flight idempotency records.
//!
//! A key is either in flight, in which case duplicates join the running
//! invocation, or completed, in which case duplicates replay the recorded
//! outcome until the retention window passes. The check and the claim for a
//! key happen under one map entry lock, so concurrent duplicates can never
//! both start a handler.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use {
    dashmap::{DashMap, mapref::entry::Entry},
    futures::future::{BoxFuture, Shared},
    tokio::time::Instant,
};

use crate::outcome::Outcome;

/// Run a sweep of expired records every N completions.
const CLEANUP_EVERY_COMPLETIONS: u64 = 256;

/// Handle to an invocation that every duplicate can await.
pub type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;

enum Record {
    InFlight(SharedOutcome),
    Completed {
        outcome: Outcome,
        completed_at: Instant,
    },
}

/// Result of looking up a key.
pub enum Claim {
    /// Completed within the retention window.
    Replay(Outcome),
    /// Another delivery of this key is being processed.
    Join(SharedOutcome),
    /// This delivery owns the key and started the invocation.
    Started(SharedOutcome),
}

pub struct IdempotencyStore {
    records: DashMap<String, Record>,
    ttl: Duration,
    max_entries: usize,
    completions: AtomicU64,
}

impl IdempotencyStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            completions: AtomicU64::new(0),
        }
    }

    /// Replay, join, or claim `key`. `start` runs only when claiming, while
    /// the key is still locked.
    pub fn claim<F>(&self, key: &str, start: F) -> Claim
    where
        F: FnOnce() -> SharedOutcome,
    {
        let now = Instant::now();
        match self.records.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                match occupied.get() {
                    Record::InFlight(shared) => return Claim::Join(shared.clone()),
                    Record::Completed {
                        outcome,
                        completed_at,
                    } if now.saturating_duration_since(*completed_at) < self.ttl => {
                        return Claim::Replay(outcome.clone());
                    },
                    Record::Completed { .. } => {},
                }
                let shared = start();
                occupied.insert(Record::InFlight(shared.clone()));
                Claim::Started(shared)
            },
            Entry::Vacant(vacant) => {
                let shared = start();
                vacant.insert(Record::InFlight(shared.clone()));
                Claim::Started(shared)
            },
        }
    }

    /// Settle an in-flight key. Retryable failures are forgotten so the
    /// next delivery runs the handler again.
    pub fn complete(&self, key: &str, outcome: &Outcome) {
        if outcome.is_retryable() {
            self.records.remove(key);
        } else {
            self.records.insert(key.to_owned(), Record::Completed {
                outcome: outcome.clone(),
                completed_at: Instant::now(),
            });
            self.evict_over_capacity();
        }
        self.cleanup_if_needed();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop completed records older than the retention window.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.records.retain(|_, record| match record {
            Record::InFlight(_) => true,
            Record::Completed { completed_at, .. } => {
                now.saturating_duration_since(*completed_at) < ttl
            },
        });
    }

    fn cleanup_if_needed(&self) {
        let n = self.completions.fetch_add(1, Ordering::Relaxed) + 1;
        if n % CLEANUP_EVERY_COMPLETIONS == 0 {
            self.purge_expired();
        }
    }

    /// In-flight records are never evicted; only the oldest completed ones.
    fn evict_over_capacity(&self) {
        while self.records.len() > self.max_entries {
            let oldest = self
                .records
                .iter()
                .filter_map(|entry| match entry.value() {
                    Record::Completed { completed_at, .. } => {
                        Some((entry.key().clone(), *completed_at))
                    },
                    Record::InFlight(_) => None,
                })
                .min_by_key(|(_, completed_at)| *completed_at)
                .map(|(key, _)| key);
            match oldest {
                Some(key) => {
                    self.records.remove(&key);
                },
                None => break,
            }
        }
    }
}
