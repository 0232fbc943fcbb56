//! Test utilities for the crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled only for tests or with the `test-support` feature.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::{Argon2CredentialStore, CredentialStore, HashingCost, ImportSleeper};

mod memory_store;

pub use memory_store::InMemoryStore;

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Start the clock at noon UTC on `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).map_or_else(Utc::now, |naive| naive.and_utc()))
    }

    /// Move the clock forward.
    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        *self.lock_clock() += TimeDelta::days(days);
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Argon2 store with the cheapest accepted parameters.
pub fn fast_credential_store() -> Arc<dyn CredentialStore> {
    match Argon2CredentialStore::new(HashingCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }) {
        Ok(store) => Arc::new(store),
        Err(error) => panic!("cheap hashing parameters rejected: {error}"),
    }
}

/// Sleeper that returns immediately and records requested delays.
#[derive(Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    /// Delays requested so far.
    pub fn calls(&self) -> Vec<Duration> {
        match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => panic!("sleeper mutex"),
        }
    }
}

#[async_trait]
impl ImportSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        match self.0.lock() {
            Ok(mut guard) => guard.push(duration),
            Err(_) => panic!("sleeper mutex"),
        }
    }
}
