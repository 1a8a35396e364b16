//! Shared fixtures for the backend integration tests.
//!
//! Each integration test file is compiled as its own crate, so helpers used by
//! only one of them would otherwise warn as dead code.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use backend::store::{
    InMemoryTaskStore, RedisTaskStore, SharedClock, SharedStore, SqliteTaskStore,
};
use chrono::{DateTime, Local, Utc};
use mockable::Clock;
use uuid::Uuid;

pub const EPOCH_MILLIS: i64 = 1_700_000_000_000;

/// Clock that moves forward one second on every reading, so consecutive
/// mutations always get distinct timestamps.
#[derive(Debug)]
pub struct SteppingClock {
    next_millis: AtomicI64,
}

impl SteppingClock {
    pub fn starting_at(millis: i64) -> Self {
        Self {
            next_millis: AtomicI64::new(millis),
        }
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let millis = self.next_millis.fetch_add(1_000, Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

/// Clock stuck at one instant, for exercising ties on `created_at`.
#[derive(Debug)]
pub struct FrozenClock(pub DateTime<Utc>);

impl Clock for FrozenClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn stepping_clock() -> SharedClock {
    Arc::new(SteppingClock::starting_at(EPOCH_MILLIS))
}

pub fn frozen_clock() -> SharedClock {
    Arc::new(FrozenClock(
        DateTime::from_timestamp_millis(EPOCH_MILLIS).unwrap(),
    ))
}

/// Store backends under test. `Redis` only runs when `REDIS_URL` points at a
/// server; each store gets its own key namespace.
#[derive(Debug, Clone, Copy)]
pub enum Backend {
    Memory,
    Sqlite,
    Redis,
}

impl Backend {
    /// `None` when the backend's service is not configured for this run.
    pub async fn open(self, clock: SharedClock) -> Option<SharedStore> {
        let store: SharedStore = match self {
            Backend::Memory => Arc::new(InMemoryTaskStore::new(clock)),
            Backend::Sqlite => Arc::new(
                SqliteTaskStore::in_memory(clock)
                    .await
                    .expect("in-memory sqlite store"),
            ),
            Backend::Redis => {
                let url = std::env::var("REDIS_URL").ok()?;
                let namespace = format!("test:{}:", Uuid::new_v4());
                Arc::new(
                    RedisTaskStore::connect_namespaced(&url, &namespace, clock)
                        .await
                        .expect("redis store at REDIS_URL"),
                )
            }
        };
        Some(store)
    }
}
