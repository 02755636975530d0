use std::sync::Mutex;

use crate::error::{Result, StoreError};
use crate::models::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Chirp,
    User,
}

/// Per-collection id sequences. Each counter holds the last id handed out.
#[derive(Debug, Default)]
pub struct IdAllocator {
    chirps: Mutex<i64>,
    users: Mutex<i64>,
}

impl IdAllocator {
    /// Start each sequence at the highest id already present in `doc`.
    pub fn seeded(doc: &Document) -> Self {
        let last_chirp = doc.chirps.keys().next_back().copied().unwrap_or(0);
        let last_user = doc.users.keys().next_back().copied().unwrap_or(0);
        Self {
            chirps: Mutex::new(last_chirp),
            users: Mutex::new(last_user),
        }
    }

    pub fn next(&self, kind: EntityKind) -> Result<i64> {
        let mut last = self.counter(kind).lock().map_err(|_| StoreError::LockPoisoned)?;
        *last += 1;
        Ok(*last)
    }

    pub fn last(&self, kind: EntityKind) -> Result<i64> {
        let last = self.counter(kind).lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(*last)
    }

    fn counter(&self, kind: EntityKind) -> &Mutex<i64> {
        match kind {
            EntityKind::Chirp => &self.chirps,
            EntityKind::User => &self.users,
        }
    }
}
