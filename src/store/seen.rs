// src/store/seen.rs
//! Durable dedup set: which posting ids have already been surfaced.
//!
//! Invariants: an id, once committed, is never removed for the life of the
//! process (no re-notification); `filter_new` persists the grown set BEFORE
//! returning, so a crash after commit cannot re-surface a posting, and a
//! crash before commit re-surfaces it for re-evaluation next cycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::posting::{Posting, Source};
use crate::store::{write_json_atomic, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenEntry {
    pub source: Source,
    pub first_seen_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    seen: Mutex<HashMap<String, SeenEntry>>,
}

impl SeenStore {
    /// Load from disk; a missing file is an empty store, a corrupt file is an
    /// error (better to fail startup than to re-notify everything).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let seen = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            seen: Mutex::new(seen),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("seen store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pure membership query.
    pub fn contains(&self, id: &str) -> bool {
        self.seen
            .lock()
            .expect("seen store mutex poisoned")
            .contains_key(id)
    }

    /// Return the postings whose id is not yet in the set, recording all
    /// returned ids as seen. The grown set is durably persisted before this
    /// returns; on a persistence failure the in-memory set is rolled back and
    /// the whole batch is rejected, so the caller's cycle aborts cleanly.
    pub fn filter_new(&self, postings: Vec<Posting>) -> Result<Vec<Posting>, StoreError> {
        let mut guard = self.seen.lock().expect("seen store mutex poisoned");

        let mut fresh = Vec::new();
        let mut next = guard.clone();
        for posting in postings {
            if next.contains_key(&posting.id) {
                continue;
            }
            next.insert(
                posting.id.clone(),
                SeenEntry {
                    source: posting.source,
                    first_seen_at: posting.first_seen_at,
                },
            );
            fresh.push(posting);
        }

        if fresh.is_empty() {
            return Ok(fresh);
        }

        write_json_atomic(&self.path, &next)?;
        *guard = next;
        Ok(fresh)
    }
}
