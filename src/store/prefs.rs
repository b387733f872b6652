// src/store/prefs.rs
//! Durable per-user preference records. One record per user id; the whole
//! file is overwritten on each mutation, matching the seen-store's atomic
//! write discipline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::preferences::Preferences;
use crate::store::{write_json_atomic, StoreError};

#[derive(Debug)]
pub struct PrefsStore {
    path: PathBuf,
    users: Mutex<HashMap<u64, Preferences>>,
}

impl PrefsStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let users: HashMap<u64, Preferences> = match std::fs::read_to_string(&path) {
            // Keys are strings on disk (JSON object), u64 in memory.
            Ok(s) => {
                let raw: HashMap<String, Preferences> = serde_json::from_str(&s)?;
                raw.into_iter()
                    .filter_map(|(k, v)| k.parse::<u64>().ok().map(|id| (id, v)))
                    .collect()
            }
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
            users: Mutex::new(users),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current record for the user, or a fresh default (not yet persisted —
    /// a user exists on disk only after their first mutation).
    pub fn get(&self, user_id: u64) -> Preferences {
        self.users
            .lock()
            .expect("prefs store mutex poisoned")
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Preferences::new(user_id))
    }

    /// Apply a mutation to the user's record and persist the full file.
    pub fn update(
        &self,
        user_id: u64,
        mutate: impl FnOnce(&mut Preferences),
    ) -> Result<Preferences, StoreError> {
        let mut guard = self.users.lock().expect("prefs store mutex poisoned");

        let mut record = guard
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Preferences::new(user_id));
        mutate(&mut record);

        let mut next = guard.clone();
        next.insert(user_id, record.clone());

        let on_disk: HashMap<String, &Preferences> =
            next.iter().map(|(k, v)| (k.to_string(), v)).collect();
        write_json_atomic(&self.path, &on_disk)?;

        *guard = next;
        Ok(record)
    }

    /// Snapshot of every active user's record, in stable user-id order.
    pub fn all_active(&self) -> Vec<Preferences> {
        let guard = self.users.lock().expect("prefs store mutex poisoned");
        let mut out: Vec<Preferences> =
            guard.values().filter(|p| p.is_active).cloned().collect();
        out.sort_by_key(|p| p.user_id);
        out
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().expect("prefs store mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::NotificationFrequency;

    #[test]
    fn update_creates_and_persists_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        {
            let store = PrefsStore::load(&path).unwrap();
            store
                .update(42, |p| {
                    p.add_category("backend");
                    p.set_notification_frequency(NotificationFrequency::Daily);
                })
                .unwrap();
        }

        let reopened = PrefsStore::load(&path).unwrap();
        let p = reopened.get(42);
        assert!(p.categories.contains("backend"));
        assert_eq!(p.notification_frequency, NotificationFrequency::Daily);
    }

    #[test]
    fn get_without_update_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::load(dir.path().join("prefs.json")).unwrap();
        let _ = store.get(7);
        assert_eq!(store.user_count(), 0);
        assert!(store.all_active().is_empty());
    }

    #[test]
    fn inactive_users_are_skipped_by_matching_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::load(dir.path().join("prefs.json")).unwrap();
        store.update(1, |p| p.add_category("backend")).unwrap();
        store.update(2, |p| p.is_active = false).unwrap();

        let active = store.all_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, 1);
    }
}
