//! Per-user kit usage: the in-memory ledger and its sled-backed profile store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::IVec;
use uuid::Uuid;

use crate::kits::errors::KitError;
use crate::kits::types::{kit_key, PROFILE_SCHEMA_VERSION};

const TREE_PROFILES: &str = "profiles";

/// Last-redeemed instant per kit, keyed case-insensitively.
///
/// Entries may outlive the kit they refer to; stale entries are harmless.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageLedger {
    entries: HashMap<String, DateTime<Utc>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_used(&self, kit_name: &str) -> Option<DateTime<Utc>> {
        self.entries.get(&kit_key(kit_name)).copied()
    }

    pub fn record(&mut self, kit_name: &str, at: DateTime<Utc>) {
        self.entries.insert(kit_key(kit_name), at);
    }

    /// Forget usage of one kit. Returns whether an entry existed.
    pub fn reset(&mut self, kit_name: &str) -> bool {
        self.entries.remove(&kit_key(kit_name)).is_some()
    }

    /// Forget usage of every kit, returning how many entries were cleared.
    pub fn reset_all(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        cleared
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The slice of a user's persistent profile this crate owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub uuid: Uuid,
    pub username: String,
    #[serde(default)]
    pub usage: UsageLedger,
    /// Set once the first-join kits have been handed out
    #[serde(default)]
    pub first_join_granted: bool,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserProfile {
    pub fn new(uuid: Uuid, username: &str) -> Self {
        Self {
            uuid,
            username: username.to_string(),
            usage: UsageLedger::new(),
            first_join_granted: false,
            updated_at: Utc::now(),
            schema_version: PROFILE_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct ProfileStoreBuilder {
    path: PathBuf,
    temporary: bool,
}

impl ProfileStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// Remove the database when the store is dropped.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn open(self) -> Result<ProfileStore, KitError> {
        std::fs::create_dir_all(&self.path)?;
        let db = sled::Config::new()
            .path(&self.path)
            .temporary(self.temporary)
            .open()?;
        ProfileStore::from_db(db)
    }
}

/// Sled-backed persistence for user profiles, independent of the kit store.
#[derive(Clone)]
pub struct ProfileStore {
    _db: sled::Db,
    profiles: sled::Tree,
}

impl ProfileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KitError> {
        ProfileStoreBuilder::new(path.as_ref()).open()
    }

    fn from_db(db: sled::Db) -> Result<Self, KitError> {
        let profiles = db.open_tree(TREE_PROFILES)?;
        Ok(Self { _db: db, profiles })
    }

    fn profile_key(uuid: &Uuid) -> Vec<u8> {
        format!("profiles:{}", uuid).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, KitError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, KitError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a profile.
    pub fn put_profile(&self, mut profile: UserProfile) -> Result<(), KitError> {
        profile.schema_version = PROFILE_SCHEMA_VERSION;
        profile.touch();
        let key = Self::profile_key(&profile.uuid);
        let bytes = Self::serialize(&profile)?;
        self.profiles.insert(key, bytes)?;
        self.profiles.flush()?;
        Ok(())
    }

    /// Fetch a profile by user id.
    pub fn get_profile(&self, uuid: &Uuid) -> Result<UserProfile, KitError> {
        let key = Self::profile_key(uuid);
        let Some(bytes) = self.profiles.get(&key)? else {
            return Err(KitError::NotFound(format!("profile: {}", uuid)));
        };
        let record: UserProfile = Self::deserialize(bytes)?;
        if record.schema_version != PROFILE_SCHEMA_VERSION {
            return Err(KitError::SchemaMismatch {
                entity: "profile",
                expected: PROFILE_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Fetch a profile, creating an empty one for first-time users.
    pub fn load_or_create(&self, uuid: &Uuid, username: &str) -> Result<UserProfile, KitError> {
        match self.get_profile(uuid) {
            Ok(profile) => Ok(profile),
            Err(KitError::NotFound(_)) => Ok(UserProfile::new(*uuid, username)),
            Err(e) => Err(e),
        }
    }

    pub fn list_profile_ids(&self) -> Result<Vec<Uuid>, KitError> {
        let mut ids = Vec::new();
        for entry in self.profiles.scan_prefix(b"profiles:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text.strip_prefix("profiles:") {
                if let Ok(uuid) = Uuid::parse_str(id) {
                    ids.push(uuid);
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn ledger_is_case_insensitive() {
        let mut ledger = UsageLedger::new();
        let now = Utc::now();
        ledger.record("Starter", now);
        assert_eq!(ledger.last_used("STARTER"), Some(now));
        assert!(ledger.reset("starter"));
        assert!(ledger.last_used("Starter").is_none());
    }

    #[test]
    fn reset_all_clears_everything() {
        let mut ledger = UsageLedger::new();
        ledger.record("a", Utc::now());
        ledger.record("b", Utc::now());
        assert_eq!(ledger.reset_all(), 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn store_round_trip_profile() {
        let dir = TempDir::new().expect("tempdir");
        let store = ProfileStoreBuilder::new(dir.path()).open().expect("store");
        let uuid = Uuid::new_v4();
        let used_at = Utc::now() - Duration::minutes(3);
        let mut profile = UserProfile::new(uuid, "alice");
        profile.usage.record("starter", used_at);
        store.put_profile(profile).expect("put");

        let fetched = store.get_profile(&uuid).expect("get");
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.usage.last_used("starter"), Some(used_at));
        assert_eq!(fetched.schema_version, PROFILE_SCHEMA_VERSION);
        assert_eq!(store.list_profile_ids().expect("ids"), vec![uuid]);
    }

    #[test]
    fn missing_profile_is_created_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = ProfileStoreBuilder::new(dir.path()).open().expect("store");
        let uuid = Uuid::new_v4();
        assert!(matches!(store.get_profile(&uuid), Err(KitError::NotFound(_))));
        let profile = store.load_or_create(&uuid, "bob").expect("profile");
        assert!(profile.usage.is_empty());
        assert!(!profile.first_join_granted);
    }
}
