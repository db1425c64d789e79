use std::path::{Path, PathBuf};

use chrono::Utc;
use sled::IVec;
use uuid::Uuid;

use crate::economy::errors::EconomyError;
use crate::economy::state::default_achievement_catalog;
use crate::economy::types::{
    AchievementRecord, MallEvent, ReceiptRecord, UserRecord, ACHIEVEMENT_SCHEMA_VERSION,
    EVENT_SCHEMA_VERSION, RECEIPT_SCHEMA_VERSION, USER_SCHEMA_VERSION,
};

const TREE_PRIMARY: &str = "mallpoints";
const TREE_RECEIPTS: &str = "mallpoints_receipts";
const TREE_CATALOG: &str = "mallpoints_catalog";
const TREE_AUDIT: &str = "mallpoints_audit";
const TREE_CACHE: &str = "mallpoints_cache";

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct MallStoreBuilder {
    path: PathBuf,
    seed_catalog: bool,
}

impl MallStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_catalog: true,
        }
    }

    /// Opt out of seeding the achievement catalog during initialization
    /// (useful for targeted tests).
    pub fn without_catalog_seed(mut self) -> Self {
        self.seed_catalog = false;
        self
    }

    pub fn open(self) -> Result<MallStore, EconomyError> {
        MallStore::open_with_options(self.path, self.seed_catalog)
    }
}

/// Sled-backed persistence for accounts, receipts, events, and the
/// achievement catalog. This is the single source of record; every other
/// in-memory view of these entities is a cache.
pub struct MallStore {
    _db: sled::Db,
    primary: sled::Tree,
    receipts: sled::Tree,
    catalog: sled::Tree,
    audit: sled::Tree,
    cache: sled::Tree,
}

impl MallStore {
    /// Open (or create) the store rooted at `path`. When `seed_catalog` is
    /// true the default achievement catalog is inserted if none exists yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EconomyError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(
        path: P,
        seed_catalog: bool,
    ) -> Result<Self, EconomyError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let receipts = db.open_tree(TREE_RECEIPTS)?;
        let catalog = db.open_tree(TREE_CATALOG)?;
        let audit = db.open_tree(TREE_AUDIT)?;
        let cache = db.open_tree(TREE_CACHE)?;
        let store = Self {
            _db: db,
            primary,
            receipts,
            catalog,
            audit,
            cache,
        };

        if seed_catalog {
            store.seed_catalog_if_needed()?;
        }

        Ok(store)
    }

    fn user_key(username: &str) -> Vec<u8> {
        format!("users:{}", username.to_ascii_lowercase()).into_bytes()
    }

    fn receipt_key(username: &str, id: &Uuid) -> Vec<u8> {
        format!("receipts:{}:{}", username.to_ascii_lowercase(), id).into_bytes()
    }

    fn event_key(event_id: &str) -> Vec<u8> {
        format!("events:{}", event_id).into_bytes()
    }

    fn achievement_key(id: &str) -> Vec<u8> {
        format!("achievements:{}", id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, EconomyError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, EconomyError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a user record.
    pub fn put_user(&self, mut user: UserRecord) -> Result<(), EconomyError> {
        user.schema_version = USER_SCHEMA_VERSION;
        user.touch();
        let key = Self::user_key(&user.username);
        let bytes = Self::serialize(&user)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a user record by username.
    pub fn get_user(&self, username: &str) -> Result<UserRecord, EconomyError> {
        let key = Self::user_key(username);
        let Some(bytes) = self.primary.get(&key)? else {
            return Err(EconomyError::NotFound(format!("user: {}", username)));
        };
        let record: UserRecord = Self::deserialize(bytes)?;
        if record.schema_version != USER_SCHEMA_VERSION {
            return Err(EconomyError::SchemaMismatch {
                entity: "user",
                expected: USER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn user_exists(&self, username: &str) -> Result<bool, EconomyError> {
        Ok(self.primary.contains_key(Self::user_key(username))?)
    }

    /// List all usernames currently stored.
    pub fn list_usernames(&self) -> Result<Vec<String>, EconomyError> {
        let mut ids = Vec::new();
        for entry in self.primary.scan_prefix(b"users:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(username) = text.strip_prefix("users:") {
                ids.push(username.to_string());
            }
        }
        Ok(ids)
    }

    /// Load every user record. Leaderboards and maintenance sweeps scan the
    /// whole membership; a single mall's roster stays small enough for that.
    pub fn all_users(&self) -> Result<Vec<UserRecord>, EconomyError> {
        let mut users = Vec::new();
        for entry in self.primary.scan_prefix(b"users:") {
            let (_, bytes) = entry?;
            users.push(Self::deserialize(bytes)?);
        }
        Ok(users)
    }

    /// Insert or update a receipt.
    pub fn put_receipt(&self, mut receipt: ReceiptRecord) -> Result<(), EconomyError> {
        receipt.schema_version = RECEIPT_SCHEMA_VERSION;
        let key = Self::receipt_key(&receipt.username, &receipt.id);
        let bytes = Self::serialize(&receipt)?;
        self.receipts.insert(key, bytes)?;
        self.receipts.flush()?;
        Ok(())
    }

    pub fn get_receipt(&self, username: &str, id: &Uuid) -> Result<ReceiptRecord, EconomyError> {
        let key = Self::receipt_key(username, id);
        let Some(bytes) = self.receipts.get(&key)? else {
            return Err(EconomyError::NotFound(format!("receipt: {}", id)));
        };
        let record: ReceiptRecord = Self::deserialize(bytes)?;
        if record.schema_version != RECEIPT_SCHEMA_VERSION {
            return Err(EconomyError::SchemaMismatch {
                entity: "receipt",
                expected: RECEIPT_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// List a member's receipts, newest first.
    pub fn list_receipts(&self, username: &str) -> Result<Vec<ReceiptRecord>, EconomyError> {
        let prefix = format!("receipts:{}:", username.to_ascii_lowercase());
        let mut receipts = Vec::new();
        for entry in self.receipts.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            receipts.push(Self::deserialize::<ReceiptRecord>(bytes)?);
        }
        receipts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(receipts)
    }

    /// Insert or update a promotional event.
    pub fn put_event(&self, mut event: MallEvent) -> Result<(), EconomyError> {
        event.schema_version = EVENT_SCHEMA_VERSION;
        let key = Self::event_key(&event.id);
        let bytes = Self::serialize(&event)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_event(&self, event_id: &str) -> Result<MallEvent, EconomyError> {
        let key = Self::event_key(event_id);
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(EconomyError::NotFound(format!("event: {}", event_id)));
        };
        Ok(Self::deserialize(bytes)?)
    }

    pub fn list_events(&self) -> Result<Vec<MallEvent>, EconomyError> {
        let mut events = Vec::new();
        for entry in self.catalog.scan_prefix(b"events:") {
            let (_, bytes) = entry?;
            events.push(Self::deserialize::<MallEvent>(bytes)?);
        }
        Ok(events)
    }

    /// Insert or update an achievement definition.
    pub fn put_achievement(&self, mut record: AchievementRecord) -> Result<(), EconomyError> {
        record.schema_version = ACHIEVEMENT_SCHEMA_VERSION;
        let key = Self::achievement_key(&record.id);
        let bytes = Self::serialize(&record)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn get_achievement(&self, id: &str) -> Result<AchievementRecord, EconomyError> {
        let key = Self::achievement_key(id);
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(EconomyError::NotFound(format!("achievement: {}", id)));
        };
        Ok(Self::deserialize(bytes)?)
    }

    pub fn list_achievements(&self) -> Result<Vec<AchievementRecord>, EconomyError> {
        let mut records = Vec::new();
        for entry in self.catalog.scan_prefix(b"achievements:") {
            let (_, bytes) = entry?;
            records.push(Self::deserialize::<AchievementRecord>(bytes)?);
        }
        Ok(records)
    }

    /// Seed the default achievement catalog on first open.
    pub fn seed_catalog_if_needed(&self) -> Result<usize, EconomyError> {
        if self
            .catalog
            .scan_prefix(b"achievements:")
            .next()
            .is_some()
        {
            return Ok(0);
        }
        let mut inserted = 0usize;
        for record in default_achievement_catalog() {
            self.put_achievement(record)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Append a line to the audit log tree (admin actions, voids, adjustments).
    pub fn append_audit(&self, message: &str) -> Result<(), EconomyError> {
        let key = format!("audit:{}", next_timestamp_nanos()).into_bytes();
        self.audit.insert(key, message.as_bytes())?;
        self.audit.flush()?;
        Ok(())
    }

    /// Read recent audit lines, newest last.
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<String>, EconomyError> {
        let mut lines = Vec::new();
        for entry in self.audit.scan_prefix(b"audit:") {
            let (_, bytes) = entry?;
            lines.push(String::from_utf8_lossy(&bytes).to_string());
        }
        let start = lines.len().saturating_sub(limit);
        Ok(lines.split_off(start))
    }

    // Raw cache-tier accessors used by the tiered cache's persistent fallback.

    pub(crate) fn cache_put(&self, key: &[u8], value: &[u8]) -> Result<(), EconomyError> {
        self.cache.insert(key, value)?;
        Ok(())
    }

    pub(crate) fn cache_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EconomyError> {
        Ok(self.cache.get(key)?.map(|v| v.to_vec()))
    }

    pub(crate) fn cache_remove(&self, key: &[u8]) -> Result<(), EconomyError> {
        self.cache.remove(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::types::{RewardBreakdown, StoreCategory};
    use tempfile::TempDir;

    fn breakdown(total: u64) -> RewardBreakdown {
        RewardBreakdown {
            base_coins: total,
            category_mult: 1.0,
            vip_mult: 1.0,
            time_mult: 1.0,
            streak_mult: 1.0,
            event_mult: 1.0,
            total_coins: total,
            total_xp: total / 2,
        }
    }

    #[test]
    fn store_round_trip_user() {
        let dir = TempDir::new().expect("tempdir");
        let store = MallStoreBuilder::new(dir.path()).open().expect("store");
        let mut user = UserRecord::new("alice", "Alice", "hash");
        user.coins = 42;
        store.put_user(user.clone()).expect("put");
        let fetched = store.get_user("alice").expect("get");
        assert_eq!(fetched.username, user.username);
        assert_eq!(fetched.coins, 42);
        assert_eq!(fetched.schema_version, USER_SCHEMA_VERSION);
        drop(store);
    }

    #[test]
    fn usernames_are_case_insensitive_keys() {
        let dir = TempDir::new().expect("tempdir");
        let store = MallStoreBuilder::new(dir.path()).open().expect("store");
        store
            .put_user(UserRecord::new("Alice", "Alice", "hash"))
            .expect("put");
        assert!(store.user_exists("alice").expect("exists"));
        assert!(store.get_user("ALICE").is_ok());
    }

    #[test]
    fn catalog_seeding_only_happens_once() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = MallStoreBuilder::new(dir.path()).open().expect("store");
            assert!(!store.list_achievements().expect("list").is_empty());
        }

        let store = MallStoreBuilder::new(dir.path())
            .without_catalog_seed()
            .open()
            .expect("reopen store");
        let count = store.seed_catalog_if_needed().expect("seed check");
        assert_eq!(count, 0, "should not reseed when catalog already exists");
    }

    #[test]
    fn receipts_list_newest_first() {
        let dir = TempDir::new().expect("tempdir");
        let store = MallStoreBuilder::new(dir.path()).open().expect("store");

        let first = ReceiptRecord::new("bob", "Zara", StoreCategory::Fashion, 100, breakdown(10));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = ReceiptRecord::new("bob", "Carrefour", StoreCategory::Groceries, 50, breakdown(5));
        store.put_receipt(first.clone()).expect("put first");
        store.put_receipt(second.clone()).expect("put second");

        let receipts = store.list_receipts("bob").expect("list");
        assert_eq!(receipts.len(), 2);
        assert_eq!(receipts[0].id, second.id);
        assert_eq!(receipts[1].id, first.id);
    }

    #[test]
    fn missing_user_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = MallStoreBuilder::new(dir.path()).open().expect("store");
        match store.get_user("ghost") {
            Err(EconomyError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|u| u.username)),
        }
    }
}
