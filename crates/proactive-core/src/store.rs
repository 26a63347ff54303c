//! Key-value stores with per-key expiry.
//!
//! `RedbStore` is the durable implementation used by the CLI. A single `KV`
//! table maps the key to a JSON envelope:
//! ```text
//! { "value": <json>, "expires_at": <rfc3339 | null> }
//! ```
//! Reads treat an envelope past `expires_at` as absent; `purge_expired`
//! removes them physically.
//!
//! `MemoryStore` has the same semantics without touching disk.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::collaborators::KeyValueStore;
use crate::error::{ProactiveError, Result};

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

/// Key: UTF-8 key string. Value: JSON-encoded `Envelope`.
const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    value: serde_json::Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Envelope {
    fn new(value: serde_json::Value, ttl: Duration, now: DateTime<Utc>) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d));
        Self { value, expires_at }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

fn store_err(e: impl std::fmt::Display) -> ProactiveError {
    ProactiveError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the redb database at `path`.
    ///
    /// Creates the `KV` table if it doesn't already exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(KV).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }

    fn read_envelope(&self, key: &str) -> Result<Option<Envelope>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(KV).map_err(store_err)?;
        let Some(raw) = table.get(key).map_err(store_err)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(raw.value())?))
    }

    fn write_envelope(&self, key: &str, envelope: &Envelope) -> Result<()> {
        let bytes = serde_json::to_vec(envelope)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(KV).map_err(store_err)?;
            table.insert(key, bytes.as_slice()).map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Result<Option<serde_json::Value>> {
        Ok(self
            .read_envelope(key)?
            .filter(|e| e.is_live(now))
            .map(|e| e.value))
    }

    pub fn set_at(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.write_envelope(key, &Envelope::new(value, ttl, now))
    }

    /// Delete every expired entry. Returns the number removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<u32> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let mut removed = 0u32;
        {
            let mut table = wt.open_table(KV).map_err(store_err)?;
            let mut expired = Vec::new();
            for entry in table.iter().map_err(store_err)? {
                let (k, v) = entry.map_err(store_err)?;
                let envelope: Envelope = serde_json::from_slice(v.value())?;
                if !envelope.is_live(now) {
                    expired.push(k.value().to_string());
                }
            }
            for key in expired {
                table.remove(key.as_str()).map_err(store_err)?;
                removed += 1;
            }
        }
        wt.commit().map_err(store_err)?;
        Ok(removed)
    }

    /// List live keys in key order.
    pub fn keys(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(KV).map_err(store_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            let envelope: Envelope = serde_json::from_slice(v.value())?;
            if envelope.is_live(now) {
                result.push(k.value().to_string());
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl KeyValueStore for RedbStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.get_at(key, Utc::now())
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        self.set_at(key, value, ttl, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Envelope>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Envelope>>> {
        self.entries
            .lock()
            .map_err(|_| ProactiveError::Store("memory store lock poisoned".into()))
    }

    /// Live value for `key`, without going through the async trait.
    pub fn peek(&self, key: &str) -> Option<serde_json::Value> {
        let now = Utc::now();
        self.lock()
            .ok()?
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    /// Remaining time-to-live for `key`, if it is live and has an expiry.
    pub fn ttl_remaining(&self, key: &str) -> Option<chrono::Duration> {
        let now = Utc::now();
        let entries = self.lock().ok()?;
        let envelope = entries.get(key).filter(|e| e.is_live(now))?;
        envelope.expires_at.map(|at| at - now)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        self.lock()?
            .insert(key.to_string(), Envelope::new(value, ttl, Utc::now()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as CDur;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, RedbStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("test.redb")).unwrap();
        (dir, store)
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn set_then_get_returns_value() {
        let (_dir, store) = open_tmp();
        let now = Utc::now();
        store
            .set_at("proactive:enabled", json!(true), DAY, now)
            .unwrap();
        assert_eq!(
            store.get_at("proactive:enabled", now).unwrap(),
            Some(json!(true))
        );
    }

    #[test]
    fn missing_key_is_none() {
        let (_dir, store) = open_tmp();
        assert!(store.get_at("nope", Utc::now()).unwrap().is_none());
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let (_dir, store) = open_tmp();
        let now = Utc::now();
        store.set_at("hint", json!({"staff": 4}), DAY, now).unwrap();
        let later = now + CDur::hours(25);
        assert!(store.get_at("hint", later).unwrap().is_none());
        // Still readable just before expiry.
        assert!(store
            .get_at("hint", now + CDur::hours(23))
            .unwrap()
            .is_some());
    }

    #[test]
    fn set_overwrites_previous_value() {
        let (_dir, store) = open_tmp();
        let now = Utc::now();
        store.set_at("k", json!(1), DAY, now).unwrap();
        store.set_at("k", json!(2), DAY, now).unwrap();
        assert_eq!(store.get_at("k", now).unwrap(), Some(json!(2)));
    }

    #[test]
    fn purge_expired_removes_only_dead_entries() {
        let (_dir, store) = open_tmp();
        let now = Utc::now();
        store.set_at("short", json!(1), DAY, now).unwrap();
        store.set_at("long", json!(2), DAY * 30, now).unwrap();

        let removed = store.purge_expired(now + CDur::days(2)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.keys(now).unwrap(), vec!["long".to_string()]);
    }

    #[test]
    fn reopening_keeps_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("durable.redb");
        let now = Utc::now();
        {
            let store = RedbStore::open(&path).unwrap();
            store.set_at("proactive:enabled", json!(true), DAY, now).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(
            store.get_at("proactive:enabled", now).unwrap(),
            Some(json!(true))
        );
    }

    #[tokio::test]
    async fn memory_store_honours_ttl() {
        let store = MemoryStore::new();
        store.set("gone", json!(1), Duration::ZERO).await.unwrap();
        store.set("kept", json!(2), DAY).await.unwrap();
        assert!(store.get("gone").await.unwrap().is_none());
        assert_eq!(store.get("kept").await.unwrap(), Some(json!(2)));
        let ttl = store.ttl_remaining("kept").unwrap();
        assert!(ttl > CDur::hours(23) && ttl <= CDur::hours(24));
    }
}
