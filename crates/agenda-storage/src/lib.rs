use agenda_core::{AgendaError, FallbackStore, NormalizedEvent};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub const STORE_SCHEMA_VERSION: i64 = 1;
pub const SCHEDULE_SLOT: &str = "schedule";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

impl From<StorageError> for AgendaError {
    fn from(err: StorageError) -> Self {
        AgendaError::Store(err.to_string())
    }
}

/// Named text slots in a single SQLite file.
pub struct SlotStore {
    conn: Connection,
}

impl SlotStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.schema_version()?;
        if current > STORE_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: STORE_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_kv_slots.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "
            INSERT INTO kv_slots (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            ",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Fallback store keeping the last rendered event set as JSON in one slot.
pub struct SqliteFallbackStore {
    slots: SlotStore,
    key: String,
}

impl SqliteFallbackStore {
    pub fn new(slots: SlotStore) -> Self {
        Self::with_key(slots, SCHEDULE_SLOT)
    }

    pub fn with_key(slots: SlotStore, key: impl Into<String>) -> Self {
        Self {
            slots,
            key: key.into(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self::new(SlotStore::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(SlotStore::open_in_memory()?))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn try_load(&self) -> Result<Vec<NormalizedEvent>, StorageError> {
        match self.slots.get(&self.key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|err| StorageError::Serialization(err.to_string())),
            None => Ok(Vec::new()),
        }
    }

    pub fn try_save(&self, events: &[NormalizedEvent]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(events)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.slots.put(&self.key, &raw)
    }
}

impl FallbackStore for SqliteFallbackStore {
    fn load(&self) -> Vec<NormalizedEvent> {
        match self.try_load() {
            Ok(events) => events,
            Err(err) => {
                warn!("fallback_load_error: {err}; starting empty");
                Vec::new()
            }
        }
    }

    fn save(&mut self, events: &[NormalizedEvent]) -> Result<(), AgendaError> {
        Ok(self.try_save(events)?)
    }
}
