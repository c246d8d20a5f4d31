use anyhow::Result;
use drip_types::{Address, ConfigurationRecord};
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Record stored under {key} claims location {claimed}")]
    CorruptRecord { key: Address, claimed: Address },
}

/// Persistence for faucet configuration records, keyed by record location.
///
/// Writers are expected to serialize per record themselves; a store only
/// guarantees that a single `put_record` replaces the previous value whole.
pub trait RecordStore: Send + Sync {
    fn get_record(&self, faucet: &Address) -> Result<Option<ConfigurationRecord>>;
    fn put_record(&self, record: &ConfigurationRecord) -> Result<()>;
    fn list_records(&self) -> Result<Vec<ConfigurationRecord>>;

    /// Make previous writes durable.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Sled-backed implementation
pub struct SledRecordStore {
    db: Db,
    records: Tree,
}

impl SledRecordStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Store backed by a throwaway database, removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let records = db.open_tree("faucet_records")?;
        tracing::debug!(records = records.len(), "Opened faucet record store");
        Ok(Self { db, records })
    }

    fn decode(key: &[u8], value: &[u8]) -> Result<ConfigurationRecord> {
        let record: ConfigurationRecord =
            serde_json::from_slice(value).map_err(StorageError::from)?;
        if record.faucet.as_ref() != key {
            let mut raw = [0u8; 32];
            if key.len() == raw.len() {
                raw.copy_from_slice(key);
            }
            return Err(StorageError::CorruptRecord {
                key: Address(raw),
                claimed: record.faucet,
            }
            .into());
        }
        Ok(record)
    }
}

impl RecordStore for SledRecordStore {
    fn get_record(&self, faucet: &Address) -> Result<Option<ConfigurationRecord>> {
        self.records
            .get(faucet.as_ref())?
            .map(|v| Self::decode(faucet.as_ref(), &v))
            .transpose()
    }

    fn put_record(&self, record: &ConfigurationRecord) -> Result<()> {
        let data = serde_json::to_vec(record)?;
        self.records.insert(record.faucet.as_ref(), data)?;
        Ok(())
    }

    fn list_records(&self) -> Result<Vec<ConfigurationRecord>> {
        self.records
            .iter()
            .map(|r| {
                let (k, v) = r?;
                Self::decode(&k, &v)
            })
            .collect()
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory testing backend
#[derive(Default, Clone)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<Address, ConfigurationRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get_record(&self, faucet: &Address) -> Result<Option<ConfigurationRecord>> {
        Ok(self.records.read().get(faucet).cloned())
    }

    fn put_record(&self, record: &ConfigurationRecord) -> Result<()> {
        self.records.write().insert(record.faucet, record.clone());
        Ok(())
    }

    fn list_records(&self) -> Result<Vec<ConfigurationRecord>> {
        let mut records: Vec<ConfigurationRecord> =
            self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.faucet.cmp(&b.faucet));
        Ok(records)
    }
}
