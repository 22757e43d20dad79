use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("no distance recorded for obu {0}")]
    NotFound(i64),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Running distance totals, keyed by OBU id.
///
/// `insert` adds to the total of one id and must not lose concurrent updates to
/// that id. `get` observes every insert that returned before it was issued.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert(&self, obu_id: i64, value: f64) -> Result<(), StoreError>;
    async fn get(&self, obu_id: i64) -> Result<f64, StoreError>;
}

/// In-memory store. The map is sharded and every read-modify-write runs under
/// the lock of the shard owning the id; locks are released before returning.
#[derive(Default)]
pub struct MemoryStore {
    totals: DashMap<i64, f64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, obu_id: i64, value: f64) -> Result<(), StoreError> {
        *self.totals.entry(obu_id).or_insert(0.0) += value;
        Ok(())
    }

    async fn get(&self, obu_id: i64) -> Result<f64, StoreError> {
        self.totals
            .get(&obu_id)
            .map(|total| *total)
            .ok_or(StoreError::NotFound(obu_id))
    }
}
