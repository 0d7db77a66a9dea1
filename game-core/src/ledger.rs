use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::RewardId;

pub const STORAGE_KEY: &str = "anniversary-coupons-state";
pub const DEFAULT_POINTS: i64 = 100;

/// Persisted shape: `{"totalPoints": n, "wonCoupons": [ids ascending]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    pub total_points: i64,
    #[serde(rename = "wonCoupons")]
    pub won_rewards: BTreeSet<RewardId>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            total_points: DEFAULT_POINTS,
            won_rewards: BTreeSet::new(),
        }
    }
}

impl LedgerState {
    /// Absent and malformed payloads both decode to the default state.
    pub fn decode(raw: Option<&str>) -> Self {
        raw.and_then(|text| serde_json::from_str(text).ok())
            .unwrap_or_default()
    }

    pub fn encode(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_won(&self, id: RewardId) -> bool {
        self.won_rewards.contains(&id)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] io::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable slot holding the serialized ledger under a single key.
pub trait LedgerStore: Send + Sync {
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&mut self, payload: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slot: Option<String>,
}

impl MemoryStore {
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            slot: Some(payload.into()),
        }
    }

    pub fn payload(&self) -> Option<&str> {
        self.slot.as_deref()
    }
}

impl LedgerStore for MemoryStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.clone())
    }

    fn write(&mut self, payload: &str) -> Result<(), StoreError> {
        self.slot = Some(payload.to_string());
        Ok(())
    }
}

/// Keeps the ledger in `<dir>/anniversary-coupons-state.json`. Writes are plain
/// overwrites, so a crash mid-write can leave a truncated file; the next load
/// then falls back to defaults.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for FileStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, payload: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, payload)?;
        Ok(())
    }
}

/// Points total and won-coupon set, written through to its store after every
/// mutation.
pub struct Ledger {
    state: LedgerState,
    store: Box<dyn LedgerStore>,
}

impl Ledger {
    pub fn load(store: impl LedgerStore + 'static) -> Self {
        let raw = match store.read() {
            Ok(raw) => raw,
            Err(err) => {
                warn!("ledger read failed, using defaults: {err}");
                None
            }
        };
        let state = LedgerState::decode(raw.as_deref());
        debug!(
            total_points = state.total_points,
            won = state.won_rewards.len(),
            "ledger loaded"
        );
        Self {
            state,
            store: Box::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::load(MemoryStore::default())
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn is_won(&self, id: RewardId) -> bool {
        self.state.is_won(id)
    }

    /// Membership is idempotent; points accumulate on every call.
    pub fn mark_won(&mut self, id: RewardId, points: u32) -> &LedgerState {
        self.state.won_rewards.insert(id);
        self.state.total_points = self.state.total_points.saturating_add(i64::from(points));
        self.persist();
        &self.state
    }

    pub fn add_points(&mut self, points: i64) -> &LedgerState {
        if points > 0 {
            self.state.total_points = self.state.total_points.saturating_add(points);
            self.persist();
        }
        &self.state
    }

    /// Clamps the total at zero.
    pub fn subtract_points(&mut self, points: i64) -> &LedgerState {
        if points > 0 {
            self.state.total_points = self.state.total_points.saturating_sub(points).max(0);
            self.persist();
        }
        &self.state
    }

    fn persist(&mut self) {
        let written = self
            .state
            .encode()
            .and_then(|payload| self.store.write(&payload));
        if let Err(err) = written {
            warn!("ledger write failed: {err}");
        }
    }
}
