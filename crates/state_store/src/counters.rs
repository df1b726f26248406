use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StoreError;
use crate::lock_unpoisoned;
use crate::schema::{CounterField, Counters};
use crate::store::RecordStore;

/// The single persisted counter record.
///
/// Every increment is a read, mutate, atomic write-back cycle run under one
/// in-process gate, so concurrent increments queue instead of losing updates.
#[derive(Debug)]
pub struct CounterStore {
    path: PathBuf,
    store: RecordStore,
    gate: Mutex<()>,
}

impl CounterStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, store: RecordStore) -> Self {
        Self {
            path: path.into(),
            store,
            gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds `amount` to `field` and returns the record as written.
    pub fn increment(&self, field: CounterField, amount: u64) -> Result<Counters, StoreError> {
        let _gate = lock_unpoisoned(&self.gate);
        let mut counters = self.load()?.unwrap_or_default();
        let slot = counters.slot_mut(field);
        *slot = slot.saturating_add(amount);
        self.store.write(&self.path, &counters)?;

        debug!(
            field = field.as_str(),
            value = counters.get(field),
            "counter incremented"
        );
        Ok(counters)
    }

    /// The last completed write, or all zeros before the first one. Takes no
    /// gate: the rename discipline already guarantees a whole record.
    pub fn snapshot(&self) -> Result<Counters, StoreError> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// `None` while the volume is cold.
    pub fn load(&self) -> Result<Option<Counters>, StoreError> {
        self.store.read_optional(&self.path)
    }
}
