use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::now_utc_seconds;
use crate::counters::CounterStore;
use crate::error::StoreError;
use crate::event_log::EventLog;
use crate::lock_unpoisoned;
use crate::paths::{is_record_file, is_valid_session_id, VolumeLayout};
use crate::schema::{CounterField, Event, Session, SessionPatch};
use crate::store::RecordStore;

/// Sessions stored one file per id. File existence is the only index.
#[derive(Debug)]
pub struct SessionRegistry {
    layout: VolumeLayout,
    store: RecordStore,
    log: Arc<EventLog>,
    counters: Arc<CounterStore>,
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(
        layout: VolumeLayout,
        store: RecordStore,
        log: Arc<EventLog>,
        counters: Arc<CounterStore>,
    ) -> Self {
        Self {
            layout,
            store,
            log,
            counters,
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, name: impl Into<String>, data: Value) -> Result<Session, StoreError> {
        let now = now_utc_seconds()?;
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            data,
            created_at: now.clone(),
            last_active: now,
            access_count: 0,
        };

        self.store
            .write(&self.layout.session_file(&session.id), &session)?;
        self.log.record(Event::SessionCreated {
            session_id: session.id.clone(),
            name: session.name.clone(),
        })?;
        self.counters.increment(CounterField::TotalSessions, 1)?;

        info!(session_id = %session.id, name = %session.name, "session created");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Result<Session, StoreError> {
        let path = self.existing_path(id)?;
        read_session(&self.store, id, &path)
    }

    pub fn list(&self) -> Result<SessionListing, StoreError> {
        SessionListing::scan(&self.layout, self.store)
    }

    pub fn update(&self, id: &str, patch: SessionPatch) -> Result<Session, StoreError> {
        let path = self.existing_path(id)?;
        let gate = self.gate_for(id);
        let result = {
            let _held = lock_unpoisoned(&gate);
            self.update_held(id, &path, patch)
        };
        if matches!(result, Err(StoreError::SessionNotFound { .. })) {
            self.release_gate(id, &gate);
        }
        result
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.existing_path(id)?;
        let gate = self.gate_for(id);
        let result = {
            let _held = lock_unpoisoned(&gate);
            self.delete_held(id, &path)
        };
        match result {
            Ok(()) => {
                lock_unpoisoned(&self.gates).remove(id);
                info!(session_id = %id, "session deleted");
            }
            Err(StoreError::SessionNotFound { .. }) => self.release_gate(id, &gate),
            Err(_) => {}
        }
        result
    }

    fn update_held(
        &self,
        id: &str,
        path: &Path,
        patch: SessionPatch,
    ) -> Result<Session, StoreError> {
        let mut session = read_session(&self.store, id, path)?;
        if let Some(name) = patch.name {
            session.name = name;
        }
        if let Some(data) = patch.data {
            session.data = data;
        }
        session.last_active = now_utc_seconds()?;
        session.access_count = session.access_count.saturating_add(1);

        self.store.write(path, &session)?;
        self.log.record(Event::SessionUpdated {
            session_id: session.id.clone(),
        })?;

        debug!(session_id = %session.id, access_count = session.access_count, "session updated");
        Ok(session)
    }

    fn delete_held(&self, id: &str, path: &Path) -> Result<(), StoreError> {
        self.store.remove(path).map_err(|error| match error {
            StoreError::NotFound { .. } => StoreError::SessionNotFound { id: id.to_string() },
            other => other,
        })?;
        self.log.record(Event::SessionDeleted {
            session_id: id.to_string(),
        })?;
        Ok(())
    }

    fn existing_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_session_id(id) {
            return Err(StoreError::SessionNotFound { id: id.to_string() });
        }
        Ok(self.layout.session_file(id))
    }

    fn gate_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut gates = lock_unpoisoned(&self.gates);
        Arc::clone(gates.entry(id.to_string()).or_default())
    }

    /// Drops the gate for an id with no record, unless another caller still
    /// holds a clone of it. Keeps the map bounded by live sessions.
    fn release_gate(&self, id: &str, gate: &Arc<Mutex<()>>) {
        let mut gates = lock_unpoisoned(&self.gates);
        let only_us = gates
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(entry, gate) && Arc::strong_count(gate) == 2);
        if only_us {
            gates.remove(id);
        }
    }

    #[cfg(test)]
    fn gate_count(&self) -> usize {
        lock_unpoisoned(&self.gates).len()
    }
}

fn read_session(store: &RecordStore, id: &str, path: &Path) -> Result<Session, StoreError> {
    store.read(path).map_err(|error| match error {
        StoreError::NotFound { .. } => StoreError::SessionNotFound { id: id.to_string() },
        other => other,
    })
}

/// The session files present when the listing was taken. Records are read
/// lazily on each pass; [`SessionListing::iter`] may be called repeatedly.
#[derive(Debug, Clone)]
pub struct SessionListing {
    store: RecordStore,
    paths: Vec<PathBuf>,
}

impl SessionListing {
    pub(crate) fn scan(layout: &VolumeLayout, store: RecordStore) -> Result<Self, StoreError> {
        let dir = layout.sessions_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Ok(Self {
                    store,
                    paths: Vec::new(),
                });
            }
            Err(source) => return Err(StoreError::io("listing sessions", &dir, source)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::io("listing sessions", &dir, source))?;
            let path = entry.path();
            if is_record_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(Self { store, paths })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Yields sessions in file-name order. A record deleted since the listing
    /// was taken is skipped; a corrupt one is reported.
    pub fn iter(&self) -> impl Iterator<Item = Result<Session, StoreError>> + '_ {
        self.paths.iter().filter_map(move |path| {
            match self.store.read::<Session>(path) {
                Ok(session) => Some(Ok(session)),
                Err(StoreError::NotFound { .. }) => {
                    warn!(path = %path.display(), "session vanished during listing");
                    None
                }
                Err(error) => Some(Err(error)),
            }
        })
    }

    pub fn collect_all(&self) -> Result<Vec<Session>, StoreError> {
        self.iter().collect()
    }
}
