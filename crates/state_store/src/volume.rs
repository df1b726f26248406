use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::counters::CounterStore;
use crate::error::StoreError;
use crate::event_log::{read_tail, EventLog, EventTail};
use crate::instance::InstanceId;
use crate::paths::VolumeLayout;
use crate::registry::{SessionListing, SessionRegistry};
use crate::schema::{CounterField, Counters, Event};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumePhase {
    /// No counter record has ever been written.
    Cold,
    Warm,
}

/// All durable state of one deployment, wired to a single data directory.
#[derive(Debug)]
pub struct StateVolume {
    layout: VolumeLayout,
    log: Arc<EventLog>,
    counters: Arc<CounterStore>,
    registry: SessionRegistry,
}

impl StateVolume {
    /// Creates the data and sessions directories if needed. Writes nothing else.
    pub fn open(data_dir: impl Into<PathBuf>, instance: InstanceId) -> Result<Self, StoreError> {
        let layout = VolumeLayout::new(data_dir);
        let sessions_dir = layout.sessions_dir();
        fs::create_dir_all(&sessions_dir).map_err(|source| {
            StoreError::write("creating sessions directory", &sessions_dir, source)
        })?;

        let store = RecordStore::new();
        let log = Arc::new(EventLog::new(layout.events_file(), instance));
        let counters = Arc::new(CounterStore::new(layout.counters_file(), store));
        let registry = SessionRegistry::new(
            layout.clone(),
            store,
            Arc::clone(&log),
            Arc::clone(&counters),
        );

        Ok(Self {
            layout,
            log,
            counters,
            registry,
        })
    }

    #[must_use]
    pub fn layout(&self) -> &VolumeLayout {
        &self.layout
    }

    #[must_use]
    pub fn instance(&self) -> &InstanceId {
        self.log.instance()
    }

    #[must_use]
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    #[must_use]
    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }

    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn phase(&self) -> Result<VolumePhase, StoreError> {
        Ok(match self.counters.load()? {
            Some(_) => VolumePhase::Warm,
            None => VolumePhase::Cold,
        })
    }

    /// Counts this process start. Must run once, before serving traffic.
    pub fn record_startup(&self) -> Result<Counters, StoreError> {
        let counters = self.counters.increment(CounterField::StartupCount, 1)?;
        self.log.record(Event::Startup {
            startup_count: counters.startup_count,
            crash_count: counters.crash_count,
        })?;

        info!(
            instance = %self.instance(),
            startup_count = counters.startup_count,
            crash_count = counters.crash_count,
            "startup recorded"
        );
        Ok(counters)
    }

    /// Persists a simulated crash. The caller terminates the process after
    /// this returns; nothing here depends on any cleanup running.
    pub fn record_crash(&self) -> Result<Counters, StoreError> {
        let counters = self.counters.increment(CounterField::CrashCount, 1)?;
        self.log.record(Event::CrashTriggered {
            crash_count: counters.crash_count,
        })?;

        info!(
            instance = %self.instance(),
            crash_count = counters.crash_count,
            "crash recorded"
        );
        Ok(counters)
    }
}

/// Read-only access to a volume. Never creates directories or files.
#[derive(Debug, Clone)]
pub struct VolumeReader {
    layout: VolumeLayout,
    store: RecordStore,
}

impl VolumeReader {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: VolumeLayout::new(data_dir),
            store: RecordStore::new(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &VolumeLayout {
        &self.layout
    }

    pub fn counters(&self) -> Result<Option<Counters>, StoreError> {
        self.store.read_optional(&self.layout.counters_file())
    }

    pub fn sessions(&self) -> Result<SessionListing, StoreError> {
        SessionListing::scan(&self.layout, self.store)
    }

    pub fn events(&self, limit: usize) -> Result<EventTail, StoreError> {
        read_tail(&self.layout.events_file(), limit)
    }
}
