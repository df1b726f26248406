//! Durable session and lifecycle state kept entirely on a data volume.
//!
//! Invariant: a destination record only changes by atomic rename of a synced
//! temporary sibling, and each shared file has exactly one in-process writer
//! gate.

use std::sync::{Mutex, MutexGuard};

mod clock;
mod counters;
mod error;
mod event_log;
mod instance;
mod paths;
mod registry;
mod replay;
mod schema;
mod store;
mod volume;

pub use clock::{format_utc_seconds, now_utc_seconds, Timestamp};
pub use counters::CounterStore;
pub use error::StoreError;
pub use event_log::{read_tail, EventLog, EventTail, DEFAULT_EVENT_LIMIT};
pub use instance::InstanceId;
pub use paths::{
    is_record_file, is_valid_session_id, session_file_name, VolumeLayout, COUNTERS_FILE,
    EVENTS_FILE, SESSIONS_DIR,
};
pub use registry::{SessionListing, SessionRegistry};
pub use replay::replay_sessions;
pub use schema::{CounterField, Counters, Event, EventEntry, EventKind, Session, SessionPatch};
pub use store::{RecordStore, StagedWrite};
pub use volume::{StateVolume, VolumePhase, VolumeReader};

// Gates guard files, not in-memory data, so a poisoned gate is still usable.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
