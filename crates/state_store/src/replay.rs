use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::schema::{Event, EventEntry};

/// Folds log entries into the set of session ids that should exist: created
/// and not deleted afterwards.
pub fn replay_sessions<I>(entries: I) -> Result<BTreeSet<String>, StoreError>
where
    I: IntoIterator<Item = Result<EventEntry, StoreError>>,
{
    let mut live = BTreeSet::new();
    for entry in entries {
        match entry?.event {
            Event::SessionCreated { session_id, .. } => {
                live.insert(session_id);
            }
            Event::SessionDeleted { session_id } => {
                live.remove(&session_id);
            }
            Event::SessionUpdated { .. }
            | Event::Startup { .. }
            | Event::CrashTriggered { .. } => {}
        }
    }
    Ok(live)
}
