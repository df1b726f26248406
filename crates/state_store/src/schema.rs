use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub data: Value,
    pub created_at: String,
    pub last_active: String,
    #[serde(default)]
    pub access_count: u64,
}

/// Partial replacement applied by an update. `None` leaves the field alone;
/// a supplied payload replaces the stored one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl SessionPatch {
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data: None,
        }
    }

    #[must_use]
    pub fn data(data: Value) -> Self {
        Self {
            name: None,
            data: Some(data),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counters {
    pub startup_count: u64,
    pub crash_count: u64,
    pub total_sessions: u64,
    pub total_requests: u64,
}

impl Counters {
    #[must_use]
    pub fn get(&self, field: CounterField) -> u64 {
        match field {
            CounterField::StartupCount => self.startup_count,
            CounterField::CrashCount => self.crash_count,
            CounterField::TotalSessions => self.total_sessions,
            CounterField::TotalRequests => self.total_requests,
        }
    }

    pub(crate) fn slot_mut(&mut self, field: CounterField) -> &mut u64 {
        match field {
            CounterField::StartupCount => &mut self.startup_count,
            CounterField::CrashCount => &mut self.crash_count,
            CounterField::TotalSessions => &mut self.total_sessions,
            CounterField::TotalRequests => &mut self.total_requests,
        }
    }

    /// Field name and value pairs in on-disk order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, u64); 4] {
        CounterField::ALL.map(|field| (field.as_str(), self.get(field)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    StartupCount,
    CrashCount,
    TotalSessions,
    TotalRequests,
}

impl CounterField {
    pub const ALL: [CounterField; 4] = [
        CounterField::StartupCount,
        CounterField::CrashCount,
        CounterField::TotalSessions,
        CounterField::TotalRequests,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CounterField::StartupCount => "startup_count",
            CounterField::CrashCount => "crash_count",
            CounterField::TotalSessions => "total_sessions",
            CounterField::TotalRequests => "total_requests",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Startup,
    SessionCreated,
    SessionUpdated,
    SessionDeleted,
    CrashTriggered,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Startup => "startup",
            EventKind::SessionCreated => "session_created",
            EventKind::SessionUpdated => "session_updated",
            EventKind::SessionDeleted => "session_deleted",
            EventKind::CrashTriggered => "crash_triggered",
        }
    }
}

/// Event-specific fields, flattened next to the common envelope on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Startup {
        startup_count: u64,
        crash_count: u64,
    },
    SessionCreated {
        session_id: String,
        name: String,
    },
    SessionUpdated {
        session_id: String,
    },
    SessionDeleted {
        session_id: String,
    },
    CrashTriggered {
        crash_count: u64,
    },
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Startup { .. } => EventKind::Startup,
            Event::SessionCreated { .. } => EventKind::SessionCreated,
            Event::SessionUpdated { .. } => EventKind::SessionUpdated,
            Event::SessionDeleted { .. } => EventKind::SessionDeleted,
            Event::CrashTriggered { .. } => EventKind::CrashTriggered,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Event::SessionCreated { session_id, .. }
            | Event::SessionUpdated { session_id }
            | Event::SessionDeleted { session_id } => Some(session_id),
            Event::Startup { .. } | Event::CrashTriggered { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub ts: f64,
    pub time: String,
    pub container: String,
    #[serde(flatten)]
    pub event: Event,
}

impl EventEntry {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// The event-specific fields alone, without the envelope or the kind tag.
    #[must_use]
    pub fn extras(&self) -> serde_json::Map<String, Value> {
        match serde_json::to_value(&self.event) {
            Ok(Value::Object(mut fields)) => {
                fields.remove("event");
                fields
            }
            _ => serde_json::Map::new(),
        }
    }
}
