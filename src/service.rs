use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use state_store::{EventEntry, InstanceId, Session, SessionPatch, StateVolume};
use tracing::{info, warn};

use crate::config::EnvConfig;
use crate::error::ServiceError;

pub const DEFAULT_SESSION_NAME: &str = "unnamed";

/// The facade over one data volume for the lifetime of one process.
///
/// The request tally is deliberately in memory only: it starts at zero on
/// every boot and is never written to the counter record.
#[derive(Debug)]
pub struct StateService {
    volume: StateVolume,
    events_limit: usize,
    started: Instant,
    requests_this_instance: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub container: String,
    pub uptime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateReport {
    pub container_id: String,
    pub uptime_seconds: f64,
    pub requests_this_instance: u64,
    pub startup_count: u64,
    pub crash_count: u64,
    pub total_sessions: u64,
    pub total_requests: u64,
    pub live_sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPage {
    pub sessions: Vec<Session>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPage {
    pub events: Vec<EventEntry>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub status: &'static str,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrashReport {
    pub crash_count: u64,
}

impl StateService {
    pub fn boot(config: &EnvConfig) -> Result<Self, ServiceError> {
        Self::boot_as(config, InstanceId::generate())
    }

    /// Opens the volume and records this process start before returning.
    pub fn boot_as(config: &EnvConfig, instance: InstanceId) -> Result<Self, ServiceError> {
        let volume = StateVolume::open(&config.data_dir, instance)?;
        let phase = volume.phase()?;
        let counters = volume.record_startup()?;
        info!(
            container = %volume.instance(),
            ?phase,
            startup_count = counters.startup_count,
            "service booted"
        );

        Ok(Self {
            volume,
            events_limit: config.events_limit,
            started: Instant::now(),
            requests_this_instance: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn instance(&self) -> &InstanceId {
        self.volume.instance()
    }

    #[must_use]
    pub fn volume(&self) -> &StateVolume {
        &self.volume
    }

    /// Counts one inbound request and returns the new tally.
    pub fn note_request(&self) -> u64 {
        self.requests_this_instance.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[must_use]
    pub fn requests_this_instance(&self) -> u64 {
        self.requests_this_instance.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn uptime_seconds(&self) -> f64 {
        (self.started.elapsed().as_secs_f64() * 10.0).round() / 10.0
    }

    /// Liveness only; never touches the volume.
    #[must_use]
    pub fn health(&self) -> Health {
        Health {
            status: "ok",
            container: self.instance().to_string(),
            uptime: self.uptime_seconds(),
        }
    }

    pub fn state(&self) -> Result<StateReport, ServiceError> {
        let counters = self.volume.counters().snapshot()?;
        let live_sessions = self.volume.registry().list()?.len();

        Ok(StateReport {
            container_id: self.instance().to_string(),
            uptime_seconds: self.uptime_seconds(),
            requests_this_instance: self.requests_this_instance(),
            startup_count: counters.startup_count,
            crash_count: counters.crash_count,
            total_sessions: counters.total_sessions,
            total_requests: counters.total_requests,
            live_sessions,
        })
    }

    pub fn create_session(
        &self,
        name: Option<String>,
        data: Option<Value>,
    ) -> Result<Session, ServiceError> {
        let name = name.unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());
        let data = data.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        Ok(self.volume.registry().create(name, data)?)
    }

    pub fn list_sessions(&self) -> Result<SessionPage, ServiceError> {
        let sessions = self.volume.registry().list()?.collect_all()?;
        Ok(SessionPage {
            count: sessions.len(),
            sessions,
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Session, ServiceError> {
        Ok(self.volume.registry().get(id)?)
    }

    pub fn update_session(&self, id: &str, patch: SessionPatch) -> Result<Session, ServiceError> {
        Ok(self.volume.registry().update(id, patch)?)
    }

    pub fn delete_session(&self, id: &str) -> Result<Deleted, ServiceError> {
        self.volume.registry().delete(id)?;
        Ok(Deleted {
            status: "deleted",
            id: id.to_string(),
        })
    }

    pub fn events(&self, limit: Option<usize>) -> Result<EventPage, ServiceError> {
        let tail = self.volume.log().read(limit.unwrap_or(self.events_limit))?;
        let count = tail.total();
        let events = tail.collect::<Result<Vec<_>, _>>()?;
        Ok(EventPage { events, count })
    }

    /// Persists the crash. The caller must terminate the process without
    /// further cleanup once this returns.
    pub fn crash(&self) -> Result<CrashReport, ServiceError> {
        let counters = self.volume.record_crash()?;
        warn!(
            container = %self.instance(),
            crash_count = counters.crash_count,
            "simulated crash requested; terminating"
        );
        Ok(CrashReport {
            crash_count: counters.crash_count,
        })
    }
}
