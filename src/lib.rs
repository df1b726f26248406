//! Disposable session service over a durable data volume.
//!
//! Everything observable lives in `state_store`; this crate adds the process
//! boundary: configuration, logging, the in-memory request tally, and the
//! request dispatcher used by the `stateful-service` binary.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod service;

pub use config::EnvConfig;
pub use dispatch::{dispatch, dispatch_line, parse_request, Outcome, Request, CRASH_EXIT_CODE};
pub use error::ServiceError;
pub use service::{
    CrashReport, Deleted, EventPage, Health, SessionPage, StateReport, StateService,
};
