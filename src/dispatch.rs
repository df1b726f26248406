//! JSON request/response mapping onto [`StateService`].
//!
//! One request object per line, tagged by `op`. Failures become
//! `{"error": .., "status": ..}` replies rather than ending the loop.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use state_store::SessionPatch;

use crate::error::ServiceError;
use crate::service::StateService;

/// Exit status of a simulated crash.
pub const CRASH_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Health,
    State,
    CreateSession {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        data: Option<Value>,
    },
    ListSessions,
    GetSession {
        id: String,
    },
    UpdateSession {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        data: Option<Value>,
    },
    DeleteSession {
        id: String,
    },
    Events {
        #[serde(default)]
        limit: Option<usize>,
    },
    Crash,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Reply(Value),
    /// Write the response, then exit immediately with `exit_code`.
    Terminate { response: Value, exit_code: i32 },
}

impl Outcome {
    #[must_use]
    pub fn response(&self) -> &Value {
        match self {
            Outcome::Reply(response) | Outcome::Terminate { response, .. } => response,
        }
    }
}

pub fn parse_request(line: &str) -> Result<Request, ServiceError> {
    serde_json::from_str(line).map_err(ServiceError::InvalidRequest)
}

/// Counts the request, then parses and runs it.
pub fn dispatch_line(service: &StateService, line: &str) -> Outcome {
    service.note_request();
    match parse_request(line) {
        Ok(request) => run(service, request),
        Err(error) => Outcome::Reply(error_body(&error)),
    }
}

pub fn dispatch(service: &StateService, request: Request) -> Outcome {
    service.note_request();
    run(service, request)
}

fn run(service: &StateService, request: Request) -> Outcome {
    let terminates = matches!(request, Request::Crash);
    match handle(service, request) {
        Ok(response) if terminates => Outcome::Terminate {
            response,
            exit_code: CRASH_EXIT_CODE,
        },
        Ok(response) => Outcome::Reply(response),
        Err(error) => Outcome::Reply(error_body(&error)),
    }
}

fn handle(service: &StateService, request: Request) -> Result<Value, ServiceError> {
    match request {
        Request::Health => encode(&service.health()),
        Request::State => encode(&service.state()?),
        Request::CreateSession { name, data } => encode(&service.create_session(name, data)?),
        Request::ListSessions => encode(&service.list_sessions()?),
        Request::GetSession { id } => encode(&service.get_session(&id)?),
        Request::UpdateSession { id, name, data } => {
            encode(&service.update_session(&id, SessionPatch { name, data })?)
        }
        Request::DeleteSession { id } => encode(&service.delete_session(&id)?),
        Request::Events { limit } => encode(&service.events(limit)?),
        Request::Crash => encode(&service.crash()?),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(ServiceError::Encode)
}

#[must_use]
pub fn error_body(error: &ServiceError) -> Value {
    json!({
        "error": error.to_string(),
        "status": error.status(),
    })
}
