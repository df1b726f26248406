use std::path::{Path, PathBuf};

pub const SESSIONS_DIR: &str = "sessions";
pub const EVENTS_FILE: &str = "events.jsonl";
pub const COUNTERS_FILE: &str = "stats.json";

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Where each artifact class lives relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeLayout {
    root: PathBuf,
}

impl VolumeLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    #[must_use]
    pub fn events_file(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    #[must_use]
    pub fn counters_file(&self) -> PathBuf {
        self.root.join(COUNTERS_FILE)
    }

    #[must_use]
    pub fn session_file(&self, session_id: &str) -> PathBuf {
        self.sessions_dir().join(session_file_name(session_id))
    }
}

#[must_use]
pub fn session_file_name(session_id: &str) -> String {
    format!("{session_id}.{RECORD_EXTENSION}")
}

/// Session ids are minted as UUIDs; anything else cannot name a record and
/// must never be joined onto the sessions directory.
#[must_use]
pub fn is_valid_session_id(session_id: &str) -> bool {
    uuid::Uuid::parse_str(session_id).is_ok()
}

#[must_use]
pub fn is_record_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'));
    !hidden && path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
}

/// Hidden sibling of `destination`, unique per staged write.
#[must_use]
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("record");
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    destination.with_file_name(format!(".{file_name}.{}.{TEMP_EXTENSION}", &nonce[..12]))
}
