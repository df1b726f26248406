use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::clock::Timestamp;
use crate::error::StoreError;
use crate::instance::InstanceId;
use crate::lock_unpoisoned;
use crate::schema::{Event, EventEntry};

pub const DEFAULT_EVENT_LIMIT: usize = 50;

/// Append-only JSON-lines audit trail.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    instance: InstanceId,
    gate: Mutex<()>,
}

impl EventLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, instance: InstanceId) -> Self {
        Self {
            path: path.into(),
            instance,
            gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// Stamps `event` with the current time and this instance, then appends it.
    pub fn record(&self, event: Event) -> Result<EventEntry, StoreError> {
        let at = Timestamp::now()?;
        let entry = EventEntry {
            ts: at.epoch_seconds,
            time: at.utc,
            container: self.instance.to_string(),
            event,
        };
        self.append(&entry)?;
        Ok(entry)
    }

    pub fn append(&self, entry: &EventEntry) -> Result<(), StoreError> {
        let mut line =
            serde_json::to_vec(entry).map_err(|source| StoreError::serialize(&self.path, source))?;
        line.push(b'\n');

        let _gate = lock_unpoisoned(&self.gate);
        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| {
                StoreError::write("opening event log for append", &self.path, source)
            })?;
        // A killed append can leave a torn last line. Start on a fresh line so
        // the torn bytes stay a line of their own.
        if !ends_with_newline(&mut file)
            .map_err(|source| StoreError::io("checking event log tail", &self.path, source))?
        {
            line.insert(0, b'\n');
        }
        // One write call per entry so concurrent appenders never interleave within a line.
        file.write_all(&line)
            .map_err(|source| StoreError::write("appending event", &self.path, source))?;
        file.sync_data()
            .map_err(|source| StoreError::write("syncing event log", &self.path, source))?;

        debug!(event = entry.kind().as_str(), "event appended");
        Ok(())
    }

    pub fn read(&self, limit: usize) -> Result<EventTail, StoreError> {
        read_tail(&self.path, limit)
    }
}

/// True for an empty file or one whose last byte is a newline.
fn ends_with_newline(file: &mut fs::File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Reads the last `limit` entries of the log at `path`. A missing file is an
/// empty log.
pub fn read_tail(path: &Path, limit: usize) -> Result<EventTail, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(source) if source.kind() == io::ErrorKind::NotFound => String::new(),
        Err(source) => return Err(StoreError::io("reading event log", path, source)),
    };
    Ok(EventTail::new(path.to_path_buf(), content, limit))
}

/// The most recent entries of the log as of one read. Entries are parsed as
/// the iterator advances; iterate again by calling `read` again.
#[derive(Debug)]
pub struct EventTail {
    path: PathBuf,
    content: String,
    // (1-based line number, byte range) of each entry still to yield.
    pending: std::vec::IntoIter<(usize, usize, usize)>,
    total: usize,
}

impl EventTail {
    fn new(path: PathBuf, content: String, limit: usize) -> Self {
        let mut lines = Vec::new();
        let mut offset = 0;
        for (index, raw) in content.split_inclusive('\n').enumerate() {
            let start = offset;
            offset += raw.len();
            if raw.trim().is_empty() {
                continue;
            }
            let end = start + raw.trim_end_matches(&['\n', '\r'][..]).len();
            lines.push((index + 1, start, end));
        }

        let total = lines.len();
        let skip = total.saturating_sub(limit);
        let pending = lines.into_iter().skip(skip).collect::<Vec<_>>().into_iter();

        Self {
            path,
            content,
            pending,
            total,
        }
    }

    /// Number of entries in the whole log, not just the tail.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }
}

impl Iterator for EventTail {
    type Item = Result<EventEntry, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (line, start, end) = self.pending.next()?;
        Some(
            serde_json::from_str(&self.content[start..end])
                .map_err(|source| StoreError::corrupt_line(&self.path, line, source)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

impl ExactSizeIterator for EventTail {}
