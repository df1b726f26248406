//! Human-readable report over a data volume, read without the service.
//!
//! Everything goes through [`VolumeReader`], so inspecting never creates or
//! modifies a file. Corrupt records are shown inline instead of aborting.

use std::fmt::Write;

use serde_json::Value;
use state_store::{StoreError, VolumeReader};

pub const RECENT_EVENTS: usize = 10;

const WIDTH: usize = 62;

#[must_use]
pub fn volume_exists(reader: &VolumeReader) -> bool {
    reader.layout().root().is_dir()
}

pub fn render_report(reader: &VolumeReader) -> Result<String, StoreError> {
    let mut out = String::new();
    render_stats(&mut out, reader)?;
    render_sessions(&mut out, reader)?;
    render_events(&mut out, reader)?;
    hr(&mut out, '═');
    out.push('\n');
    Ok(out)
}

fn render_stats(out: &mut String, reader: &VolumeReader) -> Result<(), StoreError> {
    section(out, "PERSISTENT STATS");
    match reader.counters()? {
        Some(counters) => {
            for (field, value) in counters.entries() {
                line(out, format_args!("  {field:<28} {value}"));
            }
        }
        None => line(out, format_args!("  (no stats yet)")),
    }
    Ok(())
}

fn render_sessions(out: &mut String, reader: &VolumeReader) -> Result<(), StoreError> {
    section(out, "SESSIONS");
    let listing = reader.sessions()?;
    if listing.is_empty() {
        line(out, format_args!("  (no sessions)"));
    } else {
        line(
            out,
            format_args!("  {:<36}  {:<20}  {:>8}  CREATED", "ID", "NAME", "ACCESSES"),
        );
        hr(out, '·');
        for session in listing.iter() {
            match session {
                Ok(session) => line(
                    out,
                    format_args!(
                        "  {:<36}  {:<20}  {:>8}  {}",
                        session.id, session.name, session.access_count, session.created_at
                    ),
                ),
                Err(error) => line(out, format_args!("  <unreadable: {error}>")),
            }
        }
    }
    line(out, format_args!("\n  Total: {}", listing.len()));
    Ok(())
}

fn render_events(out: &mut String, reader: &VolumeReader) -> Result<(), StoreError> {
    section(out, &format!("RECENT EVENTS  (last {RECENT_EVENTS})"));
    let tail = reader.events(RECENT_EVENTS)?;
    let total = tail.total();
    if total == 0 {
        line(out, format_args!("  (no events yet)"));
        return Ok(());
    }

    for entry in tail {
        match entry {
            Ok(entry) => {
                let extras = entry.extras();
                let suffix = if extras.is_empty() {
                    String::new()
                } else {
                    format!("  {}", Value::Object(extras))
                };
                let container: String = entry.container.chars().take(8).collect();
                line(
                    out,
                    format_args!(
                        "  {}  [{container}]  {}{suffix}",
                        entry.time,
                        entry.kind().as_str()
                    ),
                );
            }
            Err(error) => line(out, format_args!("  <unreadable: {error}>")),
        }
    }
    line(out, format_args!("\n  Total events: {total}"));
    Ok(())
}

fn section(out: &mut String, title: &str) {
    hr(out, '─');
    line(out, format_args!("  {title}"));
    hr(out, '─');
}

fn hr(out: &mut String, ch: char) {
    let rule: String = std::iter::repeat(ch).take(WIDTH).collect();
    line(out, format_args!("{rule}"));
}

fn line(out: &mut String, args: std::fmt::Arguments<'_>) {
    // Writing into a String cannot fail.
    let _ = out.write_fmt(args);
    out.push('\n');
}
