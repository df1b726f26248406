use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::StoreError;

/// One instant in both representations the log carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestamp {
    pub epoch_seconds: f64,
    pub utc: String,
}

impl Timestamp {
    pub fn now() -> Result<Self, StoreError> {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    pub fn from_datetime(at: OffsetDateTime) -> Result<Self, StoreError> {
        Ok(Self {
            epoch_seconds: at.unix_timestamp_nanos() as f64 / 1_000_000_000.0,
            utc: format_utc_seconds(at)?,
        })
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ`, truncated to whole seconds.
pub fn format_utc_seconds(at: OffsetDateTime) -> Result<String, StoreError> {
    let at = at.to_offset(time::UtcOffset::UTC);
    let truncated = at.replace_nanosecond(0).unwrap_or(at);
    truncated.format(&Rfc3339).map_err(StoreError::ClockFormat)
}

pub fn now_utc_seconds() -> Result<String, StoreError> {
    format_utc_seconds(OffsetDateTime::now_utc())
}
