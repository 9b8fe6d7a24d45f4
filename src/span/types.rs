//! Value types for activity span computation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::error::{SpanError, SpanResult};

const MS_PER_MINUTE: u64 = 60 * 1000;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Opaque channel key. Only guaranteed to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(value: impl Into<String>) -> SpanResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(SpanError::InvalidChannel("channel id must not be empty".to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate row exactly as the store returns it: epoch milliseconds, null when
/// the channel has no messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawTimestampRange {
    pub earliest: Option<i64>,
    pub latest: Option<i64>,
}

impl RawTimestampRange {
    pub fn new(earliest: Option<i64>, latest: Option<i64>) -> Self {
        Self { earliest, latest }
    }

    /// Convert both aggregates into instants.
    ///
    /// A missing or out-of-range value means there is no usable history.
    pub fn into_range(self, channel_id: &ChannelId) -> SpanResult<MessageTimestampRange> {
        let to_instant = |ms: Option<i64>| ms.and_then(DateTime::<Utc>::from_timestamp_millis);

        match (to_instant(self.earliest), to_instant(self.latest)) {
            (Some(earliest), Some(latest)) => Ok(MessageTimestampRange { earliest, latest }),
            _ => Err(SpanError::NoRecords { channel_id: channel_id.to_string() }),
        }
    }
}

/// First and last message instants of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTimestampRange {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl MessageTimestampRange {
    /// Elapsed milliseconds between first and last message.
    ///
    /// `latest < earliest` is reported, never clamped to zero.
    pub fn elapsed_millis(&self, channel_id: &ChannelId) -> SpanResult<u64> {
        let elapsed = self.latest.timestamp_millis() - self.earliest.timestamp_millis();
        u64::try_from(elapsed).map_err(|_| SpanError::DataConsistency {
            channel_id: channel_id.to_string(),
            earliest: self.earliest,
            latest: self.latest,
        })
    }
}

/// A non-negative span in whole days, hours and minutes. Seconds are
/// truncated and days never carry into larger units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivitySpan {
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
}

impl ActivitySpan {
    pub fn from_millis(elapsed_ms: u64) -> Self {
        Self {
            days: elapsed_ms / MS_PER_DAY,
            hours: ((elapsed_ms % MS_PER_DAY) / MS_PER_HOUR) as u8,
            minutes: ((elapsed_ms % MS_PER_HOUR) / MS_PER_MINUTE) as u8,
        }
    }

    /// Milliseconds covered by the whole units of this span
    pub fn as_millis(&self) -> u64 {
        self.days * MS_PER_DAY + self.hours as u64 * MS_PER_HOUR + self.minutes as u64 * MS_PER_MINUTE
    }
}

impl fmt::Display for ActivitySpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days {} hours {} minutes", self.days, self.hours, self.minutes)
    }
}

/// Full result of one span computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSpan {
    pub channel_id: ChannelId,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub span: ActivitySpan,
}

impl ChannelSpan {
    pub fn formatted(&self) -> String {
        self.span.to_string()
    }
}
