//! Span computation error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SpanError {
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    /// Store unreachable, authentication failure, failed query or timeout
    #[error("message store connection error: {0}")]
    Connection(#[from] StoreError),

    #[error("no timestamped messages recorded for channel {channel_id}")]
    NoRecords { channel_id: String },

    #[error(
        "inconsistent message timestamps for channel {channel_id}: latest {latest} precedes earliest {earliest}"
    )]
    DataConsistency { channel_id: String, earliest: DateTime<Utc>, latest: DateTime<Utc> },
}

impl SpanError {
    /// Stable name of the error kind, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            SpanError::InvalidChannel(_) => "invalid_channel",
            SpanError::Connection(_) => "connection",
            SpanError::NoRecords { .. } => "no_records",
            SpanError::DataConsistency { .. } => "data_consistency",
        }
    }

    /// Emit this error at the level its kind calls for.
    ///
    /// Missing history is an expected state; broken invariants are not.
    pub fn log(&self, channel_id: &str) {
        match self {
            SpanError::DataConsistency { .. } => {
                tracing::error!(channel_id, kind = self.kind(), "{}", self)
            },
            SpanError::Connection(_) => tracing::warn!(channel_id, kind = self.kind(), "{}", self),
            SpanError::InvalidChannel(_) | SpanError::NoRecords { .. } => {
                tracing::debug!(channel_id, kind = self.kind(), "{}", self)
            },
        }
    }
}

pub type SpanResult<T> = Result<T, SpanError>;
