//! Message store abstraction.
//!
//! A [`MessageStore`] hands out one [`StoreSession`] per span computation. A
//! session owns its connection: [`StoreSession::close`] releases it gracefully,
//! and dropping an unclosed session must still reclaim it.

pub mod memory;
pub mod postgres;

use crate::span::types::{ChannelId, RawTimestampRange};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use memory::InMemoryMessageStore;
pub use postgres::{PgMessageStore, StoreConnectionInfo};

/// Errors raised while talking to the message store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to connect to message store: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("message store query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("failed to close message store connection: {0}")]
    Close(#[source] sqlx::Error),

    #[error("message store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Source of scoped store sessions
#[async_trait]
pub trait MessageStore: Send + Sync {
    type Session: StoreSession;

    /// Open a dedicated session for a single computation
    async fn open(&self) -> StoreResult<Self::Session>;
}

/// One open connection to the message store
#[async_trait]
pub trait StoreSession: Send + Sized {
    /// `MIN`/`MAX` of message creation times for one channel, as stored
    async fn timestamp_range(&mut self, channel_id: &ChannelId) -> StoreResult<RawTimestampRange>;

    /// Release the connection
    async fn close(self) -> StoreResult<()>;
}
