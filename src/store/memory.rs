//! In-memory message store.
//!
//! Answers the same aggregate as the Postgres store and records how sessions
//! are opened and released, so callers can assert that no connection leaks.

use super::{MessageStore, StoreError, StoreResult, StoreSession};
use crate::span::types::{ChannelId, RawTimestampRange};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct State {
    messages: HashMap<String, Vec<i64>>,
    raw_overrides: HashMap<String, RawTimestampRange>,
    unreachable: bool,
    failing_queries: bool,
    panic_on_query: bool,
    query_delay: Option<Duration>,
    channel_delays: HashMap<String, Duration>,
    failing_close: bool,
    close_delay: Option<Duration>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    open_sessions: AtomicUsize,
}

/// Snapshot of session bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Sessions handed out by `open`
    pub sessions_opened: usize,
    /// Sessions released through `close`
    pub sessions_closed: usize,
    /// Sessions neither closed nor dropped yet
    pub open_sessions: usize,
}

#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    inner: Arc<Inner>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message created at `created_at_ms` in `channel_id`
    pub fn insert(&self, channel_id: &str, created_at_ms: i64) {
        self.inner.state.lock().messages.entry(channel_id.to_string()).or_default().push(created_at_ms);
    }

    /// Answer the aggregate for `channel_id` with `range` verbatim, bypassing the
    /// recorded messages. Used to reproduce corrupted or unparseable rows.
    pub fn set_raw_range(&self, channel_id: &str, range: RawTimestampRange) {
        self.inner.state.lock().raw_overrides.insert(channel_id.to_string(), range);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.state.lock().unreachable = unreachable;
    }

    pub fn set_failing_queries(&self, failing: bool) {
        self.inner.state.lock().failing_queries = failing;
    }

    pub fn set_panic_on_query(&self, panic: bool) {
        self.inner.state.lock().panic_on_query = panic;
    }

    pub fn set_failing_close(&self, failing: bool) {
        self.inner.state.lock().failing_close = failing;
    }

    /// Delay the graceful close of every session by `delay`
    pub fn set_close_delay(&self, delay: Duration) {
        self.inner.state.lock().close_delay = Some(delay);
    }

    /// Delay every aggregate query by `delay`
    pub fn set_query_delay(&self, delay: Duration) {
        self.inner.state.lock().query_delay = Some(delay);
    }

    /// Delay queries for one channel, overriding the store-wide delay
    pub fn set_channel_query_delay(&self, channel_id: &str, delay: Duration) {
        self.inner.state.lock().channel_delays.insert(channel_id.to_string(), delay);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            sessions_opened: self.inner.sessions_opened.load(Ordering::SeqCst),
            sessions_closed: self.inner.sessions_closed.load(Ordering::SeqCst),
            open_sessions: self.inner.open_sessions.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    type Session = InMemorySession;

    async fn open(&self) -> StoreResult<InMemorySession> {
        if self.inner.state.lock().unreachable {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }

        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(InMemorySession { inner: self.inner.clone() })
    }
}

pub struct InMemorySession {
    inner: Arc<Inner>,
}

#[async_trait]
impl StoreSession for InMemorySession {
    async fn timestamp_range(&mut self, channel_id: &ChannelId) -> StoreResult<RawTimestampRange> {
        let delay = {
            let state = self.inner.state.lock();
            state.channel_delays.get(channel_id.as_str()).copied().or(state.query_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.inner.state.lock();
        if state.panic_on_query {
            panic!("simulated driver panic while querying {}", channel_id);
        }
        if state.failing_queries {
            return Err(StoreError::Unavailable("connection reset during query".to_string()));
        }

        if let Some(raw) = state.raw_overrides.get(channel_id.as_str()) {
            return Ok(*raw);
        }

        let timestamps = state.messages.get(channel_id.as_str());
        Ok(RawTimestampRange::new(
            timestamps.and_then(|ts| ts.iter().copied().min()),
            timestamps.and_then(|ts| ts.iter().copied().max()),
        ))
    }

    async fn close(self) -> StoreResult<()> {
        let (failing, delay) = {
            let state = self.inner.state.lock();
            (state.failing_close, state.close_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(StoreError::Unavailable("connection reset during close".to_string()));
        }

        self.inner.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_aggregate_over_channel() {
        let store = InMemoryMessageStore::new();
        store.insert("c1", 30);
        store.insert("c1", 10);
        store.insert("c1", 20);

        let mut session = store.open().await.unwrap();
        let raw = session.timestamp_range(&ChannelId::new("c1").unwrap()).await.unwrap();
        assert_eq!(raw, RawTimestampRange::new(Some(10), Some(30)));

        let raw = session.timestamp_range(&ChannelId::new("c2").unwrap()).await.unwrap();
        assert_eq!(raw, RawTimestampRange::new(None, None));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_without_close_releases() {
        let store = InMemoryMessageStore::new();
        let session = store.open().await.unwrap();
        assert_eq!(store.stats().open_sessions, 1);

        drop(session);
        let stats = store.stats();
        assert_eq!(stats.open_sessions, 0);
        assert_eq!(stats.sessions_closed, 0);
    }
}
