//! Channel activity span: elapsed time between a channel's first and last message.

pub mod error;
pub mod types;

use crate::store::{MessageStore, StoreError, StoreResult, StoreSession};
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

pub use error::{SpanError, SpanResult};
pub use types::{ActivitySpan, ChannelId, ChannelSpan, MessageTimestampRange, RawTimestampRange};

/// Computes activity spans against a message store.
///
/// Every call opens its own session and releases it before returning. Nothing
/// is cached and nothing is retried; retry policy belongs to the caller.
pub struct DurationCalculator<S> {
    store: S,
    timeout: Duration,
}

impl<S> DurationCalculator<S>
where
    S: MessageStore,
{
    /// `timeout` bounds the whole store interaction of one call
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Formatted span, e.g. `"1 days 1 hours 1 minutes"`
    pub async fn compute_duration(&self, channel_id: &str) -> SpanResult<String> {
        self.compute_span(channel_id).await.map(|span| span.formatted())
    }

    pub async fn compute_span(&self, channel_id: &str) -> SpanResult<ChannelSpan> {
        let result = self.try_compute_span(channel_id).await;
        if let Err(e) = &result {
            e.log(channel_id);
        }
        result
    }

    async fn try_compute_span(&self, channel_id: &str) -> SpanResult<ChannelSpan> {
        let channel_id = ChannelId::new(channel_id)?;
        tracing::debug!("Computing activity span for channel {}", channel_id);

        let raw = self.fetch_range(&channel_id).await?;
        let range = raw.into_range(&channel_id)?;
        let elapsed = range.elapsed_millis(&channel_id)?;

        let span = ActivitySpan::from_millis(elapsed);
        tracing::debug!(channel_id = %channel_id, elapsed_ms = elapsed, "Activity span: {}", span);

        Ok(ChannelSpan { channel_id, earliest: range.earliest, latest: range.latest, span })
    }

    async fn fetch_range(&self, channel_id: &ChannelId) -> StoreResult<RawTimestampRange> {
        let deadline = Instant::now() + self.timeout;

        let mut session = timeout_at(deadline, self.store.open())
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;

        let queried = timeout_at(deadline, session.timestamp_range(channel_id))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))
            .and_then(|result| result);

        // Close regardless of the query outcome, within the same deadline. If
        // closing hangs, the session is dropped with the timed-out future and
        // reclaims the connection itself.
        match timeout_at(deadline, session.close()).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => tracing::warn!("Failed to release store session for {}: {}", channel_id, e),
            Err(_) => tracing::warn!(
                "Releasing store session for {} did not finish within {:?}",
                channel_id,
                self.timeout
            ),
        }

        queried
    }
}
